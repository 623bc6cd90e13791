use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use excheck::config::Config;
use excheck::diagnostics::{render_error, render_finding};

#[derive(Parser)]
#[command(name = "excheck", version, about = "Checked-exception flow analyzer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a source file for escaping exceptions
    Check {
        file: PathBuf,

        /// Emit findings as JSON instead of rendered reports
        #[arg(long)]
        json: bool,

        /// Exit nonzero when findings exist
        #[arg(long)]
        deny: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Check { file, json, deny } => check(&file, json, deny),
    }
}

fn check(file: &Path, json: bool, deny: bool) -> ExitCode {
    let config = match Config::discover(file) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", file.display());
            return ExitCode::from(2);
        }
    };

    let program = match excheck::parse_source(&source) {
        Ok(program) => program,
        Err(err) => {
            render_error(&source, &err);
            return ExitCode::from(2);
        }
    };

    let findings = excheck::analysis::analyze_with_exemptions(&program, &config.check.exempt);

    if json {
        match serde_json::to_string_pretty(&findings) {
            Ok(out) => println!("{out}"),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::from(2);
            }
        }
    } else {
        for finding in &findings {
            print!("{}", render_finding(&source, finding));
        }
    }

    if !findings.is_empty() && (deny || config.check.deny) {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
