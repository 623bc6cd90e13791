use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn excheck(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_excheck"))
        .args(args)
        .output()
        .expect("failed to run excheck")
}

pub fn write_source(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, source).expect("failed to write source file");
    path
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
