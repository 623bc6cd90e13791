//! Project configuration, discovered by walking up from the checked file
//! until an `excheck.toml` appears.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::AnalyzeError;

pub const CONFIG_FILE: &str = "excheck.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub check: CheckConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Function names whose bodies are never analyzed.
    #[serde(default)]
    pub exempt: Vec<String>,
    /// Treat findings as errors (exit code 1).
    #[serde(default)]
    pub deny: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, AnalyzeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AnalyzeError::io(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| AnalyzeError::io(format!("invalid {}: {e}", path.display())))
    }

    /// Walk up from `start` looking for a config file. No file is not an
    /// error, the defaults apply.
    pub fn discover(start: &Path) -> Result<Self, AnalyzeError> {
        match find_config_file(start) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        Some(start)
    } else {
        start.parent()
    };
    while let Some(d) = dir {
        let candidate = d.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}
