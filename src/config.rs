//! Run configuration, loaded from an optional `paramerge.toml`.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "paramerge.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub staging: StagingConfig,
}

/// How the external clone detector is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Detector executable, resolved through PATH.
    #[serde(default = "default_detector_command")]
    pub command: String,

    /// Require renamed identifiers to be renamed consistently across
    /// clones for the detector to group them.
    #[serde(default)]
    pub consistent_cross_file: bool,

    /// Persist detector stdout/stderr to a timestamped log even on
    /// success.
    #[serde(default)]
    pub log_runs: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            command: default_detector_command(),
            consistent_cross_file: false,
            log_runs: false,
        }
    }
}

/// Which files are copied into the staging area, beyond pytest's default
/// discovery names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Extra include globs, matched against paths relative to the
    /// candidate root and against bare file names.
    #[serde(default)]
    pub include: Vec<String>,
}

fn default_detector_command() -> String {
    "nicad6".to_string()
}

impl Config {
    /// Load configuration. An explicitly given path must exist and parse;
    /// otherwise `paramerge.toml` in the current directory is used when
    /// present, and built-in defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    debug!("no {CONFIG_FILE} found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}
