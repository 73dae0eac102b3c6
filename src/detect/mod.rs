//! External clone-detection collaborator.
//!
//! Detection is delegated to NiCad, run as a blocking subprocess over a
//! staged copy of the candidate tree. NiCad signals failure in its stdout
//! rather than its exit status, so stdout is scanned for its error marker
//! and persisted to a timestamped log when something goes wrong (or when
//! run logging is switched on).

pub mod report;
pub mod staging;

use crate::config::DetectorConfig;
use crate::errors::DetectError;
use chrono::Local;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// NiCad prefixes failure lines with this marker and still exits zero.
const ERROR_MARKER: &str = "*** ERROR";

pub struct Detector {
    command: String,
    consistent_cross_file: bool,
    log_runs: bool,
}

impl Detector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            command: config.command.clone(),
            consistent_cross_file: config.consistent_cross_file,
            log_runs: config.log_runs,
        }
    }

    fn granularity(&self) -> &'static str {
        if self.consistent_cross_file {
            "type2_consistent_abstracted"
        } else {
            "type2_abstracted"
        }
    }

    /// Where NiCad leaves the classes report for a given staged root.
    /// The output directory is a sibling of the staged root named after it.
    fn report_path(&self, staged_root: &Path) -> PathBuf {
        let family = if self.consistent_cross_file {
            "functions-consistent-abstract-clones"
        } else {
            "functions-blind-abstract-clones"
        };
        let stem = staged_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        staged_root.with_file_name(format!(
            "{stem}_{family}/{stem}_{family}-0.00-classes.xml"
        ))
    }

    /// Run the detector over a staged tree and return the classes report.
    pub fn run(&self, staged_root: &Path) -> Result<PathBuf, DetectError> {
        // NiCad requires the trailing slash on the system directory.
        let target = format!("{}/", staged_root.display());
        info!(
            "running `{} functions py {target} {}`",
            self.command,
            self.granularity()
        );
        let output = Command::new(&self.command)
            .args(["functions", "py", &target, self.granularity()])
            .output()
            .map_err(|e| DetectError::Spawn {
                command: self.command.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let failed = stdout.contains(ERROR_MARKER) || !output.status.success();

        if failed || self.log_runs {
            let log = self.write_log(&stdout, &stderr);
            if failed {
                let log = log.unwrap_or_else(|| PathBuf::from("<log write failed>"));
                return Err(DetectError::DetectorFailed { log });
            }
        }

        let report = self.report_path(staged_root);
        if !report.is_file() {
            return Err(DetectError::MissingReport { path: report });
        }
        Ok(report)
    }

    fn write_log(&self, stdout: &str, stderr: &str) -> Option<PathBuf> {
        let name = format!("nicad{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S"));
        let path = PathBuf::from(name);
        match fs::write(&path, format!("{stdout}{stderr}")) {
            Ok(()) => {
                info!("clone detection logged in {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("could not write detector log {}: {e}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(consistent: bool) -> Detector {
        Detector {
            command: "nicad6".to_string(),
            consistent_cross_file: consistent,
            log_runs: false,
        }
    }

    #[test]
    fn report_path_tracks_granularity() {
        let blind = detector(false).report_path(Path::new("/tmp/work/staged"));
        assert_eq!(
            blind,
            Path::new(
                "/tmp/work/staged_functions-blind-abstract-clones/\
                 staged_functions-blind-abstract-clones-0.00-classes.xml"
            )
        );

        let consistent = detector(true).report_path(Path::new("/tmp/work/staged"));
        assert_eq!(
            consistent,
            Path::new(
                "/tmp/work/staged_functions-consistent-abstract-clones/\
                 staged_functions-consistent-abstract-clones-0.00-classes.xml"
            )
        );
    }

    #[test]
    fn missing_binary_reports_the_command() {
        let d = Detector {
            command: "definitely-not-a-clone-detector".to_string(),
            consistent_cross_file: false,
            log_runs: false,
        };
        let err = d.run(Path::new("/tmp/nonexistent/staged")).unwrap_err();
        match err {
            DetectError::Spawn { command, .. } => {
                assert_eq!(command, "definitely-not-a-clone-detector")
            }
            other => panic!("expected spawn failure, got {other:?}"),
        }
    }
}
