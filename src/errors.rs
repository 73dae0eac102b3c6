//! Error taxonomy for clone refactoring.
//!
//! Fatal conditions abort the clone class (or the run, for detector errors)
//! and carry enough context to locate the failure. Non-fatal conditions
//! (unknown decorators, classes with too few clones) are reported through
//! logging and [`crate::refactor::RefactorOutcome`], not through `Err`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefactorError {
    /// Clones disagree in node kind or child count at a matching tree
    /// position. The inputs are not valid type-2 clones.
    #[error("structural mismatch at line {line}: {detail}")]
    StructuralMismatch { line: usize, detail: String },

    /// A pre-existing parametrize decorator supplies its values through a
    /// name instead of literal data, so the values cannot be known at
    /// transform time.
    #[error(
        "unsupported parametrize form on `{function}` (line {line}): \
         argument values must be literal data, not a name"
    )]
    UnsupportedParametrizeForm { function: String, line: usize },

    /// A parametrize decorator whose shape the parser cannot interpret.
    #[error("malformed parametrize decorator on `{function}` (line {line}): {detail}")]
    MalformedParametrize {
        function: String,
        line: usize,
        detail: String,
    },

    #[error("tree edit failed: {0}")]
    Tree(#[from] TreeError),
}

/// Failures of the arena mutation API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("replace target is not a child of the given parent")]
    ReplaceTargetNotFound,

    #[error("detach target is not a child of the given parent")]
    DetachTargetNotFound,

    #[error("source edits overlap at byte {at}")]
    OverlappingEdits { at: usize },
}

/// Failures of the external clone-detection collaborator.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to stage {path} for detection: {source}")]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid include pattern `{pattern}`: {source}")]
    BadPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to run clone detector `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("clone detector reported errors; see {log}")]
    DetectorFailed { log: PathBuf },

    #[error("clone report not found at {path}")]
    MissingReport { path: PathBuf },

    #[error("malformed clone report {path} (line {line}): {detail}")]
    MalformedReport {
        path: PathBuf,
        line: usize,
        detail: String,
    },
}
