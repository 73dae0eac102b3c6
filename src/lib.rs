// Export modules for library usage
pub mod ast;
pub mod cli;
pub mod commands;
pub mod config;
pub mod detect;
pub mod errors;
pub mod refactor;

// Re-export commonly used types
pub use crate::ast::{FileId, NodeId, NodeKind, SourceTree};
pub use crate::errors::{DetectError, RefactorError, TreeError};
pub use crate::refactor::{
    Clone, CloneClass, Divergence, DivergenceKind, ParametrizeMetadata, RefactorOutcome,
};
