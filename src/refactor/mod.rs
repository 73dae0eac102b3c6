//! The merging pipeline: one clone class in, one parametrized function out.

pub mod allocator;
pub mod clone;
pub mod diff;
pub mod driver;
pub mod extract;
pub mod locals;
pub mod parametrize;
pub mod synthesize;

pub use allocator::{NameAllocator, NameCategory};
pub use clone::Clone;
pub use diff::{diff_clones, Divergence, DivergenceKind};
pub use driver::{CloneClass, Phase, RefactorOutcome, SkipReason, MERGED_SUFFIX};
pub use extract::extract_divergences;
pub use locals::exclude_local_bindings;
pub use parametrize::{ParamValue, ParametrizeMetadata, ParsedParametrize};
pub use synthesize::{synthesize, Synthesis};
