//! Clone class driver: the single-shot state machine that takes one class
//! of type-2 clones from `Created` to `Merged`.
//!
//! Transitions are strictly sequential. A class that short-circuits
//! (fewer than two clones after fixture filtering, or nothing extractable
//! after differencing) ends `Merged` without touching any source. All
//! mutation for a class, including detachment of redundant clones,
//! completes inside `refactor` before the tree is handed to the next
//! class.

use super::allocator::NameAllocator;
use super::clone::Clone;
use super::diff::{diff_clones, Divergence};
use super::extract::extract_divergences;
use super::locals::exclude_local_bindings;
use super::synthesize::{synthesize, Synthesis};
use crate::ast::SourceTree;
use crate::errors::RefactorError;
use log::{info, warn};

/// Fixed suffix marking the merged form of the target.
pub const MERGED_SUFFIX: &str = "_parametrized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Filtered,
    Differenced,
    Classified,
    Extracted,
    Synthesized,
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer than two clones remain after fixture filtering.
    InsufficientClones,
    /// The clones are identical (or every divergence is a local binding).
    NothingToExtract,
}

#[derive(Debug)]
pub enum RefactorOutcome {
    Merged {
        target: String,
        new_parameters: usize,
        detached: usize,
    },
    Skipped(SkipReason),
    /// `refactor` was called again on a terminal instance.
    AlreadyMerged,
}

pub struct CloneClass {
    id: usize,
    clones: Vec<Clone>,
    allocator: NameAllocator,
    divergences: Vec<Divergence>,
    phase: Phase,
}

impl CloneClass {
    pub fn new(id: usize, clones: Vec<Clone>) -> Self {
        Self {
            id,
            clones,
            allocator: NameAllocator::new(),
            divergences: Vec::new(),
            phase: Phase::Created,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn clones(&self) -> &[Clone] {
        &self.clones
    }

    /// Run the class to completion. Calling this on an already-merged
    /// instance is a no-op guarded by the state machine, not a re-run.
    pub fn refactor(&mut self, tree: &mut SourceTree) -> Result<RefactorOutcome, RefactorError> {
        if self.phase == Phase::Merged {
            return Ok(RefactorOutcome::AlreadyMerged);
        }

        self.clones.retain(|clone| {
            if clone.is_fixture {
                info!(
                    "clone class {}: excluding fixture `{}`",
                    self.id, clone.funcname
                );
            }
            !clone.is_fixture
        });
        self.phase = Phase::Filtered;

        if self.clones.len() < 2 {
            warn!(
                "clone class {}: cannot parametrize {} clone(s), skipping",
                self.id,
                self.clones.len()
            );
            self.phase = Phase::Merged;
            return Ok(RefactorOutcome::Skipped(SkipReason::InsufficientClones));
        }

        let roots: Vec<_> = self.clones.iter().map(|c| c.node).collect();
        self.divergences = diff_clones(tree, &roots)?;
        self.phase = Phase::Differenced;

        exclude_local_bindings(&mut self.divergences);
        self.phase = Phase::Classified;

        if !self.divergences.iter().any(|d| d.to_extract) {
            info!("clone class {}: nothing to extract, skipping", self.id);
            self.phase = Phase::Merged;
            return Ok(RefactorOutcome::Skipped(SkipReason::NothingToExtract));
        }

        extract_divergences(tree, &mut self.divergences, &mut self.allocator)?;
        self.phase = Phase::Extracted;

        let synthesis = synthesize(&self.clones, &self.divergences);
        self.phase = Phase::Synthesized;

        let outcome = self.merge(tree, synthesis)?;
        self.phase = Phase::Merged;
        Ok(outcome)
    }

    fn merge(
        &mut self,
        tree: &mut SourceTree,
        synthesis: Synthesis,
    ) -> Result<RefactorOutcome, RefactorError> {
        let detached = self.clones.len() - 1;
        for redundant in &self.clones[1..] {
            redundant.detach(tree)?;
        }

        let target = &self.clones[0];

        // Formal parameters: pre-existing minus covered, placeholders
        // appended in allocation order.
        if let Some(span) = target.params_span(tree) {
            let mut params: Vec<String> = target
                .formal_params(tree)
                .into_iter()
                .filter(|p| !synthesis.covered.contains(p))
                .collect();
            params.extend(self.allocator.names().iter().cloned());
            tree.record_edit(target.file, span, format!("({})", params.join(", ")));
        }

        // The consumed parametrize decorator is superseded by the
        // synthesized one.
        if let Some(existing) = &target.existing {
            let span = tree.node(existing.decorator).span.clone();
            let span = tree.line_extent(target.file, span);
            tree.record_edit(target.file, span, String::new());
        }

        let meta = tree
            .fn_meta(target.node)
            .map(|m| (m.def_start, m.name_span.clone()));
        if let Some((def_start, name_span)) = meta {
            let text = &tree.file(target.file).text;
            let line_start = text[..def_start].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let indent = text[line_start..def_start].to_string();
            let decorator = format!("{indent}{}\n", synthesis.metadata.render());
            tree.record_edit(target.file, line_start..line_start, decorator);
            tree.record_edit(
                target.file,
                name_span,
                format!("{}{MERGED_SUFFIX}", target.funcname),
            );
        }

        let new_parameters = self.allocator.names().len();
        let (names, constants, other) = self.allocator.counts();
        info!(
            "clone class {}: merged {} clones into `{}{MERGED_SUFFIX}` \
             ({names} names, {constants} constants, {other} other)",
            self.id,
            detached + 1,
            target.funcname
        );
        Ok(RefactorOutcome::Merged {
            target: format!("{}{MERGED_SUFFIX}", target.funcname),
            new_parameters,
            detached,
        })
    }
}
