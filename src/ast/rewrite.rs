//! Byte-range edits over original source text.
//!
//! Edits accumulate while a clone class is processed and are applied in one
//! pass per file. An edit nested inside a deletion (a replaced divergence
//! node inside a detached clone) is subsumed by it; partially overlapping
//! edits indicate a bug and are rejected.

use crate::errors::TreeError;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Range<usize>,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply all edits to `source`, dropping edits contained in an outer
    /// one and rejecting partial overlaps.
    pub fn apply(&self, source: &str) -> Result<String, TreeError> {
        let mut sorted: Vec<&Edit> = self.edits.iter().collect();
        // By start; insertions (empty spans) ahead of a replacement at the
        // same byte so they are not mistaken for a subsumed edit; then
        // widest first so outer deletions precede anything they cover.
        sorted.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then_with(|| b.span.is_empty().cmp(&a.span.is_empty()))
                .then_with(|| b.span.end.cmp(&a.span.end))
        });

        let mut kept: Vec<&Edit> = Vec::with_capacity(sorted.len());
        for edit in sorted {
            match kept.last() {
                Some(prev) if edit.span.start < prev.span.end => {
                    if edit.span.end <= prev.span.end {
                        continue; // subsumed
                    }
                    return Err(TreeError::OverlappingEdits {
                        at: edit.span.start,
                    });
                }
                _ => kept.push(edit),
            }
        }

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in kept {
            out.push_str(&source[cursor..edit.span.start]);
            out.push_str(&edit.text);
            cursor = edit.span.end;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }
}
