//! Extraction and substitution of divergences.
//!
//! Every extractable divergence is replaced, in every clone, by a shared
//! placeholder identifier. Divergences with equal signatures collapse to
//! one placeholder so a value the original clones reused in several places
//! stays a single parameter.

use super::allocator::{NameAllocator, NameCategory};
use super::diff::{Divergence, DivergenceKind};
use crate::ast::SourceTree;
use crate::errors::RefactorError;
use crate::refactor::parametrize::ParamValue;
use log::debug;
use std::collections::HashMap;

/// Substitute placeholders for all `to_extract` divergences, assigning
/// names through `allocator`. Returns the number of sites rewritten.
pub fn extract_divergences(
    tree: &mut SourceTree,
    divergences: &mut [Divergence],
    allocator: &mut NameAllocator,
) -> Result<usize, RefactorError> {
    let mut assigned: HashMap<(DivergenceKind, Vec<ParamValue>), String> = HashMap::new();
    let mut extracted = 0;

    for d in divergences.iter_mut() {
        if !d.to_extract {
            continue;
        }
        let key = (d.kind, d.values.clone());
        let placeholder = match assigned.get(&key) {
            Some(existing) => {
                d.previously_extracted = true;
                existing.clone()
            }
            None => {
                let category = match d.kind {
                    DivergenceKind::Identifier => NameCategory::Name,
                    DivergenceKind::Literal => NameCategory::Constant,
                    DivergenceKind::AttributeMember => NameCategory::Var,
                };
                let name = allocator.allocate(category);
                assigned.insert(key, name.clone());
                name
            }
        };

        for (node, parent) in d.nodes.iter().zip(&d.parents) {
            let replacement = tree.new_identifier(&placeholder, *node);
            tree.replace_child(*parent, *node, replacement)?;
        }
        debug!(
            "extracted {:?} at line {} as `{placeholder}`",
            d.values, d.line
        );
        d.placeholder = Some(placeholder);
        extracted += 1;
    }

    Ok(extracted)
}
