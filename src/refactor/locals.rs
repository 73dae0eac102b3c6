//! Local-binding classification of identifier divergences.
//!
//! A divergent identifier that is (re)assigned inside the function body is
//! clone-local: hoisting it into a shared parameter would freeze a value
//! that the body overwrites. Definition order is assumed unconditional;
//! this is a deliberate approximation, not data-flow analysis.

use super::diff::{Divergence, DivergenceKind};
use crate::refactor::parametrize::ParamValue;
use log::debug;
use std::collections::HashMap;

/// Clear `to_extract` on identifier divergences that are assignment
/// targets, or whose use site is later than the earliest line at which the
/// same signature appears as an assignment target.
pub fn exclude_local_bindings(divergences: &mut [Divergence]) {
    let mut earliest_definition: HashMap<Vec<ParamValue>, usize> = HashMap::new();

    for d in divergences.iter() {
        if d.kind == DivergenceKind::Identifier && d.assign_target {
            let entry = earliest_definition
                .entry(d.values.clone())
                .or_insert(usize::MAX);
            *entry = (*entry).min(d.line);
        }
    }

    for d in divergences.iter_mut() {
        if d.kind != DivergenceKind::Identifier {
            continue;
        }
        let defined_before = earliest_definition
            .get(&d.values)
            .is_some_and(|def_line| d.line > *def_line);
        if d.assign_target || defined_before {
            debug!(
                "not extracting local binding {:?} (line {})",
                d.values, d.line
            );
            d.to_extract = false;
        }
    }
}
