//! Parametrization synthesis: merging freshly extracted placeholders with
//! each clone's pre-existing parametrization.
//!
//! Pass 1 records one value per clone for every new placeholder. Pass 2
//! folds pre-existing annotations in: where a pre-existing argument name
//! was itself re-extracted (it appears as a name reference in a
//! placeholder's value list), its value list is spliced in place of the
//! reference and the argument is *covered* — its formal parameter goes
//! away. Pre-existing arguments that survive keep their name and precede
//! the placeholders in the final annotation.

use super::clone::Clone;
use super::diff::Divergence;
use super::parametrize::{ParamValue, ParametrizeMetadata};
use log::debug;

pub struct Synthesis {
    pub metadata: ParametrizeMetadata,
    /// Pre-existing argument names fully folded into placeholder value
    /// lists; their formal parameters are removed from the target.
    pub covered: Vec<String>,
}

pub fn synthesize(clones: &[Clone], divergences: &[Divergence]) -> Synthesis {
    let mut metadata = ParametrizeMetadata::new(clones.len());

    // Pass 1: new placeholders, one value per clone.
    for d in divergences {
        if !d.to_extract || d.previously_extracted {
            continue;
        }
        let Some(placeholder) = &d.placeholder else {
            continue;
        };
        metadata.add_argname(placeholder);
        for (clone_index, value) in d.values.iter().enumerate() {
            metadata.push_value(clone_index, placeholder, value.clone());
        }
    }
    let placeholders: Vec<String> = metadata.argnames().to_vec();

    // Pass 2: fold pre-existing parametrization per clone.
    let mut covered = Vec::new();
    let mut retained = Vec::new();
    for (clone_index, clone) in clones.iter().enumerate() {
        let Some(existing) = &clone.existing else {
            continue;
        };
        for argname in &existing.argnames {
            let values = existing
                .values
                .get(argname)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            // The same name may have been re-extracted at several sites;
            // resolve every reference, not just the first.
            let mut spliced = false;
            for placeholder in &placeholders {
                if metadata.splice_name_reference(clone_index, placeholder, argname, values) {
                    spliced = true;
                }
            }
            if spliced {
                debug!(
                    "`{argname}` of `{}` resolved into placeholder values",
                    clone.funcname
                );
                if !covered.contains(argname) {
                    covered.push(argname.clone());
                }
            } else {
                metadata.add_argname(argname);
                if !retained.contains(argname) {
                    retained.push(argname.clone());
                }
                for value in values {
                    metadata.push_value(clone_index, argname, value.clone());
                }
            }
        }
    }

    // An argument spliced away in one clone can still be retained by
    // another; it then stays an argname, so its formal parameter must
    // survive too.
    covered.retain(|name| !retained.contains(name));

    // A clone with no prior parametrization over a retained argument
    // contributes the bare name reference, keeping every value list
    // non-empty.
    for argname in &retained {
        for clone_index in 0..clones.len() {
            if metadata.values_for(clone_index, argname).is_empty() {
                metadata.push_value(clone_index, argname, ParamValue::Name(argname.clone()));
            }
        }
    }

    metadata.order_front(&retained);
    Synthesis { metadata, covered }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse::parse_source;
    use crate::ast::SourceTree;
    use crate::refactor::allocator::NameAllocator;
    use crate::refactor::diff::diff_clones;
    use crate::refactor::extract::extract_divergences;
    use crate::refactor::locals::exclude_local_bindings;

    fn synthesis_for(sources: &[&str]) -> Synthesis {
        let mut tree = SourceTree::new();
        let mut clones = Vec::new();
        for (i, src) in sources.iter().enumerate() {
            let file = parse_source(&mut tree, format!("test_{i}.py").into(), src).unwrap();
            let (node, parent) = tree.functions_with_parents(file)[0];
            clones.push(Clone::from_function(&tree, node, parent).unwrap());
        }
        let roots: Vec<_> = clones.iter().map(|c| c.node).collect();
        let mut divergences = diff_clones(&tree, &roots).unwrap();
        exclude_local_bindings(&mut divergences);
        let mut allocator = NameAllocator::new();
        extract_divergences(&mut tree, &mut divergences, &mut allocator).unwrap();
        synthesize(&clones, &divergences)
    }

    #[test]
    fn one_tuple_per_clone_without_prior_parametrization() {
        let synthesis = synthesis_for(&[
            "def test_a():\n    assert f(5, a) == 3\n",
            "def test_b():\n    assert f(2, b) == 1\n",
        ]);
        // `3` vs `1` also diverges, so three argnames in source order
        assert_eq!(
            synthesis.metadata.argnames(),
            &[
                "parametrized_constant_0",
                "parametrized_name_0",
                "parametrized_constant_1"
            ]
        );
        let rows = synthesis.metadata.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                ParamValue::Literal("5".to_string()),
                ParamValue::Name("a".to_string()),
                ParamValue::Literal("3".to_string())
            ]
        );
        assert!(synthesis.covered.is_empty());
    }

    #[test]
    fn pre_existing_argument_is_retained_and_ordered_first() {
        let synthesis = synthesis_for(&[
            "@pytest.mark.parametrize('x', [1, 2])\n\
             def test_a(x):\n    assert f(x) == 10\n",
            "def test_b(x):\n    assert f(x) == 20\n",
        ]);
        assert_eq!(
            synthesis.metadata.argnames(),
            &["x", "parametrized_constant_0"]
        );
        let rows = synthesis.metadata.rows();
        // clone 0: two x values paired with its one new value; clone 1: one
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![
                ParamValue::Literal("1".to_string()),
                ParamValue::Literal("10".to_string())
            ]
        );
        assert_eq!(
            rows[1],
            vec![
                ParamValue::Literal("2".to_string()),
                ParamValue::Literal("10".to_string())
            ]
        );
        assert_eq!(
            rows[2],
            vec![
                ParamValue::Name("x".to_string()),
                ParamValue::Literal("20".to_string())
            ]
        );
        assert!(synthesis.covered.is_empty());
    }

    #[test]
    fn re_extracted_pre_existing_argument_is_covered() {
        // clone 0 parametrized `old_name`; its use site diverges from
        // clone 1's `b`, so the extracted placeholder records the name
        // reference, which pass 2 resolves into the literal values.
        let synthesis = synthesis_for(&[
            "@pytest.mark.parametrize('old_name', ['u', 'v'])\n\
             def test_a(old_name):\n    check(old_name)\n",
            "def test_b():\n    check(b)\n",
        ]);
        assert_eq!(synthesis.metadata.argnames(), &["parametrized_name_0"]);
        assert_eq!(synthesis.covered, vec!["old_name"]);
        let rows = synthesis.metadata.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![ParamValue::Literal("'u'".to_string())]);
        assert_eq!(rows[1], vec![ParamValue::Literal("'v'".to_string())]);
        assert_eq!(rows[2], vec![ParamValue::Name("b".to_string())]);
    }

    #[test]
    fn argument_retained_by_one_clone_is_not_covered_by_another() {
        // clone 1's `x` use site diverges and is spliced into the
        // placeholder, but clone 0 keeps `x` as a plain argument. The name
        // stays in the argnames, so its formal parameter must stay too.
        let synthesis = synthesis_for(&[
            "@pytest.mark.parametrize('x', [1, 2])\n\
             def test_a(x):\n    assert f(x, a) == 9\n",
            "@pytest.mark.parametrize('x', [3])\n\
             def test_b(x):\n    assert f(x, x) == 9\n",
        ]);
        assert_eq!(
            synthesis.metadata.argnames(),
            &["x", "parametrized_name_0"]
        );
        assert!(synthesis.covered.is_empty());
        let rows = synthesis.metadata.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![
                ParamValue::Literal("1".to_string()),
                ParamValue::Name("a".to_string())
            ]
        );
        assert_eq!(
            rows[1],
            vec![
                ParamValue::Literal("2".to_string()),
                ParamValue::Name("a".to_string())
            ]
        );
        assert_eq!(
            rows[2],
            vec![
                ParamValue::Name("x".to_string()),
                ParamValue::Literal("3".to_string())
            ]
        );
    }
}
