//! Lockstep structural differencing over N congruent clone trees.
//!
//! The walk advances through all clones' children in source order. At each
//! position there are two distinct checks: congruence (same node kind and
//! same child count — a violation is fatal, the inputs are not type-2
//! clones) and divergence (same kind, different value — recorded for
//! extraction). Literal and identifier divergences stop recursion at the
//! divergent node; an attribute-member divergence is reported but never
//! extracted, and the walk continues into the base expression.

use crate::ast::{NodeId, NodeKind, SourceTree};
use crate::errors::RefactorError;
use crate::refactor::parametrize::ParamValue;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DivergenceKind {
    Literal,
    Identifier,
    AttributeMember,
}

/// One tree position where the clones disagree in value.
#[derive(Debug, Clone)]
pub struct Divergence {
    pub kind: DivergenceKind,
    /// Divergent node per clone, in clone order.
    pub nodes: Vec<NodeId>,
    /// Parent of the divergent node per clone.
    pub parents: Vec<NodeId>,
    /// Original per-clone values; the ordered tuple is the divergence's
    /// signature.
    pub values: Vec<ParamValue>,
    pub line: usize,
    /// The divergent identifier sits in assignment-target position.
    pub assign_target: bool,
    pub to_extract: bool,
    pub previously_extracted: bool,
    pub placeholder: Option<String>,
}

impl Divergence {
    fn new(
        kind: DivergenceKind,
        nodes: Vec<NodeId>,
        parents: Vec<NodeId>,
        values: Vec<ParamValue>,
        line: usize,
        assign_target: bool,
    ) -> Self {
        // Attribute-member divergence is reported-only by policy.
        let to_extract = kind != DivergenceKind::AttributeMember;
        Self {
            kind,
            nodes,
            parents,
            values,
            line,
            assign_target,
            to_extract,
            previously_extracted: false,
            placeholder: None,
        }
    }

    /// Equal signatures must map to the same placeholder.
    pub fn signature(&self) -> (DivergenceKind, &[ParamValue]) {
        (self.kind, &self.values)
    }
}

/// Walk the clone trees in lockstep and collect every divergence.
pub fn diff_clones(
    tree: &SourceTree,
    roots: &[NodeId],
) -> Result<Vec<Divergence>, RefactorError> {
    debug_assert!(roots.len() >= 2);
    check_congruent(tree, roots)?;
    let mut divergences = Vec::new();
    walk(tree, roots, false, &mut divergences)?;
    debug!("found {} divergence(s)", divergences.len());
    Ok(divergences)
}

fn walk(
    tree: &SourceTree,
    parents: &[NodeId],
    in_assign_target: bool,
    out: &mut Vec<Divergence>,
) -> Result<(), RefactorError> {
    let count = tree.children(parents[0]).len();
    if parents
        .iter()
        .any(|p| tree.children(*p).len() != count)
    {
        let counts: Vec<usize> = parents.iter().map(|p| tree.children(*p).len()).collect();
        return Err(RefactorError::StructuralMismatch {
            line: tree.node(parents[0]).line,
            detail: format!(
                "clones have {:?} children under `{}`",
                counts,
                tree.kind(parents[0]).label()
            ),
        });
    }

    let parent_is_assignment = matches!(tree.kind(parents[0]), NodeKind::Assignment);

    for position in 0..count {
        let children: Vec<NodeId> = parents
            .iter()
            .map(|p| tree.children(*p)[position])
            .collect();
        check_congruent(tree, &children)?;

        // Assignment-target context holds in the left subtree of an
        // assignment and propagates through tuple patterns only; an
        // attribute or subscript store does not bind its base name.
        let context = if parent_is_assignment {
            position == 0
        } else {
            in_assign_target && matches!(tree.kind(parents[0]), NodeKind::Tuple)
        };

        let line = tree.node(children[0]).line;
        match tree.kind(children[0]) {
            NodeKind::Literal { value: first } => {
                let diverges = children
                    .iter()
                    .any(|c| !matches!(tree.kind(*c), NodeKind::Literal { value } if value == first));
                if diverges {
                    out.push(Divergence::new(
                        DivergenceKind::Literal,
                        children.clone(),
                        parents.to_vec(),
                        values_of(tree, &children),
                        line,
                        false,
                    ));
                }
            }
            NodeKind::Identifier { name: first } => {
                let diverges = children.iter().any(
                    |c| !matches!(tree.kind(*c), NodeKind::Identifier { name } if name == first),
                );
                if diverges {
                    out.push(Divergence::new(
                        DivergenceKind::Identifier,
                        children.clone(),
                        parents.to_vec(),
                        values_of(tree, &children),
                        line,
                        context,
                    ));
                }
            }
            NodeKind::Attribute { member: first } => {
                let diverges = children.iter().any(
                    |c| !matches!(tree.kind(*c), NodeKind::Attribute { member } if member == first),
                );
                if diverges {
                    warn!(
                        "attribute members differ at line {line}; left as-is (not extracted)"
                    );
                    out.push(Divergence::new(
                        DivergenceKind::AttributeMember,
                        children.clone(),
                        parents.to_vec(),
                        member_values(tree, &children),
                        line,
                        false,
                    ));
                }
                // Base expression is still walked for divergences.
                walk(tree, &children, false, out)?;
            }
            NodeKind::Parameters => {
                // Formal parameter lists are reconciled by the driver on
                // merge, not parametrized.
            }
            _ => {
                walk(tree, &children, context, out)?;
            }
        }
    }
    Ok(())
}

/// Congruence check proper: every clone must present the same node kind at
/// this position.
fn check_congruent(tree: &SourceTree, nodes: &[NodeId]) -> Result<(), RefactorError> {
    let first = tree.kind(nodes[0]);
    if let Some(odd) = nodes.iter().find(|n| !tree.kind(**n).congruent(first)) {
        return Err(RefactorError::StructuralMismatch {
            line: tree.node(nodes[0]).line,
            detail: format!(
                "`{}` vs `{}`",
                first.label(),
                tree.kind(*odd).label()
            ),
        });
    }
    Ok(())
}

fn values_of(tree: &SourceTree, nodes: &[NodeId]) -> Vec<ParamValue> {
    nodes
        .iter()
        .map(|n| ParamValue::from_node(tree, *n))
        .collect()
}

fn member_values(tree: &SourceTree, nodes: &[NodeId]) -> Vec<ParamValue> {
    nodes
        .iter()
        .map(|n| match tree.kind(*n) {
            NodeKind::Attribute { member } => ParamValue::Name(member.clone()),
            _ => ParamValue::from_node(tree, *n),
        })
        .collect()
}
