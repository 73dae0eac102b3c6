//! One clone: a function definition plus everything the driver needs to
//! merge or discard it.

use super::parametrize::{scan_decorators, ParsedParametrize};
use crate::ast::{FileId, NodeId, NodeKind, SourceTree, Span};
use crate::errors::{RefactorError, TreeError};

#[derive(Debug)]
pub struct Clone {
    pub node: NodeId,
    /// Enclosing scope, used for detachment.
    pub parent: NodeId,
    pub file: FileId,
    pub line: usize,
    pub funcname: String,
    /// Fixtures are excluded from merging: parametrizing a fixture would
    /// parametrize every test consuming it.
    pub is_fixture: bool,
    pub unknown_decorator: bool,
    /// Pre-existing parametrization, consumed off the decorator list.
    pub existing: Option<ParsedParametrize>,
}

impl Clone {
    /// Build a clone from a function node, parsing its decorator list.
    pub fn from_function(
        tree: &SourceTree,
        node: NodeId,
        parent: NodeId,
    ) -> Result<Self, RefactorError> {
        let funcname = match tree.kind(node) {
            NodeKind::FunctionDef { name } => name.clone(),
            other => {
                return Err(RefactorError::StructuralMismatch {
                    line: tree.node(node).line,
                    detail: format!("clone candidate is a `{}`, not a function", other.label()),
                })
            }
        };
        let scan = scan_decorators(tree, node, &funcname)?;
        Ok(Self {
            node,
            parent,
            file: tree.node(node).file,
            line: tree.node(node).line,
            funcname,
            is_fixture: scan.is_fixture,
            unknown_decorator: scan.unknown,
            existing: scan.parametrize,
        })
    }

    /// Remove this clone's function node from its enclosing scope.
    pub fn detach(&self, tree: &mut SourceTree) -> Result<(), TreeError> {
        tree.remove_child(self.parent, self.node)
    }

    /// The formal parameter names, in declaration order.
    pub fn formal_params(&self, tree: &SourceTree) -> Vec<String> {
        let Some(params) = self.params_node(tree) else {
            return Vec::new();
        };
        tree.children(params)
            .iter()
            .filter_map(|p| param_name(tree, *p))
            .collect()
    }

    /// Span of the parameter list including parentheses.
    pub fn params_span(&self, tree: &SourceTree) -> Option<Span> {
        self.params_node(tree).map(|p| tree.node(p).span.clone())
    }

    fn params_node(&self, tree: &SourceTree) -> Option<NodeId> {
        tree.children(self.node)
            .first()
            .copied()
            .filter(|c| matches!(tree.kind(*c), NodeKind::Parameters))
    }
}

/// Name of a formal parameter node; defaulted and typed parameters carry
/// the identifier as their first descendant.
fn param_name(tree: &SourceTree, id: NodeId) -> Option<String> {
    match tree.kind(id) {
        NodeKind::Identifier { name } => Some(name.clone()),
        _ => tree
            .children(id)
            .first()
            .and_then(|c| param_name(tree, *c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse::parse_source;

    fn first_clone(src: &str) -> (SourceTree, Clone) {
        let mut tree = SourceTree::new();
        let file = parse_source(&mut tree, "test_mod.py".into(), src).unwrap();
        let (node, parent) = tree.functions_with_parents(file)[0];
        let clone = Clone::from_function(&tree, node, parent).unwrap();
        (tree, clone)
    }

    #[test]
    fn plain_test_function() {
        let (_, clone) = first_clone("def test_addition():\n    assert 1\n");
        assert_eq!(clone.funcname, "test_addition");
        assert!(!clone.is_fixture);
        assert!(clone.existing.is_none());
    }

    #[test]
    fn fixture_is_flagged() {
        let (_, clone) = first_clone("@pytest.fixture\ndef calc():\n    return 1\n");
        assert!(clone.is_fixture);
    }

    #[test]
    fn parametrize_is_consumed_into_metadata() {
        let (_, clone) = first_clone(
            "@pytest.mark.parametrize('n', [1, 2])\ndef test_n(n):\n    assert n\n",
        );
        let existing = clone.existing.unwrap();
        assert_eq!(existing.argnames, vec!["n"]);
        assert_eq!(existing.values["n"].len(), 2);
    }

    #[test]
    fn formal_params_in_order() {
        let (tree, clone) = first_clone("def test_x(a, b, c=1):\n    assert a\n");
        assert_eq!(clone.formal_params(&tree), vec!["a", "b", "c"]);
        let span = clone.params_span(&tree).unwrap();
        assert_eq!(span, 10..21);
    }

    #[test]
    fn detach_removes_source_lines() {
        let src = "def test_a():\n    assert 1\n\ndef test_b():\n    assert 2\n";
        let mut tree = SourceTree::new();
        let file = parse_source(&mut tree, "test_mod.py".into(), src).unwrap();
        let (node, parent) = tree.functions_with_parents(file)[1];
        let clone = Clone::from_function(&tree, node, parent).unwrap();
        clone.detach(&mut tree).unwrap();
        assert_eq!(
            tree.rendered(file).unwrap(),
            "def test_a():\n    assert 1\n\n"
        );
    }
}
