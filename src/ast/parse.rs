//! tree-sitter-python ingestion into the arena model.
//!
//! The conversion mirrors Python's own `ast.iter_child_nodes` shape where it
//! matters for lockstep differencing: attribute member names and function
//! names are carried on the node kind rather than as child identifiers, and
//! decorators are kept out of the function's child list (they are parsed
//! separately and re-synthesized on merge).

use super::{FileId, FnMeta, Node, NodeId, NodeKind, SourceTree};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use tree_sitter::Parser;

/// Parse one Python source file into the shared arena.
pub fn parse_source(tree: &mut SourceTree, path: PathBuf, text: &str) -> Result<FileId> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .context("failed to load Python grammar")?;
    let parsed = parser
        .parse(text, None)
        .ok_or_else(|| anyhow!("tree-sitter returned no tree for {}", path.display()))?;
    if parsed.root_node().has_error() {
        return Err(anyhow!("syntax errors in {}", path.display()));
    }

    let file = tree.add_file(path, text.to_string());
    let root = convert(tree, file, text, parsed.root_node())
        .ok_or_else(|| anyhow!("empty module"))?;
    tree.set_root(file, root);
    Ok(file)
}

fn convert(
    tree: &mut SourceTree,
    file: FileId,
    src: &str,
    node: tree_sitter::Node,
) -> Option<NodeId> {
    let kind = match node.kind() {
        "comment" => return None,
        "decorated_definition" => {
            return convert_decorated(tree, file, src, node);
        }
        "function_definition" => {
            return Some(convert_function(tree, file, src, node, node.byte_range(), Vec::new()));
        }
        "module" => NodeKind::Module,
        "assignment" => {
            // Keep the target/value pair explicit so the differencer can
            // track assignment-target context. Augmented assignment is a
            // read-modify-write, not a plain binding, and stays generic.
            let left = node.child_by_field_name("left")?;
            let right = node.child_by_field_name("right")?;
            let children: Vec<NodeId> = [left, right]
                .into_iter()
                .filter_map(|c| convert(tree, file, src, c))
                .collect();
            return Some(alloc(tree, file, node, NodeKind::Assignment, children));
        }
        "call" => {
            let callee = node.child_by_field_name("function")?;
            let mut children = Vec::new();
            children.extend(convert(tree, file, src, callee));
            if let Some(args) = node.child_by_field_name("arguments") {
                children.extend(named_children(tree, file, src, args));
            }
            return Some(alloc(tree, file, node, NodeKind::Call, children));
        }
        "attribute" => {
            let base = node.child_by_field_name("object")?;
            let member = node
                .child_by_field_name("attribute")
                .and_then(|m| m.utf8_text(src.as_bytes()).ok())
                .unwrap_or_default()
                .to_string();
            let children: Vec<NodeId> = convert(tree, file, src, base).into_iter().collect();
            return Some(alloc(tree, file, node, NodeKind::Attribute { member }, children));
        }
        "identifier" => NodeKind::Identifier {
            name: node_text(src, node).to_string(),
        },
        "integer" | "float" | "string" | "concatenated_string" | "true" | "false" | "none" => {
            // Literals are leaves; string interpolation internals are not
            // walked, the lexeme is the value.
            let value = node_text(src, node).to_string();
            return Some(alloc(tree, file, node, NodeKind::Literal { value }, Vec::new()));
        }
        "tuple" | "expression_list" | "pattern_list" => NodeKind::Tuple,
        "list" => NodeKind::ListLiteral,
        "decorator" => NodeKind::Decorator,
        other => NodeKind::Other {
            kind: other.to_string(),
        },
    };

    let children = named_children(tree, file, src, node);
    Some(alloc(tree, file, node, kind, children))
}

fn convert_decorated(
    tree: &mut SourceTree,
    file: FileId,
    src: &str,
    node: tree_sitter::Node,
) -> Option<NodeId> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(id) = convert(tree, file, src, child) {
                decorators.push(id);
            }
        }
    }
    let definition = node.child_by_field_name("definition")?;
    if definition.kind() == "function_definition" {
        Some(convert_function(
            tree,
            file,
            src,
            definition,
            node.byte_range(),
            decorators,
        ))
    } else {
        // Decorated class or similar: generic passthrough.
        let children = named_children(tree, file, src, node);
        Some(alloc(
            tree,
            file,
            node,
            NodeKind::Other {
                kind: node.kind().to_string(),
            },
            children,
        ))
    }
}

fn convert_function(
    tree: &mut SourceTree,
    file: FileId,
    src: &str,
    node: tree_sitter::Node,
    outer_span: std::ops::Range<usize>,
    decorators: Vec<NodeId>,
) -> NodeId {
    let name_node = node.child_by_field_name("name");
    let name = name_node
        .map(|n| node_text(src, n).to_string())
        .unwrap_or_default();
    let name_span = name_node
        .map(|n| n.byte_range())
        .unwrap_or(node.start_byte()..node.start_byte());

    let mut children = Vec::new();
    if let Some(params) = node.child_by_field_name("parameters") {
        let param_children = named_children(tree, file, src, params);
        children.push(alloc(tree, file, params, NodeKind::Parameters, param_children));
    }
    if let Some(body) = node.child_by_field_name("body") {
        children.extend(named_children(tree, file, src, body));
    }

    let id = tree.alloc(Node {
        kind: NodeKind::FunctionDef { name },
        children,
        line: node.start_position().row + 1,
        span: outer_span,
        file,
        synthetic: false,
    });
    tree.set_fn_meta(
        id,
        FnMeta {
            name_span,
            def_start: node.start_byte(),
            decorators,
        },
    );
    id
}

fn named_children(
    tree: &mut SourceTree,
    file: FileId,
    src: &str,
    node: tree_sitter::Node,
) -> Vec<NodeId> {
    let mut cursor = node.walk();
    let children: Vec<tree_sitter::Node> = node.named_children(&mut cursor).collect();
    children
        .into_iter()
        .filter_map(|c| convert(tree, file, src, c))
        .collect()
}

fn alloc(
    tree: &mut SourceTree,
    file: FileId,
    node: tree_sitter::Node,
    kind: NodeKind,
    children: Vec<NodeId>,
) -> NodeId {
    tree.alloc(Node {
        kind,
        children,
        line: node.start_position().row + 1,
        span: node.byte_range(),
        file,
        synthetic: false,
    })
}

fn node_text<'a>(src: &'a str, node: tree_sitter::Node) -> &'a str {
    &src[node.byte_range()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (SourceTree, FileId) {
        let mut tree = SourceTree::new();
        let file = parse_source(&mut tree, "test_mod.py".into(), src).unwrap();
        (tree, file)
    }

    #[test]
    fn function_with_decorator_keeps_decorator_out_of_children() {
        let src = "@pytest.fixture\ndef setup():\n    return 1\n";
        let (tree, file) = parse(src);
        let funcs = tree.functions_in(file);
        assert_eq!(funcs.len(), 1);
        let meta = tree.fn_meta(funcs[0]).unwrap();
        assert_eq!(meta.decorators.len(), 1);
        assert!(matches!(tree.kind(meta.decorators[0]), NodeKind::Decorator));
        // children: parameters + one return statement
        assert_eq!(tree.children(funcs[0]).len(), 2);
        assert!(matches!(
            tree.kind(tree.children(funcs[0])[0]),
            NodeKind::Parameters
        ));
        // span covers the decorator so detaching removes it too
        assert_eq!(tree.node(funcs[0]).span.start, 0);
    }

    #[test]
    fn attribute_member_is_not_an_identifier_child() {
        let src = "def f():\n    calculator.precision = 4\n";
        let (tree, file) = parse(src);
        let func = tree.functions_in(file)[0];
        // children[1] is the expression_statement wrapping the assignment
        let stmt = tree.children(func)[1];
        let assign = tree.children(stmt)[0];
        assert!(matches!(tree.kind(assign), NodeKind::Assignment));
        let target = tree.children(assign)[0];
        match tree.kind(target) {
            NodeKind::Attribute { member } => assert_eq!(member, "precision"),
            other => panic!("expected attribute, got {other:?}"),
        }
        // attribute has exactly one child: the base expression
        assert_eq!(tree.children(target).len(), 1);
    }

    #[test]
    fn tuple_assignment_maps_pattern_list_to_tuple() {
        let src = "def f():\n    a, b = 2, 3\n";
        let (tree, file) = parse(src);
        let func = tree.functions_in(file)[0];
        let stmt = tree.children(func)[1];
        let assign = tree.children(stmt)[0];
        let target = tree.children(assign)[0];
        let value = tree.children(assign)[1];
        assert!(matches!(tree.kind(target), NodeKind::Tuple));
        assert!(matches!(tree.kind(value), NodeKind::Tuple));
        assert_eq!(tree.children(target).len(), 2);
    }

    #[test]
    fn string_literal_is_a_leaf_with_lexeme_value() {
        let src = "def f():\n    x = 'deg'\n";
        let (tree, file) = parse(src);
        let func = tree.functions_in(file)[0];
        let stmt = tree.children(func)[1];
        let assign = tree.children(stmt)[0];
        let value = tree.children(assign)[1];
        match tree.kind(value) {
            NodeKind::Literal { value } => assert_eq!(value, "'deg'"),
            other => panic!("expected literal, got {other:?}"),
        }
        assert!(tree.children(value).is_empty());
    }

    #[test]
    fn comments_are_skipped() {
        let with = "def f():\n    # setup\n    x = 1\n";
        let without = "def f():\n    x = 1\n";
        let (tree_a, file_a) = parse(with);
        let (tree_b, file_b) = parse(without);
        let fa = tree_a.functions_in(file_a)[0];
        let fb = tree_b.functions_in(file_b)[0];
        assert_eq!(tree_a.children(fa).len(), tree_b.children(fb).len());
    }

    #[test]
    fn invalid_python_is_a_parse_error() {
        let mut tree = SourceTree::new();
        assert!(parse_source(&mut tree, "bad.py".into(), "def f(:\n").is_err());
    }
}
