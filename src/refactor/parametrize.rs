//! Reading and writing `@pytest.mark.parametrize` annotations.
//!
//! The parser turns a function's decorator list into structured data: the
//! first parametrize decorator is consumed (argument names plus this
//! clone's value lists), `@pytest.fixture` sets the fixture flag, anything
//! else is logged and preserved verbatim. [`ParametrizeMetadata`] is the
//! merged, cross-clone structure the synthesizer builds and the renderer
//! turns back into a decorator; re-parsing a rendered decorator reproduces
//! the names and value lists exactly.

use crate::ast::{NodeId, NodeKind, SourceTree};
use crate::errors::RefactorError;
use log::warn;
use std::collections::HashMap;
use std::fmt;

/// A single argument value as it appears in an annotation or at a
/// divergence site. `Display` renders Python source text; literals keep
/// their original lexeme (including string quotes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Name(String),
    Literal(String),
    Expr(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Name(s) | ParamValue::Literal(s) | ParamValue::Expr(s) => f.write_str(s),
        }
    }
}

impl ParamValue {
    pub fn from_node(tree: &SourceTree, id: NodeId) -> ParamValue {
        match tree.kind(id) {
            NodeKind::Identifier { name } => ParamValue::Name(name.clone()),
            NodeKind::Literal { value } => ParamValue::Literal(value.clone()),
            _ => ParamValue::Expr(tree.text_of(id).to_string()),
        }
    }
}

/// Pre-existing parametrization parsed off one clone.
#[derive(Debug, Clone)]
pub struct ParsedParametrize {
    pub argnames: Vec<String>,
    pub values: HashMap<String, Vec<ParamValue>>,
    /// The decorator node, so the driver can delete its source lines on
    /// merge.
    pub decorator: NodeId,
}

/// Result of scanning a function's decorator list.
#[derive(Debug, Default)]
pub struct DecoratorScan {
    pub parametrize: Option<ParsedParametrize>,
    pub is_fixture: bool,
    pub unknown: bool,
}

/// Classify and parse the decorators of `function`. Stops consuming at the
/// first parametrize decorator; only one is supported per function.
pub fn scan_decorators(
    tree: &SourceTree,
    function: NodeId,
    funcname: &str,
) -> Result<DecoratorScan, RefactorError> {
    let mut scan = DecoratorScan::default();
    let decorators = match tree.fn_meta(function) {
        Some(meta) => meta.decorators.clone(),
        None => Vec::new(),
    };
    for decorator in decorators {
        if scan.parametrize.is_none() && is_parametrize(tree, decorator) {
            scan.parametrize = Some(parse_parametrize(tree, decorator, funcname)?);
        } else if is_fixture(tree, decorator) {
            scan.is_fixture = true;
        } else {
            warn!(
                "unknown decorator on `{}` (line {}): {}",
                funcname,
                tree.node(decorator).line,
                tree.text_of(decorator)
            );
            scan.unknown = true;
        }
    }
    Ok(scan)
}

/// `@pytest.mark.parametrize(...)`
fn is_parametrize(tree: &SourceTree, decorator: NodeId) -> bool {
    let Some(expr) = tree.children(decorator).first() else {
        return false;
    };
    if !matches!(tree.kind(*expr), NodeKind::Call) {
        return false;
    }
    let Some(callee) = tree.children(*expr).first() else {
        return false;
    };
    is_dotted(tree, *callee, &["pytest", "mark", "parametrize"])
}

/// `@pytest.fixture` or `@pytest.fixture(...)`
fn is_fixture(tree: &SourceTree, decorator: NodeId) -> bool {
    let Some(expr) = tree.children(decorator).first() else {
        return false;
    };
    let target = if matches!(tree.kind(*expr), NodeKind::Call) {
        match tree.children(*expr).first() {
            Some(callee) => *callee,
            None => return false,
        }
    } else {
        *expr
    };
    is_dotted(tree, target, &["pytest", "fixture"])
}

/// Match a chain of attribute accesses ending at `path` read left to right.
fn is_dotted(tree: &SourceTree, id: NodeId, path: &[&str]) -> bool {
    match (tree.kind(id), path.split_last()) {
        (NodeKind::Identifier { name }, Some((last, rest))) => rest.is_empty() && name == last,
        (NodeKind::Attribute { member }, Some((last, rest))) => {
            member == last
                && tree
                    .children(id)
                    .first()
                    .is_some_and(|base| is_dotted(tree, *base, rest))
        }
        _ => false,
    }
}

fn parse_parametrize(
    tree: &SourceTree,
    decorator: NodeId,
    funcname: &str,
) -> Result<ParsedParametrize, RefactorError> {
    let line = tree.node(decorator).line;
    let malformed = |detail: &str| RefactorError::MalformedParametrize {
        function: funcname.to_string(),
        line,
        detail: detail.to_string(),
    };

    let call = *tree.children(decorator).first().ok_or_else(|| malformed("empty decorator"))?;
    let args = &tree.children(call)[1..];
    let [names_arg, values_arg] = args else {
        return Err(malformed("expected exactly two arguments"));
    };

    let argnames: Vec<String> = match tree.kind(*names_arg) {
        NodeKind::Literal { value } => strip_quotes(value)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => return Err(malformed("argument names must be a string literal")),
    };
    if argnames.is_empty() {
        return Err(malformed("no argument names"));
    }

    // A name in value position means the values are not knowable at
    // transform time.
    if matches!(tree.kind(*values_arg), NodeKind::Identifier { .. }) {
        return Err(RefactorError::UnsupportedParametrizeForm {
            function: funcname.to_string(),
            line,
        });
    }
    if !matches!(tree.kind(*values_arg), NodeKind::ListLiteral | NodeKind::Tuple) {
        return Err(malformed("argument values must be a sequence"));
    }
    // An empty sequence would leave a value list empty after splicing and
    // silently drop the clone's call tuples.
    if tree.children(*values_arg).is_empty() {
        return Err(malformed("empty argument value sequence"));
    }

    let mut values: HashMap<String, Vec<ParamValue>> = HashMap::new();
    for element in tree.children(*values_arg) {
        match tree.kind(*element) {
            NodeKind::Tuple => {
                let elements = tree.children(*element);
                if elements.len() != argnames.len() {
                    return Err(malformed("tuple arity does not match argument names"));
                }
                for (name, value) in argnames.iter().zip(elements) {
                    values
                        .entry(name.clone())
                        .or_default()
                        .push(ParamValue::from_node(tree, *value));
                }
            }
            _ if argnames.len() == 1 => {
                values
                    .entry(argnames[0].clone())
                    .or_default()
                    .push(ParamValue::from_node(tree, *element));
            }
            _ => return Err(malformed("expected tuples for multiple argument names")),
        }
    }

    Ok(ParsedParametrize {
        argnames,
        values,
        decorator,
    })
}

fn strip_quotes(lexeme: &str) -> &str {
    let s = lexeme.trim();
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if s.len() >= 2 * quote.len() && s.starts_with(quote) && s.ends_with(quote) {
            return &s[quote.len()..s.len() - quote.len()];
        }
    }
    s
}

/// Merged parametrization across all clones of a class: ordered argument
/// names plus, per clone, each argument's value list.
#[derive(Debug, Clone)]
pub struct ParametrizeMetadata {
    argnames: Vec<String>,
    per_clone: Vec<HashMap<String, Vec<ParamValue>>>,
}

impl ParametrizeMetadata {
    pub fn new(n_clones: usize) -> Self {
        Self {
            argnames: Vec::new(),
            per_clone: vec![HashMap::new(); n_clones],
        }
    }

    pub fn argnames(&self) -> &[String] {
        &self.argnames
    }

    pub fn is_empty(&self) -> bool {
        self.argnames.is_empty()
    }

    /// Append an argument name; insertion order defines the positional
    /// correspondence with value tuples.
    pub fn add_argname(&mut self, name: &str) {
        if !self.argnames.iter().any(|n| n == name) {
            self.argnames.push(name.to_string());
        }
    }

    /// Reorder the argument names so the given ones come first, keeping
    /// relative order within both groups. New parameters trail
    /// pre-existing ones in the final annotation.
    pub fn order_front(&mut self, front: &[String]) {
        let mut ordered: Vec<String> = front
            .iter()
            .filter(|n| self.argnames.contains(n))
            .cloned()
            .collect();
        for name in &self.argnames {
            if !front.contains(name) {
                ordered.push(name.clone());
            }
        }
        self.argnames = ordered;
    }

    pub fn push_value(&mut self, clone: usize, argname: &str, value: ParamValue) {
        self.per_clone[clone]
            .entry(argname.to_string())
            .or_default()
            .push(value);
    }

    pub fn values_for(&self, clone: usize, argname: &str) -> &[ParamValue] {
        self.per_clone[clone]
            .get(argname)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace a `Name(referenced)` entry in one clone's value list with
    /// the given literal values. Returns false when no such entry exists.
    pub fn splice_name_reference(
        &mut self,
        clone: usize,
        argname: &str,
        referenced: &str,
        replacement: &[ParamValue],
    ) -> bool {
        let Some(list) = self.per_clone[clone].get_mut(argname) else {
            return false;
        };
        let Some(pos) = list
            .iter()
            .position(|v| matches!(v, ParamValue::Name(n) if n == referenced))
        else {
            return false;
        };
        list.splice(pos..=pos, replacement.iter().cloned());
        true
    }

    /// One value tuple per final parametrized call: the Cartesian product
    /// of each clone's own value lists (in argument-name order), clones
    /// concatenated positionally.
    pub fn rows(&self) -> Vec<Vec<ParamValue>> {
        let mut rows = Vec::new();
        for clone_values in &self.per_clone {
            let lists: Vec<&[ParamValue]> = self
                .argnames
                .iter()
                .map(|name| {
                    clone_values
                        .get(name)
                        .map(Vec::as_slice)
                        .unwrap_or(&[])
                })
                .collect();
            rows.extend(cartesian(&lists));
        }
        rows
    }

    /// Render the decorator line, without indentation or trailing newline.
    pub fn render(&self) -> String {
        let rows = self.rows();
        let rendered: Vec<String> = rows
            .iter()
            .map(|row| {
                if row.len() == 1 {
                    row[0].to_string()
                } else {
                    let inner: Vec<String> = row.iter().map(ToString::to_string).collect();
                    format!("({})", inner.join(", "))
                }
            })
            .collect();
        format!(
            "@pytest.mark.parametrize(\"{}\", [{}])",
            self.argnames.join(", "),
            rendered.join(", ")
        )
    }
}

fn cartesian(lists: &[&[ParamValue]]) -> Vec<Vec<ParamValue>> {
    let mut rows: Vec<Vec<ParamValue>> = vec![Vec::new()];
    for list in lists {
        if list.is_empty() {
            return Vec::new();
        }
        let mut next = Vec::with_capacity(rows.len() * list.len());
        for row in &rows {
            for value in *list {
                let mut extended = row.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        rows = next;
    }
    rows
}
