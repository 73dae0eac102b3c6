//! Arena-backed Python syntax model.
//!
//! Parsed files share a single arena so node ids stay valid for the whole
//! run: detaching a function in one clone class never invalidates ids still
//! held by another. Mutations go through [`SourceTree::replace_child`] and
//! [`SourceTree::remove_child`], which record the corresponding source edit
//! so the rewritten file can be produced from the original text.

pub mod parse;
pub mod rewrite;

use crate::errors::TreeError;
use rewrite::{Edit, EditSet};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub type Span = Range<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(u32);

/// Node kinds the refactoring engine distinguishes. Anything else rides
/// along as [`NodeKind::Other`] and only participates in congruence checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    FunctionDef { name: String },
    Parameters,
    Decorator,
    Assignment,
    Call,
    Attribute { member: String },
    Tuple,
    ListLiteral,
    Literal { value: String },
    Identifier { name: String },
    Other { kind: String },
}

impl NodeKind {
    /// Two kinds are congruent when they are the same variant, regardless
    /// of the carried value. Value disagreement is a divergence, not a
    /// structural mismatch.
    pub fn congruent(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Other { kind: a }, NodeKind::Other { kind: b }) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// Short label for diagnostics.
    pub fn label(&self) -> &str {
        match self {
            NodeKind::Module => "module",
            NodeKind::FunctionDef { .. } => "function",
            NodeKind::Parameters => "parameters",
            NodeKind::Decorator => "decorator",
            NodeKind::Assignment => "assignment",
            NodeKind::Call => "call",
            NodeKind::Attribute { .. } => "attribute",
            NodeKind::Tuple => "tuple",
            NodeKind::ListLiteral => "list",
            NodeKind::Literal { .. } => "literal",
            NodeKind::Identifier { .. } => "identifier",
            NodeKind::Other { kind } => kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    /// 1-based source line.
    pub line: usize,
    /// Byte range in the owning file. Synthetic nodes inherit the span of
    /// the node they replaced.
    pub span: Span,
    pub file: FileId,
    pub synthetic: bool,
}

/// Per-function spans the rewriter needs but the child list does not carry:
/// the name token, the insertion point for a new decorator (start of the
/// `def` line) and the decorator nodes, which are deliberately kept out of
/// the function's children so they are not walked by the differencer.
#[derive(Debug, Clone)]
pub struct FnMeta {
    pub name_span: Span,
    pub def_start: usize,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub root: Option<NodeId>,
    edits: EditSet,
}

#[derive(Debug, Default)]
pub struct SourceTree {
    nodes: Vec<Node>,
    files: Vec<SourceFile>,
    fn_meta: HashMap<NodeId, FnMeta>,
}

impl SourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_file(&mut self, path: PathBuf, text: String) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            path,
            text,
            root: None,
            edits: EditSet::default(),
        });
        id
    }

    pub(crate) fn set_root(&mut self, file: FileId, root: NodeId) {
        self.files[file.0 as usize].root = Some(root);
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub(crate) fn set_fn_meta(&mut self, id: NodeId, meta: FnMeta) {
        self.fn_meta.insert(id, meta);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        (0..self.files.len() as u32).map(FileId)
    }

    pub fn file_by_path(&self, path: &Path) -> Option<FileId> {
        (0..self.files.len() as u32)
            .map(FileId)
            .find(|id| self.file(*id).path == path)
    }

    pub fn fn_meta(&self, id: NodeId) -> Option<&FnMeta> {
        self.fn_meta.get(&id)
    }

    /// Original source text of a node. Synthetic nodes render from their
    /// kind instead of a span slice.
    pub fn text_of(&self, id: NodeId) -> &str {
        let node = self.node(id);
        if node.synthetic {
            match &node.kind {
                NodeKind::Identifier { name } => name,
                other => other.label(),
            }
        } else {
            &self.file(node.file).text[node.span.clone()]
        }
    }

    /// Collect every function definition in a file, outermost first.
    pub fn functions_in(&self, file: FileId) -> Vec<NodeId> {
        let mut found = Vec::new();
        if let Some(root) = self.file(file).root {
            self.collect_functions(root, &mut found);
        }
        found
    }

    fn collect_functions(&self, id: NodeId, found: &mut Vec<NodeId>) {
        if matches!(self.kind(id), NodeKind::FunctionDef { .. }) {
            found.push(id);
        }
        for child in self.children(id) {
            self.collect_functions(*child, found);
        }
    }

    /// Function definitions in a file paired with their enclosing scope
    /// node, outermost first.
    pub fn functions_with_parents(&self, file: FileId) -> Vec<(NodeId, NodeId)> {
        let mut found = Vec::new();
        if let Some(root) = self.file(file).root {
            self.collect_functions_with_parents(root, &mut found);
        }
        found
    }

    fn collect_functions_with_parents(&self, parent: NodeId, found: &mut Vec<(NodeId, NodeId)>) {
        for child in self.children(parent) {
            if matches!(self.kind(*child), NodeKind::FunctionDef { .. }) {
                found.push((*child, parent));
            }
            self.collect_functions_with_parents(*child, found);
        }
    }

    /// Allocate a synthetic identifier that will take over `replacing`'s
    /// position and span.
    pub fn new_identifier(&mut self, name: &str, replacing: NodeId) -> NodeId {
        let donor = self.node(replacing);
        let node = Node {
            kind: NodeKind::Identifier {
                name: name.to_string(),
            },
            children: Vec::new(),
            line: donor.line,
            span: donor.span.clone(),
            file: donor.file,
            synthetic: true,
        };
        self.alloc(node)
    }

    /// Swap `old` for `new` in `parent`'s child list and record the source
    /// edit substituting the new node's rendering at the old node's span.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), TreeError> {
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|c| *c == old)
            .ok_or(TreeError::ReplaceTargetNotFound)?;
        let span = self.node(old).span.clone();
        let file = self.node(old).file;
        let text = self.text_of(new).to_string();
        self.nodes[parent.0 as usize].children[pos] = new;
        self.files[file.0 as usize].edits.push(Edit { span, text });
        Ok(())
    }

    /// Detach `child` from `parent` and record a deletion edit covering the
    /// child's full source lines (including any trailing blank lines, so a
    /// removed function does not leave a hole).
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(TreeError::DetachTargetNotFound)?;
        self.nodes[parent.0 as usize].children.remove(pos);
        let file = self.node(child).file;
        let span = self.line_extent(file, self.node(child).span.clone());
        self.files[file.0 as usize].edits.push(Edit {
            span,
            text: String::new(),
        });
        Ok(())
    }

    /// Record a free-form edit, used by the driver for renames, parameter
    /// list rewrites and decorator attachment.
    pub fn record_edit(&mut self, file: FileId, span: Span, text: String) {
        self.files[file.0 as usize].edits.push(Edit { span, text });
    }

    /// Widen a span to whole lines and swallow blank lines that follow.
    pub fn line_extent(&self, file: FileId, span: Span) -> Span {
        let text = &self.file(file).text;
        let start = text[..span.start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let mut end = match text[span.end..].find('\n') {
            Some(i) => span.end + i + 1,
            None => text.len(),
        };
        while let Some(rest) = text.get(end..) {
            match rest.find('\n') {
                Some(i) if rest[..i].trim().is_empty() => end += i + 1,
                _ => break,
            }
        }
        start..end
    }

    /// Whether any edit has been recorded against the file.
    pub fn is_modified(&self, file: FileId) -> bool {
        !self.file(file).edits.is_empty()
    }

    /// Apply the recorded edits to the original text.
    pub fn rendered(&self, file: FileId) -> Result<String, TreeError> {
        let f = self.file(file);
        f.edits.apply(&f.text)
    }
}
