//! Node arena for parsed snippet bodies

use crate::interpolation::Interpolation;
use crate::transform::Transformation;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Index of a node inside a [`Body`] arena
pub type NodeId = usize;

/// Reserved placeholder number for `${VISUAL}`
pub const VISUAL: u32 = u32::MAX;

/// A rendered position, 0-based line and byte column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Where a body came from, used to report errors against the definition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    /// 1-based line of the first body line
    pub line: usize,
    /// Byte offset of the body inside the definition file
    pub offset: usize,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 1,
            offset: 0,
        }
    }
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, offset: usize) -> Self {
        Self {
            file: file.into(),
            line,
            offset,
        }
    }
}

/// One node of a snippet body
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte range inside the body source
    pub source: Span,
    /// Literal content: text for text nodes, the raw content for interpolations
    /// and the raw `${...}` source for placeholders
    pub literal: String,
    pub start: Pos,
    pub end: Pos,
    /// Whether the last render placed this node in the output
    pub placed: bool,
    /// Set once the user has typed over this placeholder
    pub edited: bool,
    /// Cached text from the current render
    pub resolved: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind, source: Span, literal: impl Into<String>) -> Self {
        Self {
            kind,
            source,
            literal: literal.into(),
            start: Pos::default(),
            end: Pos::default(),
            placed: false,
            edited: false,
            resolved: None,
        }
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        match &self.kind {
            NodeKind::Placeholder(p) => Some(p),
            _ => None,
        }
    }

    /// Clear everything a render writes
    pub fn reset(&mut self) {
        self.start = Pos::default();
        self.end = Pos::default();
        self.placed = false;
        self.resolved = None;
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Text,
    Interpolation(Interpolation),
    Placeholder(Placeholder),
}

/// A numbered tab-stop, a mirror of one, or a transformation of one
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub number: u32,
    pub default: Vec<NodeId>,
    pub transform: Option<Transformation>,
    /// Nesting depth, 0 for top-level placeholders
    pub depth: usize,
}

impl Placeholder {
    pub fn is_visual(&self) -> bool {
        self.number == VISUAL
    }
}

/// A parsed snippet body: the node arena plus the top-level sequence
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
}

impl Body {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Pre-order walk over every node reachable from the roots
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(p) = self.nodes[id].placeholder() {
                stack.extend(p.default.iter().rev().copied());
            }
        }
        order
    }

    /// Pre-order walk below a single node, excluding the node itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes[id].placeholder() {
            Some(p) => p.default.iter().rev().copied().collect(),
            None => Vec::new(),
        };
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(p) = self.nodes[id].placeholder() {
                stack.extend(p.default.iter().rev().copied());
            }
        }
        order
    }

    /// Reconstruct the literal text of the top-level sequence
    pub fn raw(&self) -> String {
        self.roots
            .iter()
            .map(|&id| self.nodes[id].literal.as_str())
            .collect()
    }
}
