/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template syntax tree.
//!
//! Nodes live in a [`NodeArena`] and refer to each other by [`NodeId`].
//! Parent links are plain indices and never own anything; they let a
//! subconstruct find the `if` block it belongs to. The tree is immutable once
//! parsed: everything that changes during a render (loop items, which branch
//! of an `if` already rendered) is kept in the
//! [`EvalContext`](crate::eval_context::EvalContext) instead.

use crate::source::Span;

/// Index of a node in its template's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Enclosing block or subconstruct; `None` for top-level nodes.
    pub parent: Option<NodeId>,
    /// Source range of the tag (or text run) that produced this node.
    /// Blocks span from their opening tag to the end of their closing tag.
    pub span: Span,
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Literal text to be output as-is.
    Text(String),

    /// `{%?name}` or `{%?item[key]}`
    Variable { reference: String },

    /// `{%!key}`. `raw` is the original tag text, echoed when the key has no
    /// localization entry.
    LocaleString { key: String, raw: String },

    /// `{%input name="x" ...}`
    InputField { args: Vec<String> },

    /// `{%if left op right}...{%/if}`
    ///
    /// When `has_subconstructs` is set, `children` holds only `ElseIf`/`Else`
    /// nodes: first an implicit `ElseIf` carrying this block's own condition,
    /// then one node per `{%elseif}`/`{%else}` in document order.
    If {
        args: Vec<String>,
        children: Vec<NodeId>,
        has_subconstructs: bool,
    },

    /// `{%elseif left op right}` inside an `if` block.
    ElseIf {
        args: Vec<String>,
        children: Vec<NodeId>,
    },

    /// `{%else}` inside an `if` block.
    Else { children: Vec<NodeId> },

    /// `{%foreach item in collection}...{%/foreach}`
    ForEach {
        args: Vec<String>,
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Child nodes in document order (empty for leaves).
    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeKind::If { children, .. }
            | NodeKind::ElseIf { children, .. }
            | NodeKind::Else { children }
            | NodeKind::ForEach { children, .. } => children,
            NodeKind::Text(_)
            | NodeKind::Variable { .. }
            | NodeKind::LocaleString { .. }
            | NodeKind::InputField { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::If { children, .. }
            | NodeKind::ElseIf { children, .. }
            | NodeKind::Else { children }
            | NodeKind::ForEach { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Construct name, as written in tags.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Text(_) => "text",
            NodeKind::Variable { .. } => "?",
            NodeKind::LocaleString { .. } => "!",
            NodeKind::InputField { .. } => "input",
            NodeKind::If { .. } => "if",
            NodeKind::ElseIf { .. } => "elseif",
            NodeKind::Else { .. } => "else",
            NodeKind::ForEach { .. } => "foreach",
        }
    }
}

/// Owner of every node of one template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, parent, span });
        id
    }

    /// Look up a node. Ids are only ever handed out by this arena, so an
    /// out-of-range id is a caller bug.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    /// Replace the children of a block or subconstruct, re-pointing each
    /// child's parent link at it.
    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for child in &children {
            self.get_mut(*child).parent = Some(id);
        }
        if let Some(slot) = self.get_mut(id).kind.children_mut() {
            *slot = children;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
