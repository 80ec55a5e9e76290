//! Core node types for the tree arena

use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

use crate::embed::{EmbedState, TraversalFilter};
use crate::value::DataMap;

/// Handle of a node within one [`VnTree`](crate::VnTree)
///
/// Internally represented as an index into the arena. Handles are only
/// meaningful for the tree that issued them; a detached or grafted subtree
/// gets fresh handles in its new tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new NodeId from a usize
    pub const fn new(id: usize) -> Self {
        NodeId(id)
    }

    /// Get the inner usize value
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(id: usize) -> Self {
        NodeId(id)
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// The class of a node, independent of its per-node state
///
/// Nodes created from a structural dictionary take the class of the node
/// that constructs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// An ordinary node
    Plain,
    /// A node hosting an embedded sub-tree in its first child slot
    Embed,
}

/// The kind of a node, carrying any state its class needs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    Plain,
    Embed(EmbedState),
}

impl NodeKind {
    /// A fresh kind of the given class
    pub fn of_class(class: NodeClass) -> Self {
        match class {
            NodeClass::Plain => NodeKind::Plain,
            NodeClass::Embed => NodeKind::Embed(EmbedState::default()),
        }
    }

    pub fn class(&self) -> NodeClass {
        match self {
            NodeKind::Plain => NodeClass::Plain,
            NodeKind::Embed(_) => NodeClass::Embed,
        }
    }

    pub fn is_embed(&self) -> bool {
        matches!(self, NodeKind::Embed(_))
    }

    pub fn embed_state(&self) -> Option<&EmbedState> {
        match self {
            NodeKind::Embed(state) => Some(state),
            NodeKind::Plain => None,
        }
    }

    pub(crate) fn embed_state_mut(&mut self) -> Option<&mut EmbedState> {
        match self {
            NodeKind::Embed(state) => Some(state),
            NodeKind::Plain => None,
        }
    }
}

impl TraversalFilter for NodeKind {
    fn hides(&self, child: NodeId) -> bool {
        match self {
            NodeKind::Plain => false,
            NodeKind::Embed(state) => state.hides(child),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Plain => write!(f, "Node"),
            NodeKind::Embed(_) => write!(f, "EmbedNode"),
        }
    }
}

/// A single node in the tree arena
///
/// The node owns its payload and the ordered list of its children's handles;
/// `parent` is a plain back-reference. Structure is only changed through
/// [`VnTree`](crate::VnTree) so the linkage invariants hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) data: DataMap,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, data: DataMap) -> Self {
        Self {
            kind,
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The node's payload, including the reserved `_vntree` namespace
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    /// The parent handle, `None` for a root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// All children in list order, hidden ones included
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Rewrite every handle this node holds through `map`
    pub(crate) fn remap(&mut self, map: impl Fn(NodeId) -> Option<NodeId>) {
        self.parent = self.parent.and_then(&map);
        self.children = self.children.iter().filter_map(|&c| map(c)).collect();
        if let Some(state) = self.kind.embed_state_mut() {
            state.host = state.host.and_then(&map);
        }
    }
}

/// Child indices from the root (or another starting node) down to a node
///
/// The root's coordinate is empty. Displays like a tuple: `()`, `(1,)`,
/// `(2, 0, 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Coordinate(SmallVec<[usize; 8]>);

impl Coordinate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub(crate) fn reverse(&mut self) {
        self.0.reverse();
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for Coordinate {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Coordinate {
    fn from(v: Vec<usize>) -> Self {
        Coordinate(SmallVec::from_vec(v))
    }
}

impl From<&[usize]> for Coordinate {
    fn from(v: &[usize]) -> Self {
        Coordinate(SmallVec::from_slice(v))
    }
}

impl FromIterator<usize> for Coordinate {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Coordinate(iter.into_iter().collect())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{index}")?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}
