//! Construction parameters for a new node

use std::fmt;

use crate::codec::TreeDict;
use crate::tree::{NodeClass, NodeId, NodeKind, VnTree};
use crate::value::{DataMap, Value};

/// Computes a node's name once it is linked into its parent
pub type NameFn = Box<dyn FnOnce(&VnTree, NodeId) -> String>;

/// Everything needed to create one node (and, through a structural
/// dictionary, its whole subtree)
///
/// Applied in this order: the data payload is copied in, the node is linked
/// to its parent, the structural dictionary overwrites data and adds
/// children, remaining attributes are assigned, the name is set, and finally
/// the identity is resolved: an explicit identity wins, one already present
/// in the data is kept, otherwise a fresh one is generated.
#[derive(Default)]
pub struct NodeBuilder {
    pub(crate) name: Option<String>,
    pub(crate) name_fn: Option<NameFn>,
    pub(crate) data: Option<DataMap>,
    pub(crate) dict: Option<TreeDict>,
    pub(crate) identity: Option<String>,
    pub(crate) kind: NodeKind,
    pub(crate) attributes: DataMap,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder with a literal name
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name the node from its linked position, e.g. its coordinate
    ///
    /// Ignored when a literal name is also given.
    pub fn name_with<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&VnTree, NodeId) -> String + 'static,
    {
        self.name_fn = Some(Box::new(f));
        self
    }

    /// Initial payload, copied into the node
    pub fn data(mut self, data: DataMap) -> Self {
        self.data = Some(data);
        self
    }

    /// Insert one payload entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(DataMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn class(self, class: NodeClass) -> Self {
        self.kind(NodeKind::of_class(class))
    }

    /// Populate data and children from a structural dictionary
    pub fn dict(mut self, dict: TreeDict) -> Self {
        self.dict = Some(dict);
        self
    }

    /// A top-level attribute assignment, as found in markup and
    /// structural dictionaries
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build a new tree with this node as its root
    pub fn into_tree(self) -> VnTree {
        VnTree::from_builder(self)
    }
}

impl fmt::Debug for NodeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBuilder")
            .field("name", &self.name)
            .field("name_fn", &self.name_fn.as_ref().map(|_| ".."))
            .field("data", &self.data)
            .field("dict", &self.dict)
            .field("identity", &self.identity)
            .field("kind", &self.kind)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl From<&str> for NodeBuilder {
    fn from(name: &str) -> Self {
        NodeBuilder::named(name)
    }
}

impl From<String> for NodeBuilder {
    fn from(name: String) -> Self {
        NodeBuilder::named(name)
    }
}
