//! Named accessors over a node's data map
//!
//! A [`NodeAttr`] binds a key (optionally inside a namespace sub-map) to
//! get/set/delete operations on one node's data. A [`TreeAttr`] resolves the
//! same key on the current root of the node's tree, so a value stored once
//! is visible from every node.
//!
//! ```
//! use vntree::attr::{Attribute, NodeAttr, TreeAttr};
//! use vntree::{Tree, Value, VnTree};
//!
//! const COLOUR: NodeAttr = NodeAttr::new("colour");
//! const OWNER: TreeAttr = TreeAttr::namespaced("meta", "owner");
//!
//! let mut tree = VnTree::new("root");
//! let root = tree.root();
//! let child = tree.add(root, "child").unwrap();
//! OWNER.set(&mut tree, root, Value::from("ops")).unwrap();
//! COLOUR.set(&mut tree, child, Value::from("red")).unwrap();
//!
//! assert_eq!(OWNER.get(&tree, child).as_str(), Some("ops"));
//! assert!(COLOUR.get(&tree, root).is_null());
//! ```

use log::warn;

use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree, VnTree};
use crate::value::{DataMap, Value};

/// Namespace inside `data` holding tree bookkeeping
pub const META_NS: &str = "_vntree";

/// The node's name
pub const NAME: NodeAttr = NodeAttr::namespaced(META_NS, "name");

/// The node's process-unique identity
pub const IDENTITY: NodeAttr = NodeAttr::namespaced(META_NS, "_id");

/// File path of the last container save or open, stored on the root
pub const FILE_PATH: TreeAttr = TreeAttr::namespaced(META_NS, "_vntree_fpath");

/// Key/value table used by the last table save, stored on the root
pub const TABLE_NAME: TreeAttr = TreeAttr::namespaced(META_NS, "tablename");

/// Read/write access to one named attribute of a node
pub trait Attribute {
    /// The attribute's value, or its default when absent
    fn get<'t>(&'t self, tree: &'t VnTree, id: NodeId) -> &'t Value;

    /// Store a value, creating the namespace sub-map if needed
    fn set(&self, tree: &mut VnTree, id: NodeId, value: Value) -> Result<()>;

    /// Remove the value; deleting an absent key is a no-op
    fn delete(&self, tree: &mut VnTree, id: NodeId) -> Result<Option<Value>>;
}

/// An attribute stored in the node's own data map
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttr {
    name: &'static str,
    namespace: Option<&'static str>,
    default: Value,
}

impl NodeAttr {
    /// A top-level key of `data`
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            namespace: None,
            default: Value::Null,
        }
    }

    /// A key of the `data[namespace]` sub-map
    pub const fn namespaced(namespace: &'static str, name: &'static str) -> Self {
        Self {
            name,
            namespace: Some(namespace),
            default: Value::Null,
        }
    }

    /// Value reported when the key is absent
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn namespace(&self) -> Option<&'static str> {
        self.namespace
    }

    /// Look the key up in a data map
    ///
    /// When the namespace is present as a map the key is read from it;
    /// otherwise the top level of `data` is consulted.
    pub fn lookup<'a>(&self, data: &'a DataMap) -> Option<&'a Value> {
        match self.namespace.and_then(|ns| data.get(ns)).and_then(Value::as_map) {
            Some(ns_map) => ns_map.get(self.name),
            None => data.get(self.name),
        }
    }

    /// Like [`lookup`](Self::lookup), falling back to the default
    pub fn read<'a>(&'a self, data: &'a DataMap) -> &'a Value {
        self.lookup(data).unwrap_or(&self.default)
    }

    /// Store into a data map
    pub fn write(&self, data: &mut DataMap, value: Value) {
        match self.namespace {
            Some(ns) => {
                let slot = data
                    .entry(ns.to_string())
                    .or_insert_with(|| Value::Map(DataMap::new()));
                if !matches!(slot, Value::Map(_)) {
                    warn!("namespace «{ns}» held a non-map value; replacing it");
                    *slot = Value::Map(DataMap::new());
                }
                if let Value::Map(ns_map) = slot {
                    ns_map.insert(self.name.to_string(), value);
                }
            }
            None => {
                data.insert(self.name.to_string(), value);
            }
        }
    }

    /// Remove from a data map
    pub fn erase(&self, data: &mut DataMap) -> Option<Value> {
        let namespaced = self
            .namespace
            .and_then(|ns| data.get_mut(ns))
            .and_then(Value::as_map_mut);
        match namespaced {
            Some(ns_map) => ns_map.shift_remove(self.name),
            None => data.shift_remove(self.name),
        }
    }
}

impl Attribute for NodeAttr {
    fn get<'t>(&'t self, tree: &'t VnTree, id: NodeId) -> &'t Value {
        match tree.data(id) {
            Some(data) => self.read(data),
            None => &self.default,
        }
    }

    fn set(&self, tree: &mut VnTree, id: NodeId, value: Value) -> Result<()> {
        let data = tree.data_mut(id).ok_or(Error::UnknownNode(id))?;
        self.write(data, value);
        Ok(())
    }

    fn delete(&self, tree: &mut VnTree, id: NodeId) -> Result<Option<Value>> {
        let data = tree.data_mut(id).ok_or(Error::UnknownNode(id))?;
        Ok(self.erase(data))
    }
}

/// An attribute always stored on, and read from, the tree's current root
#[derive(Debug, Clone, PartialEq)]
pub struct TreeAttr(NodeAttr);

impl TreeAttr {
    pub const fn new(name: &'static str) -> Self {
        Self(NodeAttr::new(name))
    }

    pub const fn namespaced(namespace: &'static str, name: &'static str) -> Self {
        Self(NodeAttr::namespaced(namespace, name))
    }

    pub fn with_default(self, default: impl Into<Value>) -> Self {
        Self(self.0.with_default(default))
    }

    /// The accessor applied at the root
    pub fn local(&self) -> &NodeAttr {
        &self.0
    }
}

impl Attribute for TreeAttr {
    fn get<'t>(&'t self, tree: &'t VnTree, id: NodeId) -> &'t Value {
        if tree.get(id).is_none() {
            return &self.0.default;
        }
        self.0.get(tree, tree.root_of(id))
    }

    fn set(&self, tree: &mut VnTree, id: NodeId, value: Value) -> Result<()> {
        if tree.get(id).is_none() {
            return Err(Error::UnknownNode(id));
        }
        let root = tree.root_of(id);
        if root != id {
            warn!(
                "tree attribute «{}» set through non-root node «{}»; stored on the root",
                self.0.name,
                tree.name(id)
            );
        }
        self.0.set(tree, root, value)
    }

    fn delete(&self, tree: &mut VnTree, id: NodeId) -> Result<Option<Value>> {
        if tree.get(id).is_none() {
            return Err(Error::UnknownNode(id));
        }
        let root = tree.root_of(id);
        self.0.delete(tree, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: NodeAttr = NodeAttr::new("plain");
    const SPACED: NodeAttr = NodeAttr::namespaced("ns", "spaced");

    #[test]
    fn test_lookup_top_level() {
        let mut data = DataMap::new();
        assert_eq!(PLAIN.lookup(&data), None);
        PLAIN.write(&mut data, Value::Int(1));
        assert_eq!(PLAIN.lookup(&data), Some(&Value::Int(1)));
    }

    #[test]
    fn test_namespace_created_on_write() {
        let mut data = DataMap::new();
        SPACED.write(&mut data, Value::from("x"));
        let ns = data.get("ns").and_then(Value::as_map).unwrap();
        assert_eq!(ns.get("spaced"), Some(&Value::from("x")));
    }

    #[test]
    fn test_missing_namespace_falls_back_to_top_level() {
        let mut data = DataMap::new();
        data.insert("spaced".into(), Value::from("top"));
        assert_eq!(SPACED.lookup(&data), Some(&Value::from("top")));

        // Once the namespace exists it is authoritative
        let mut ns = DataMap::new();
        ns.insert("other".into(), Value::Null);
        data.insert("ns".into(), Value::Map(ns));
        assert_eq!(SPACED.lookup(&data), None);
    }

    #[test]
    fn test_shared_namespace() {
        const A: NodeAttr = NodeAttr::namespaced("ns", "a");
        const B: NodeAttr = NodeAttr::namespaced("ns", "b");
        let mut data = DataMap::new();
        A.write(&mut data, Value::Int(1));
        B.write(&mut data, Value::Int(2));
        assert_eq!(A.read(&data), &Value::Int(1));
        assert_eq!(B.read(&data), &Value::Int(2));
    }

    #[test]
    fn test_erase_absent_is_noop() {
        let mut data = DataMap::new();
        assert_eq!(SPACED.erase(&mut data), None);
        SPACED.write(&mut data, Value::Bool(true));
        assert_eq!(SPACED.erase(&mut data), Some(Value::Bool(true)));
        assert_eq!(SPACED.erase(&mut data), None);
    }

    #[test]
    fn test_default() {
        let attr = NodeAttr::new("missing").with_default("fallback");
        assert_eq!(attr.read(&DataMap::new()), &Value::from("fallback"));
    }

    #[test]
    fn test_tree_attr_resolves_at_root() {
        const SHARED: TreeAttr = TreeAttr::new("shared");
        let mut tree = VnTree::new("root");
        let child = tree.add(tree.root(), "child").unwrap();
        let grandchild = tree.add(child, "grandchild").unwrap();

        SHARED.set(&mut tree, grandchild, Value::Int(9)).unwrap();
        assert_eq!(SHARED.get(&tree, tree.root()), &Value::Int(9));
        assert_eq!(SHARED.get(&tree, child), &Value::Int(9));
        assert_eq!(PLAIN.get(&tree, grandchild), &Value::Null);
        assert!(tree.data(grandchild).unwrap().get("shared").is_none());

        assert_eq!(SHARED.delete(&mut tree, child).unwrap(), Some(Value::Int(9)));
        assert!(SHARED.get(&tree, child).is_null());
    }

    #[test]
    fn test_tree_attr_follows_regraft() {
        const SHARED: TreeAttr = TreeAttr::new("shared");
        let mut first = VnTree::new("first");
        let first_root = first.root();
        SHARED.set(&mut first, first_root, Value::from("one")).unwrap();
        let mut second = VnTree::new("second");
        let second_root = second.root();
        SHARED.set(&mut second, second_root, Value::from("two")).unwrap();

        let moved = first.add(first.root(), "moved").unwrap();
        assert_eq!(SHARED.get(&first, moved).as_str(), Some("one"));

        let subtree = first.detach(moved).unwrap();
        let grafted = second
            .add_child(second.root(), subtree, None, false)
            .unwrap();
        assert_eq!(SHARED.get(&second, grafted).as_str(), Some("two"));
    }

    #[test]
    fn test_unknown_node() {
        let mut tree = VnTree::new("root");
        let bogus = NodeId(42);
        assert!(PLAIN.get(&tree, bogus).is_null());
        assert_eq!(
            PLAIN.set(&mut tree, bogus, Value::Null),
            Err(Error::UnknownNode(bogus))
        );
    }
}
