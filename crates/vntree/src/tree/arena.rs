//! The tree arena: construction, linkage and subtree transfer

use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::attr::{IDENTITY, META_NS, NAME};
use crate::codec::dict::apply_attributes;
use crate::error::{Error, Result};
use crate::tree::address::ChildSelector;
use crate::tree::{Node, NodeBuilder, NodeId, NodeKind, TraversalOrder, Tree, TreeTraversal};
use crate::value::{DataMap, Value};

/// Generate a fresh process-unique node identity
pub fn new_identity() -> String {
    Uuid::new_v4().simple().to_string()
}

/// An ordered tree of nodes stored in an arena
///
/// Exactly one node, the root, has no parent. Cloning a `VnTree` copies the
/// whole arena, producing an independent tree with the same identities and
/// handles; use [`clone_subtree`](Self::clone_subtree) for a compact copy of
/// part of a tree or to renew identities.
///
/// Slots emptied by [`detach`](Self::detach) are handed out again to nodes
/// created or grafted later, so a handle to a detached node must not be used
/// once the tree has grown again.
#[derive(Debug, Clone)]
pub struct VnTree {
    slots: Vec<Option<Node>>,
    vacant: Vec<usize>,
    root: NodeId,
    live: usize,
}

impl Tree for VnTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.get()).and_then(Option::as_ref)
    }

    fn node_count(&self) -> usize {
        self.live
    }
}

impl VnTree {
    /// A tree holding a single named root
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_builder(NodeBuilder::named(name))
    }

    /// A tree whose root is built from `builder`
    pub fn from_builder(builder: NodeBuilder) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            root: NodeId(0),
            live: 0,
        };
        tree.root = tree.materialize(None, None, builder);
        tree
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.get()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(Node::kind)
    }

    pub fn data(&self, id: NodeId) -> Option<&DataMap> {
        self.get(id).map(Node::data)
    }

    pub fn data_mut(&mut self, id: NodeId) -> Option<&mut DataMap> {
        self.node_mut(id).map(|node| &mut node.data)
    }

    /// The node's name; empty when unset
    pub fn name(&self, id: NodeId) -> &str {
        self.data(id)
            .and_then(|data| NAME.lookup(data))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        let data = self.data_mut(id).ok_or(Error::UnknownNode(id))?;
        NAME.write(data, Value::String(name.into()));
        Ok(())
    }

    /// The node's identity, if one is stored
    pub fn identity(&self, id: NodeId) -> Option<&str> {
        self.data(id)
            .and_then(|data| IDENTITY.lookup(data))
            .and_then(Value::as_str)
    }

    pub fn set_identity(&mut self, id: NodeId, identity: impl Into<String>) -> Result<()> {
        let data = self.data_mut(id).ok_or(Error::UnknownNode(id))?;
        IDENTITY.write(data, Value::String(identity.into()));
        Ok(())
    }

    /// Identities of every node, hidden ones included, in forward order
    pub fn identities(&self) -> Vec<String> {
        self.walk_all(self.root, TraversalOrder::Forward)
            .filter_map(|id| self.identity(id).map(str::to_string))
            .collect()
    }

    /// Give every node of the tree a freshly generated identity
    pub fn renew_identities(&mut self) {
        let ids: Vec<NodeId> = self.walk_all(self.root, TraversalOrder::Forward).collect();
        for id in ids {
            if let Some(data) = self.data_mut(id) {
                IDENTITY.write(data, Value::String(new_identity()));
            }
        }
    }

    /// Append a new node built from `builder` under `parent`
    pub fn insert(&mut self, parent: NodeId, builder: impl Into<NodeBuilder>) -> Result<NodeId> {
        self.check_slot(parent, None)?;
        Ok(self.materialize(Some(parent), None, builder.into()))
    }

    /// Insert a new node built from `builder` at `index` of `parent`'s children
    pub fn insert_at(
        &mut self,
        parent: NodeId,
        index: usize,
        builder: impl Into<NodeBuilder>,
    ) -> Result<NodeId> {
        self.check_slot(parent, Some(index))?;
        Ok(self.materialize(Some(parent), Some(index), builder.into()))
    }

    /// Append a new node with just a name
    pub fn add(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId> {
        self.insert(parent, NodeBuilder::named(name))
    }

    /// Graft a whole tree under `parent`, returning the handle of its root
    ///
    /// With `check_identity`, an incoming tree that shares any identity with
    /// this tree gets fresh identities on every node before it is attached.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        subtree: VnTree,
        index: Option<usize>,
        check_identity: bool,
    ) -> Result<NodeId> {
        self.check_slot(parent, index)?;
        let mut subtree = subtree;
        if check_identity {
            let existing: HashSet<String> = self.identities().into_iter().collect();
            let collides = subtree
                .identities()
                .iter()
                .any(|identity| existing.contains(identity));
            if collides {
                warn!(
                    "grafting «{}» under «{}»: identity collision, attaching a copy with new identities",
                    subtree.name(subtree.root),
                    self.name(parent)
                );
                subtree.renew_identities();
            }
        }
        let top = self.absorb(subtree);
        self.link(parent, top, index);
        Ok(top)
    }

    /// Remove the first child matching `selector` and return it as its own tree
    ///
    /// The removed node no longer has a parent. Returns `None` when nothing
    /// matches.
    pub fn remove_child(&mut self, parent: NodeId, selector: ChildSelector<'_>) -> Option<VnTree> {
        let children = self.children(parent);
        let found = match selector {
            ChildSelector::Index(index) => children.get(index).copied(),
            ChildSelector::Name(name) => children.iter().copied().find(|&c| self.name(c) == name),
            ChildSelector::Node(node) => children.iter().copied().find(|&c| c == node),
        };
        match found {
            Some(child) => self.detach(child),
            None => {
                debug!(
                    "remove_child: «{}» has no child matching {selector:?}",
                    self.name(parent)
                );
                None
            }
        }
    }

    /// Cut a node and its subtree out of this tree
    ///
    /// The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) -> Option<VnTree> {
        let parent = self.parent(id)?;
        self.unlink(parent, id);
        let order: Vec<NodeId> = self.walk_all(id, TraversalOrder::Forward).collect();
        let mut nodes = Vec::with_capacity(order.len());
        for old in order {
            if let Some(node) = self.slots.get_mut(old.get()).and_then(Option::take) {
                nodes.push((old, node));
                self.vacant.push(old.get());
            }
        }
        self.live -= nodes.len();
        Some(Self::assemble(nodes))
    }

    /// Re-parent a node within this tree
    ///
    /// The node leaves its old parent's child list before joining the new
    /// one, so `index` refers to the new parent's list after that removal.
    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId, index: Option<usize>) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::UnknownNode(id));
        }
        if !self.contains(new_parent) {
            return Err(Error::InvalidParent(new_parent.to_string()));
        }
        if id == new_parent || self.is_ancestor_of(id, new_parent) {
            return Err(Error::WouldCycle(id));
        }
        // Only the root lacks a parent, and the root is an ancestor of everything
        let Some(old_parent) = self.parent(id) else {
            return Err(Error::WouldCycle(id));
        };
        let old_position = self.unlink(old_parent, id);
        if let Err(err) = self.check_slot(new_parent, index) {
            self.link(old_parent, id, old_position);
            return Err(err);
        }
        self.link(new_parent, id, index);
        Ok(())
    }

    /// Deep-copy the subtree under `id` into an independent tree
    ///
    /// With `change_identity` every node of the copy gets a fresh identity.
    pub fn clone_subtree(&self, id: NodeId, change_identity: bool) -> Option<VnTree> {
        self.get(id)?;
        let nodes: Vec<(NodeId, Node)> = self
            .walk_all(id, TraversalOrder::Forward)
            .filter_map(|old| self.get(old).map(|node| (old, node.clone())))
            .collect();
        let mut copy = Self::assemble(nodes);
        if change_identity {
            copy.renew_identities();
        }
        Some(copy)
    }

    /// Deep-copy the whole tree
    pub fn clone_tree(&self, change_identity: bool) -> VnTree {
        let mut copy = self.clone();
        if change_identity {
            copy.renew_identities();
        }
        copy
    }

    /// Validate that a child could be linked under `parent` at `index`
    fn check_slot(&self, parent: NodeId, index: Option<usize>) -> Result<()> {
        let node = self
            .get(parent)
            .ok_or_else(|| Error::InvalidParent(parent.to_string()))?;
        match index {
            Some(index) if index > node.children.len() => Err(Error::IndexOutOfRange {
                index,
                len: node.children.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Link `child` into `parent`'s list; the slot must have been checked
    fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(node) = self.node_mut(parent) {
            let position = index.unwrap_or(node.children.len()).min(node.children.len());
            node.children.insert(position, child);
            if let Some(state) = node.kind.embed_state_mut() {
                state.offer_child(position, child);
            }
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Remove `child` from `parent`'s list, returning its former position
    fn unlink(&mut self, parent: NodeId, child: NodeId) -> Option<usize> {
        let node = self.node_mut(parent)?;
        let position = node.children.iter().position(|&c| c == child)?;
        node.children.remove(position);
        if let Some(state) = node.kind.embed_state_mut() {
            state.release(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
        Some(position)
    }

    /// Move every node of `other` into this arena, returning its root's new handle
    fn absorb(&mut self, mut other: VnTree) -> NodeId {
        let top = self.reserve();
        let mut map = HashMap::from([(other.root, top)]);
        for old in other.walk_all(other.root, TraversalOrder::Forward) {
            if old != other.root {
                map.insert(old, self.reserve());
            }
        }
        for (&old, &new) in &map {
            match other.slots.get_mut(old.get()).and_then(Option::take) {
                Some(mut node) => {
                    node.remap(|handle| map.get(&handle).copied());
                    self.place(new, node);
                }
                None => self.vacant.push(new.get()),
            }
        }
        top
    }

    /// An empty slot for a new node, reusing a vacant one when possible
    fn reserve(&mut self) -> NodeId {
        match self.vacant.pop() {
            Some(index) => NodeId(index),
            None => {
                self.slots.push(None);
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn place(&mut self, id: NodeId, node: Node) {
        if let Some(slot) = self.slots.get_mut(id.get()) {
            *slot = Some(node);
            self.live += 1;
        }
    }

    /// Build a compact tree from nodes listed in forward order, top first
    fn assemble(nodes: Vec<(NodeId, Node)>) -> VnTree {
        let map: HashMap<NodeId, NodeId> = nodes
            .iter()
            .enumerate()
            .map(|(index, (old, _))| (*old, NodeId(index)))
            .collect();
        let slots: Vec<Option<Node>> = nodes
            .into_iter()
            .map(|(_, mut node)| {
                node.remap(|handle| map.get(&handle).copied());
                Some(node)
            })
            .collect();
        VnTree {
            live: slots.len(),
            slots,
            vacant: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Create a node from a builder; the parent slot must have been checked
    pub(crate) fn materialize(
        &mut self,
        parent: Option<NodeId>,
        index: Option<usize>,
        builder: NodeBuilder,
    ) -> NodeId {
        let NodeBuilder {
            name,
            name_fn,
            data,
            dict,
            identity,
            kind,
            attributes,
        } = builder;

        let id = self.reserve();
        self.place(id, Node::new(kind, data.unwrap_or_default()));
        if let Some(parent) = parent {
            self.link(parent, id, index);
        }

        if let Some(dict) = dict {
            self.load_dict(id, dict);
        }
        if !attributes.is_empty() {
            apply_attributes(self, id, attributes);
        }

        let name = match (name, name_fn) {
            (Some(name), _) => Some(name),
            (None, Some(name_fn)) => Some(name_fn(&*self, id)),
            (None, None) => None,
        };

        if let Some(data) = self.data_mut(id) {
            match name {
                Some(name) => NAME.write(data, Value::String(name)),
                None => adopt_data_name(data),
            }
            match identity {
                Some(identity) => IDENTITY.write(data, Value::String(identity)),
                None if IDENTITY.lookup(data).is_some_and(|v| !v.is_null()) => {}
                None => IDENTITY.write(data, Value::String(new_identity())),
            }
        }
        id
    }
}

/// Move a top-level `name` string into the namespace of an unnamed node
fn adopt_data_name(data: &mut DataMap) {
    let named = data
        .get(META_NS)
        .and_then(Value::as_map)
        .is_some_and(|ns| ns.get(NAME.name()).is_some_and(|v| !v.is_null()));
    if named || !matches!(data.get(NAME.name()), Some(Value::String(_))) {
        return;
    }
    if let Some(name) = data.shift_remove(NAME.name()) {
        NAME.write(data, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree() {
        let tree = VnTree::new("root");
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.name(tree.root()), "root");
        assert!(tree.identity(tree.root()).is_some());
        assert!(tree.get(tree.root()).unwrap().is_root());
    }

    #[test]
    fn test_identities_are_unique() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        for i in 0..20 {
            tree.add(root, format!("child {i}")).unwrap();
        }
        let ids: HashSet<String> = tree.identities().into_iter().collect();
        assert_eq!(ids.len(), 21);
    }

    #[test]
    fn test_explicit_identity_wins() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let child = tree
            .insert(root, NodeBuilder::named("c").identity("abc"))
            .unwrap();
        assert_eq!(tree.identity(child), Some("abc"));
    }

    #[test]
    fn test_identity_in_data_kept() {
        let mut ns = DataMap::new();
        ns.insert("_id".into(), Value::from("from-data"));
        let mut data = DataMap::new();
        data.insert("_vntree".into(), Value::Map(ns));
        let tree = NodeBuilder::named("root").data(data).into_tree();
        assert_eq!(tree.identity(tree.root()), Some("from-data"));
    }

    #[test]
    fn test_literal_name_beats_computed() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let child = tree
            .insert(
                root,
                NodeBuilder::named("literal").name_with(|_, _| "computed".to_string()),
            )
            .unwrap();
        assert_eq!(tree.name(child), "literal");
    }

    #[test]
    fn test_insert_at_out_of_range() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let err = tree.insert_at(root, 3, "x").unwrap_err();
        assert_eq!(err, Error::IndexOutOfRange { index: 3, len: 0 });
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_invalid_parent() {
        let mut tree = VnTree::new("root");
        assert!(matches!(
            tree.add(NodeId(77), "x"),
            Err(Error::InvalidParent(_))
        ));
    }

    #[test]
    fn test_detach_and_slots() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        tree.add(a, "a1").unwrap();
        tree.add(root, "b").unwrap();

        let detached = tree.detach(a).unwrap();
        assert_eq!(tree.node_count(), 2);
        assert!(!tree.contains(a));
        assert_eq!(detached.node_count(), 2);
        assert_eq!(detached.name(detached.root()), "a");
        assert!(detached.parent(detached.root()).is_none());
    }

    #[test]
    fn test_name_from_top_level_data() {
        let mut data = DataMap::new();
        data.insert("name".into(), Value::from("second child"));
        data.insert("astring".into(), Value::from("testing..."));
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let child = tree.insert(root, NodeBuilder::new().data(data)).unwrap();

        assert_eq!(tree.name(child), "second child");
        let data = tree.data(child).unwrap();
        assert!(!data.contains_key("name"));
        assert_eq!(data.get("astring"), Some(&Value::from("testing...")));
    }

    #[test]
    fn test_namespace_name_beats_top_level() {
        let mut ns = DataMap::new();
        ns.insert("name".into(), Value::from("inner"));
        let mut data = DataMap::new();
        data.insert("_vntree".into(), Value::Map(ns));
        data.insert("name".into(), Value::from("outer"));
        let tree = NodeBuilder::new().data(data).into_tree();
        assert_eq!(tree.name(tree.root()), "inner");
        assert_eq!(tree.data(tree.root()).unwrap().get("name"), Some(&Value::from("outer")));
    }

    #[test]
    fn test_detached_slots_are_reused() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let keep = tree.add(root, "keep").unwrap();
        for round in 0..50 {
            let branch = tree.add(root, format!("branch {round}")).unwrap();
            tree.add(branch, "leaf").unwrap();
            let cut = tree.detach(branch).unwrap();
            tree.add_child(keep, cut, None, false).unwrap();
            let grafted = tree.children(keep)[0];
            tree.detach(grafted).unwrap();
        }
        assert_eq!(tree.node_count(), 2);
        assert!(tree.slots.len() <= 4);
        assert_eq!(tree.name(keep), "keep");
        assert_eq!(tree.children(root), [keep]);
    }

    #[test]
    fn test_graft_into_vacant_slots() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        tree.add(a, "a1").unwrap();
        let cut = tree.detach(a).unwrap();

        let top = tree.add_child(root, cut, None, false).unwrap();
        assert_eq!(tree.slots.len(), 3);
        assert_eq!(tree.name(top), "a");
        let a1 = tree.children(top)[0];
        assert_eq!(tree.name(a1), "a1");
        assert_eq!(tree.parent(a1), Some(top));
    }

    #[test]
    fn test_detach_root_refused() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        assert!(tree.detach(root).is_none());
    }

    #[test]
    fn test_move_node_into_descendant() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        let a1 = tree.add(a, "a1").unwrap();
        assert_eq!(tree.move_node(a, a1, None), Err(Error::WouldCycle(a)));
        assert_eq!(tree.move_node(root, a, None), Err(Error::WouldCycle(root)));
    }

    #[test]
    fn test_move_node_bad_index_restores() {
        let mut tree = VnTree::new("root");
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        let b = tree.add(root, "b").unwrap();
        let c = tree.add(root, "c").unwrap();
        assert!(tree.move_node(b, a, Some(5)).is_err());
        assert_eq!(tree.children(root), &[a, b, c]);
        assert_eq!(tree.parent(b), Some(root));
    }
}
