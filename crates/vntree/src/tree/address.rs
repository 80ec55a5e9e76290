//! Locating nodes by name, path, coordinate, identity and data

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::tree::{Coordinate, NodeId, Tree, TreeTraversal, VnTree};
use crate::value::{assign, lookup, Value};

/// Selects one child for [`VnTree::remove_child`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSelector<'a> {
    /// Position in the child list
    Index(usize),
    /// First child with this name
    Name(&'a str),
    /// This exact node
    Node(NodeId),
}

impl From<usize> for ChildSelector<'_> {
    fn from(index: usize) -> Self {
        ChildSelector::Index(index)
    }
}

impl<'a> From<&'a str> for ChildSelector<'a> {
    fn from(name: &'a str) -> Self {
        ChildSelector::Name(name)
    }
}

impl From<NodeId> for ChildSelector<'_> {
    fn from(id: NodeId) -> Self {
        ChildSelector::Node(id)
    }
}

impl VnTree {
    /// Child indices from the root down to `id`
    pub fn coordinate(&self, id: NodeId) -> Coordinate {
        let mut coordinate = Coordinate::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if let Some(index) = self.children(parent).iter().position(|&c| c == current) {
                coordinate.push(index);
            }
            current = parent;
        }
        coordinate.reverse();
        coordinate
    }

    /// Slash-joined names from the root to `id`, e.g. `/ROOT/child`
    ///
    /// Only unambiguous while sibling names are unique.
    pub fn path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .into_iter()
            .map(|ancestor| self.name(ancestor))
            .collect();
        names.reverse();
        names.push(self.name(id));
        format!("/{}", names.join("/"))
    }

    /// First child of `id` with the given name
    pub fn get_child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut matches = self
            .children(id)
            .iter()
            .copied()
            .filter(|&child| self.name(child) == name);
        let first = matches.next();
        if first.is_some() && matches.next().is_some() {
            warn!("«{}» has several children named «{name}»; using the first", self.name(id));
        }
        first
    }

    /// Resolve a slash-separated path of names
    ///
    /// A leading slash resolves from the root, whose own name must be the
    /// first segment; otherwise the path is relative to `id`. `.` denotes
    /// the starting node.
    pub fn get_node_by_path(&self, id: NodeId, path: &str) -> Option<NodeId> {
        self.get(id)?;
        let (mut current, rest) = match path.strip_prefix('/') {
            Some(absolute) => {
                let root = self.root_of(id);
                let mut segments = absolute.splitn(2, '/');
                let first = segments.next().unwrap_or("");
                if first != self.name(root) {
                    debug!("path «{path}» does not start at root «{}»", self.name(root));
                    return None;
                }
                (root, segments.next().unwrap_or(""))
            }
            None => (id, path),
        };
        for segment in rest.split('/') {
            match segment {
                "" | "." => continue,
                name => current = self.get_child_by_name(current, name)?,
            }
        }
        Some(current)
    }

    /// Follow child indices from the root, or from `id` when `relative`
    ///
    /// Hidden children are reachable. An out-of-range index yields `None`.
    pub fn get_node_by_coordinate(
        &self,
        id: NodeId,
        coordinate: &[usize],
        relative: bool,
    ) -> Option<NodeId> {
        self.get(id)?;
        let mut current = if relative { id } else { self.root_of(id) };
        for &index in coordinate {
            current = *self.children(current).get(index)?;
        }
        Some(current)
    }

    /// First node under the root, in forward order, with this identity
    pub fn get_node_by_identity(&self, identity: &str) -> Option<NodeId> {
        self.iter(self.root())
            .find(|&n| self.identity(n) == Some(identity))
    }

    /// First node whose data at `keys` equals `value`
    ///
    /// Scans the subtree under `id` in forward order when `descend`,
    /// otherwise `id` and then its ancestors, nearest first.
    pub fn find_one_node(
        &self,
        id: NodeId,
        keys: &[&str],
        value: &Value,
        descend: bool,
    ) -> Option<NodeId> {
        let matches = |n: &NodeId| {
            self.data(*n)
                .and_then(|data| lookup(data, keys))
                .is_some_and(|found| found == value)
        };
        if descend {
            self.iter(id).find(matches)
        } else {
            self.get(id)?;
            std::iter::once(id)
                .chain(self.ancestors(id))
                .find(matches)
        }
    }

    /// First node under `id` with the given name
    pub fn find_one_node_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.iter(id).find(|&n| self.name(n) == name)
    }

    /// A copy of the value at a nested key path of the node's data
    pub fn get_data(&self, id: NodeId, keys: &[&str]) -> Option<Value> {
        self.data(id).and_then(|data| lookup(data, keys)).cloned()
    }

    /// Store a value at a nested key path, creating intermediate maps
    pub fn set_data(&mut self, id: NodeId, keys: &[&str], value: impl Into<Value>) -> Result<()> {
        let data = self.data_mut(id).ok_or(Error::UnknownNode(id))?;
        assign(data, keys, value.into());
        Ok(())
    }
}
