//! Core tree traits: read access and traversal

use std::collections::VecDeque;

use crate::embed::TraversalFilter;
use crate::tree::{Node, NodeId};

/// Read access to an ordered tree of [`Node`]s
///
/// Implementations provide the primitive lookups; derived methods walk the
/// parent links. Every derived method tolerates invalid handles and returns
/// an empty or `None` answer for them.
pub trait Tree {
    /// Get the root node ID (always exists)
    fn root(&self) -> NodeId;

    /// Get a node by its ID
    ///
    /// Returns `None` if the ID is invalid.
    fn get(&self, id: NodeId) -> Option<&Node>;

    /// Count live nodes in the tree
    fn node_count(&self) -> usize;

    /// Get the parent of a node
    ///
    /// Returns `None` for the root node.
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// All children of a node in list order, hidden ones included
    fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) => node.children(),
            None => &[],
        }
    }

    /// Children that take part in traversal
    ///
    /// A node kind may hide some of its children from iteration through
    /// [`TraversalFilter`]; addressing by coordinate still reaches them.
    fn visible_children(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id) {
            Some(node) => node
                .children()
                .iter()
                .copied()
                .filter(|&child| !node.kind().hides(child))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Get all ancestors of a node, from parent to root
    ///
    /// Returns an empty vector for the root or invalid IDs.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent_id) = current {
            ancestors.push(parent_id);
            current = self.parent(parent_id);
        }
        ancestors
    }

    /// Get the depth of a node (root = 0)
    fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Get the level of a node (root = 1)
    fn level(&self, id: NodeId) -> usize {
        self.depth(id) + 1
    }

    /// Follow parent links to the top
    fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    /// Check if a node is an ancestor of another
    fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut current = self.parent(descendant);
        while let Some(parent_id) = current {
            if parent_id == ancestor {
                return true;
            }
            current = self.parent(parent_id);
        }
        false
    }
}

/// Traversal order for walking the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalOrder {
    /// Visit a node, then each child's subtree in list order (top-down)
    Forward,
    /// Exact mirror of `Forward`: children's subtrees in reverse list order,
    /// then the node itself (bottom-up)
    Reverse,
    /// Visit level by level
    BreadthFirst,
}

/// Extension trait providing tree traversal utilities
///
/// This trait is automatically implemented for all types that implement `Tree`.
pub trait TreeTraversal: Tree {
    /// Walk the subtree under `start`, skipping children hidden by their
    /// parent's kind
    fn walk(&self, start: NodeId, order: TraversalOrder) -> TreeWalker<'_, Self>
    where
        Self: Sized,
    {
        TreeWalker::new(self, start, order, false)
    }

    /// Walk the subtree under `start` including hidden children
    fn walk_all(&self, start: NodeId, order: TraversalOrder) -> TreeWalker<'_, Self>
    where
        Self: Sized,
    {
        TreeWalker::new(self, start, order, true)
    }

    /// Forward (pre-order) walk under `start`
    fn iter(&self, start: NodeId) -> TreeWalker<'_, Self>
    where
        Self: Sized,
    {
        self.walk(start, TraversalOrder::Forward)
    }

    /// Reverse walk under `start`
    fn iter_rev(&self, start: NodeId) -> TreeWalker<'_, Self>
    where
        Self: Sized,
    {
        self.walk(start, TraversalOrder::Reverse)
    }

    /// Find nodes matching a predicate, in forward order
    fn find<F>(&self, start: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Node) -> bool,
        Self: Sized,
    {
        self.iter(start)
            .filter(|&id| self.get(id).map(&predicate).unwrap_or(false))
            .collect()
    }
}

// Blanket implementation for all Tree types
impl<T: Tree> TreeTraversal for T {}

/// Lazy iterator over a subtree in one of the [`TraversalOrder`]s
///
/// A walker is finite; a fresh one is obtained by walking again.
pub struct TreeWalker<'a, T: Tree + ?Sized> {
    tree: &'a T,
    order: TraversalOrder,
    include_hidden: bool,
    // (node, children already pushed)
    stack: Vec<(NodeId, bool)>,
    queue: VecDeque<NodeId>,
}

impl<'a, T: Tree + ?Sized> TreeWalker<'a, T> {
    /// Create a new tree walker starting from the given node
    pub fn new(tree: &'a T, start: NodeId, order: TraversalOrder, include_hidden: bool) -> Self {
        let valid = tree.get(start).is_some();
        let mut stack = Vec::new();
        let mut queue = VecDeque::new();
        if valid {
            match order {
                TraversalOrder::BreadthFirst => queue.push_back(start),
                _ => stack.push((start, false)),
            }
        }

        Self {
            tree,
            order,
            include_hidden,
            stack,
            queue,
        }
    }

    fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        if self.include_hidden {
            self.tree.children(id).to_vec()
        } else {
            self.tree.visible_children(id)
        }
    }

    fn next_forward(&mut self) -> Option<NodeId> {
        let (current, _) = self.stack.pop()?;

        // Add children in reverse order so they're popped in correct order
        for child in self.children_of(current).into_iter().rev() {
            self.stack.push((child, false));
        }

        Some(current)
    }

    fn next_reverse(&mut self) -> Option<NodeId> {
        while let Some((current, expanded)) = self.stack.pop() {
            if expanded {
                return Some(current);
            }
            self.stack.push((current, true));

            // Pushed in list order, so the last child is expanded first
            for child in self.children_of(current) {
                self.stack.push((child, false));
            }
        }
        None
    }

    fn next_breadthfirst(&mut self) -> Option<NodeId> {
        let current = self.queue.pop_front()?;
        let children = self.children_of(current);
        self.queue.extend(children);
        Some(current)
    }
}

impl<'a, T: Tree + ?Sized> Iterator for TreeWalker<'a, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        match self.order {
            TraversalOrder::Forward => self.next_forward(),
            TraversalOrder::Reverse => self.next_reverse(),
            TraversalOrder::BreadthFirst => self.next_breadthfirst(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;
    use crate::value::DataMap;

    // Simple test tree implementation
    struct TestTree {
        nodes: Vec<Node>,
    }

    impl TestTree {
        fn new() -> Self {
            Self {
                nodes: vec![Node::new(NodeKind::Plain, DataMap::new())],
            }
        }

        fn add_child(&mut self, parent: NodeId) -> NodeId {
            let id = NodeId::new(self.nodes.len());
            let mut node = Node::new(NodeKind::Plain, DataMap::new());
            node.parent = Some(parent);
            self.nodes.push(node);
            self.nodes[parent.get()].children.push(id);
            id
        }
    }

    impl Tree for TestTree {
        fn root(&self) -> NodeId {
            NodeId(0)
        }

        fn get(&self, id: NodeId) -> Option<&Node> {
            self.nodes.get(id.get())
        }

        fn node_count(&self) -> usize {
            self.nodes.len()
        }
    }

    fn sample() -> (TestTree, [NodeId; 5]) {
        let mut tree = TestTree::new();
        let root = tree.root();
        let a = tree.add_child(root);
        let b = tree.add_child(root);
        let a1 = tree.add_child(a);
        let a2 = tree.add_child(a);
        (tree, [root, a, b, a1, a2])
    }

    #[test]
    fn test_forward() {
        let (tree, [root, a, b, a1, a2]) = sample();
        let nodes: Vec<_> = tree.iter(root).collect();
        assert_eq!(nodes, vec![root, a, a1, a2, b]);
    }

    #[test]
    fn test_reverse_mirrors_forward() {
        let (tree, [root, ..]) = sample();
        let mut forward: Vec<_> = tree.iter(root).collect();
        forward.reverse();
        let reverse: Vec<_> = tree.iter_rev(root).collect();
        assert_eq!(reverse, forward);
    }

    #[test]
    fn test_breadth_first() {
        let (tree, [root, a, b, a1, a2]) = sample();
        let nodes: Vec<_> = tree.walk(root, TraversalOrder::BreadthFirst).collect();
        assert_eq!(nodes, vec![root, a, b, a1, a2]);
    }

    #[test]
    fn test_depth_and_ancestors() {
        let (tree, [root, a, b, a1, _]) = sample();
        assert_eq!(tree.depth(root), 0);
        assert_eq!(tree.level(a1), 3);
        assert_eq!(tree.ancestors(a1), vec![a, root]);
        assert_eq!(tree.root_of(a1), root);
        assert!(tree.is_ancestor_of(root, a1));
        assert!(!tree.is_ancestor_of(b, a1));
    }

    #[test]
    fn test_invalid_start_is_empty() {
        let (tree, _) = sample();
        assert_eq!(tree.iter(NodeId(99)).count(), 0);
    }
}
