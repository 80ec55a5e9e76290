//! Arena-backed tree of identity-stable nodes
//!
//! A [`VnTree`] owns every node of one tree in an arena and hands out
//! [`NodeId`] handles. Children are owned through their parent's ordered
//! child list; the parent link is a plain handle, so there are no reference
//! cycles. Moving a subtree between trees goes through [`VnTree::detach`] and
//! [`VnTree::add_child`], which re-issue handles in the receiving tree.
//!
//! The tree is single-owner: structural mutation takes `&mut self`, and
//! sharing across threads needs an external lock. [`VnTree::clone_subtree`]
//! produces a fully independent copy that can be handed elsewhere.

mod address;
mod arena;
mod builder;
mod node;
mod text;
mod traits;

pub use address::ChildSelector;
pub use arena::{new_identity, VnTree};
pub use builder::{NameFn, NodeBuilder};
pub use node::{Coordinate, Node, NodeClass, NodeId, NodeKind};
pub use text::{NameFormat, TextTreeOptions, TextTreeSymbols};
pub use traits::{TraversalOrder, Tree, TreeTraversal, TreeWalker};

/// Re-export common types for convenience
pub mod prelude {
    pub use super::{
        ChildSelector, Coordinate, NameFormat, Node, NodeBuilder, NodeClass, NodeId, NodeKind,
        TextTreeOptions, TextTreeSymbols, TraversalOrder, Tree, TreeTraversal, VnTree,
    };
}
