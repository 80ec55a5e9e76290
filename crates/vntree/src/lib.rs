//! vntree
//!
//! An ordered, mutable tree of identity-stable nodes with free-form data,
//! root-propagated attributes and several serialized forms.
//!
//! # Core Concepts
//!
//! - **VnTree**: arena owning every node of one tree, addressed by [`NodeId`]
//! - **Node data**: an ordered [`DataMap`] of [`Value`]s; name and identity
//!   live in its reserved `_vntree` namespace
//! - **Attributes**: [`attr::NodeAttr`] reads and writes one node's data,
//!   [`attr::TreeAttr`] always resolves on the current root
//! - **Codecs**: structural dictionary, JSON, flow-style markup, comma
//!   lines, a binary container, key/value tables and documents
//! - **Embedding**: nodes whose first child slot hosts a sub-tree that is
//!   hidden from traversal until activated
//!
//! # Example
//!
//! ```
//! use vntree::prelude::*;
//!
//! let mut tree = VnTree::new("ROOT");
//! let root = tree.root();
//! let child = tree.add(root, "child").unwrap();
//! tree.insert(child, NodeBuilder::named("leaf").with("size", 3)).unwrap();
//!
//! let leaf = tree.get_node_by_path(root, "/ROOT/child/leaf").unwrap();
//! assert_eq!(tree.coordinate(leaf).to_string(), "(0, 0)");
//! assert_eq!(tree.get_data(leaf, &["size"]), Some(Value::Int(3)));
//!
//! let copy = VnTree::from_json(&tree.to_json(root, None).unwrap()).unwrap();
//! assert_eq!(tree.tree_compare(&copy, true), 1.0);
//! ```

pub mod attr;
pub mod codec;
mod compare;
pub mod embed;
mod error;
pub mod tree;
mod value;

pub use codec::{CodecRegistry, DictOptions, TreeDict};
pub use embed::{EmbedState, TraversalFilter};
pub use error::{Error, Result};
pub use tree::{
    new_identity, ChildSelector, Coordinate, NameFormat, Node, NodeBuilder, NodeClass, NodeId, NodeKind,
    TextTreeOptions, TextTreeSymbols, TraversalOrder, Tree, TreeTraversal, VnTree,
};
pub use value::{assign, lookup, DataMap, Value};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::tree::prelude::*;
    pub use crate::{CodecRegistry, DataMap, DictOptions, Value};
}
