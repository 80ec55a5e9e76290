//! Contract violations raised by tree operations
//!
//! Recoverable lookups never produce these: a missing name, path, coordinate
//! or file yields `None` and a logged warning instead.

use derive_more::Display;

use crate::tree::NodeId;

/// Errors for programmer mistakes: wrong handles, bad indices, impossible moves
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Error {
    /// The parent handle does not name a node of this tree, or an imported
    /// `parent` field is neither a node reference nor null
    #[display(fmt = "invalid parent: {}", _0)]
    InvalidParent(String),

    /// The handle does not name a live node of this tree
    #[display(fmt = "{} is not a node of this tree", _0)]
    UnknownNode(NodeId),

    /// An explicit child index is past the end of the child list
    #[display(fmt = "child index {} out of range for {} children", index, len)]
    IndexOutOfRange { index: usize, len: usize },

    /// The node would become its own ancestor
    #[display(fmt = "cannot move {} beneath its own subtree", _0)]
    WouldCycle(NodeId),

    /// An embedding operation was invoked on a plain node
    #[display(fmt = "{} is not an embedding node", _0)]
    NotEmbedNode(NodeId),
}

impl std::error::Error for Error {}

/// Result alias for tree operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::IndexOutOfRange { index: 4, len: 2 }.to_string(),
            "child index 4 out of range for 2 children"
        );
        assert_eq!(
            Error::UnknownNode(NodeId::new(7)).to_string(),
            "NodeId(7) is not a node of this tree"
        );
        assert_eq!(
            Error::InvalidParent("integer 5".into()).to_string(),
            "invalid parent: integer 5"
        );
    }
}
