//! Nodes that host an embedded sub-tree in their first child slot
//!
//! An embedding node reserves child slot 0 for a host node (named `EMBED`)
//! under which embedded trees are grafted. While the node is inactive the
//! host and everything below it are skipped by traversal, search and text
//! rendering; addressing by coordinate still reaches them.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tree::{NodeBuilder, NodeClass, NodeId, NodeKind, TraversalOrder, TreeTraversal, VnTree};

/// Name given to the host node materialized by [`VnTree::embed_tree`]
pub const EMBED_HOST_NAME: &str = "EMBED";

/// Lets a node kind exclude some of its children from standard iteration
pub trait TraversalFilter {
    /// Whether `child` is hidden from traversal
    fn hides(&self, child: NodeId) -> bool;
}

/// Per-node state of an embedding node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedState {
    pub(crate) active: bool,
    pub(crate) host: Option<NodeId>,
    // Set when restoring from a dictionary: the next child linked at slot 0
    // becomes the host.
    pub(crate) claim_first_child: bool,
}

impl EmbedState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn host(&self) -> Option<NodeId> {
        self.host
    }

    pub(crate) fn offer_child(&mut self, position: usize, child: NodeId) {
        if self.claim_first_child && self.host.is_none() && position == 0 {
            self.host = Some(child);
            self.claim_first_child = false;
        }
    }

    pub(crate) fn release(&mut self, child: NodeId) {
        if self.host == Some(child) {
            self.host = None;
        }
    }

    /// The serializable form stored under the `embed` attribute
    pub(crate) fn record(&self) -> EmbedRecord {
        EmbedRecord {
            active: self.active,
            hosted: self.host.is_some(),
        }
    }

    pub(crate) fn restore(record: &EmbedRecord) -> Self {
        Self {
            active: record.active,
            host: None,
            claim_first_child: record.hosted,
        }
    }
}

impl TraversalFilter for EmbedState {
    fn hides(&self, child: NodeId) -> bool {
        !self.active && self.host == Some(child)
    }
}

/// Embedding state as written into structural dictionaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedRecord {
    pub active: bool,
    pub hosted: bool,
}

impl VnTree {
    /// Graft `subtree` under the host slot of the embedding node `id`
    ///
    /// The host is created on first use. Returns the handle of the grafted
    /// subtree's root; identities colliding with this tree are renewed.
    pub fn embed_tree(&mut self, id: NodeId, subtree: VnTree) -> Result<NodeId> {
        let existing = self
            .kind(id)
            .ok_or(Error::UnknownNode(id))?
            .embed_state()
            .ok_or(Error::NotEmbedNode(id))?
            .host;
        let host = match existing {
            Some(host) => host,
            None => {
                let host = self.insert_at(
                    id,
                    0,
                    NodeBuilder::named(EMBED_HOST_NAME).class(NodeClass::Embed),
                )?;
                if let Some(state) = self.node_mut(id).and_then(|n| n.kind.embed_state_mut()) {
                    state.host = Some(host);
                }
                debug!("materialized embed host under «{}»", self.name(id));
                host
            }
        };
        self.add_child(host, subtree, None, true)
    }

    /// The host node of an embedding node, if materialized
    pub fn embedded_host(&self, id: NodeId) -> Option<NodeId> {
        self.kind(id)?.embed_state()?.host
    }

    /// Whether an embedding node currently exposes its embedded content
    pub fn is_active(&self, id: NodeId) -> bool {
        self.kind(id)
            .and_then(NodeKind::embed_state)
            .is_some_and(EmbedState::is_active)
    }

    /// Expose embedded content to traversal
    ///
    /// With `recursive`, every embedding node of the subtree under `id` is
    /// activated, including ones inside currently hidden content.
    pub fn activate(&mut self, id: NodeId, recursive: bool) -> Result<()> {
        self.set_active(id, recursive, true)
    }

    /// Hide embedded content from traversal
    pub fn deactivate(&mut self, id: NodeId, recursive: bool) -> Result<()> {
        self.set_active(id, recursive, false)
    }

    fn set_active(&mut self, id: NodeId, recursive: bool, active: bool) -> Result<()> {
        let kind = self.kind(id).ok_or(Error::UnknownNode(id))?;
        let targets: Vec<NodeId> = if recursive {
            self.walk_all(id, TraversalOrder::Forward)
                .filter(|&n| self.kind(n).is_some_and(NodeKind::is_embed))
                .collect()
        } else if kind.is_embed() {
            vec![id]
        } else {
            return Err(Error::NotEmbedNode(id));
        };
        for target in targets {
            if let Some(state) = self.node_mut(target).and_then(|n| n.kind.embed_state_mut()) {
                state.active = active;
            }
        }
        Ok(())
    }
}
