//! The structural dictionary: nested `{data, childs}` interchange form

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::attr::{IDENTITY, META_NS, NAME};
use crate::embed::{EmbedRecord, EmbedState};
use crate::tree::{NodeBuilder, NodeClass, NodeId, NodeKind, Tree, VnTree};
use crate::value::{DataMap, Value};

/// Top-level keys with a structural meaning, never applied as attributes
pub const RESERVED_KEYS: [&str; 3] = ["parent", "childs", "data"];

/// Attribute key recording embedding state
pub const EMBED_KEY: &str = "embed";

/// One node and, optionally, its subtree in nested dictionary form
///
/// Serializes as `{"data": {...}, <attributes>..., "childs": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeDict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
    /// Flat top-level keys applied as attribute assignments
    #[serde(flatten)]
    pub attributes: DataMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub childs: Option<Vec<TreeDict>>,
}

impl TreeDict {
    pub fn with_data(data: DataMap) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Number of nodes described, this one included
    pub fn node_count(&self) -> usize {
        1 + self
            .childs
            .iter()
            .flatten()
            .map(TreeDict::node_count)
            .sum::<usize>()
    }
}

/// Options for [`VnTree::to_structural_dict`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictOptions {
    /// Descend into children; a recursive dict always carries `childs`
    pub recursive: bool,
    /// Keep the reserved `_vntree` namespace (name, identity) in `data`
    pub include_tree_metadata: bool,
    /// Emit only the `data` payload
    pub data_only: bool,
}

impl Default for DictOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            include_tree_metadata: true,
            data_only: false,
        }
    }
}

impl DictOptions {
    /// Content only: no bookkeeping namespace
    pub fn content() -> Self {
        Self {
            include_tree_metadata: false,
            ..Self::default()
        }
    }
}

impl VnTree {
    /// Serialize the subtree under `id`, hidden children included
    pub fn to_structural_dict(&self, id: NodeId, options: &DictOptions) -> Option<TreeDict> {
        let node = self.get(id)?;
        let mut data = node.data().clone();
        if !options.include_tree_metadata {
            data.shift_remove(META_NS);
        }
        if options.data_only {
            return Some(TreeDict::with_data(data));
        }

        let mut attributes = DataMap::new();
        match node.kind() {
            NodeKind::Embed(state) => {
                let record = state.record();
                let mut map = DataMap::new();
                map.insert("active".into(), Value::Bool(record.active));
                map.insert("hosted".into(), Value::Bool(record.hosted));
                attributes.insert(EMBED_KEY.into(), Value::Map(map));
            }
            NodeKind::Plain => {
                // Children default to their parent's class
                let parent_kind = node.parent().and_then(|parent| self.kind(parent));
                if parent_kind.is_some_and(NodeKind::is_embed) {
                    attributes.insert(EMBED_KEY.into(), Value::Null);
                }
            }
        }

        let childs = options.recursive.then(|| {
            node.children()
                .iter()
                .filter_map(|&child| self.to_structural_dict(child, options))
                .collect()
        });
        Some(TreeDict {
            data: Some(data),
            attributes,
            childs,
        })
    }

    /// Build a new tree of plain nodes from a structural dictionary
    pub fn from_structural_dict(dict: TreeDict) -> VnTree {
        Self::from_structural_dict_as(dict, NodeClass::Plain)
    }

    /// Build a new tree whose root has the given class
    pub fn from_structural_dict_as(dict: TreeDict, class: NodeClass) -> VnTree {
        NodeBuilder::new().class(class).dict(dict).into_tree()
    }

    /// Populate an existing node from a structural dictionary
    ///
    /// `data` is replaced when present, other keys are applied as
    /// attributes, then each entry of `childs` is constructed and appended
    /// in order with the class of `id`.
    pub fn load_dict(&mut self, id: NodeId, dict: TreeDict) {
        let TreeDict {
            data,
            attributes,
            childs,
        } = dict;
        if let (Some(data), Some(slot)) = (data, self.data_mut(id)) {
            *slot = data;
        }
        apply_attributes(self, id, attributes);

        let Some(class) = self.kind(id).map(NodeKind::class) else {
            return;
        };
        for child in childs.into_iter().flatten() {
            let builder = NodeBuilder::new().class(class).dict(child);
            self.materialize(Some(id), None, builder);
        }
        trace!("loaded structural dict into «{}»", self.name(id));
    }
}

/// Apply flat top-level keys to a node
///
/// `name` and `_id`/`identity` set the bookkeeping fields, `embed` sets the
/// embedding state, the structural keys are skipped, and anything else is
/// stored in `data` under its own key.
pub(crate) fn apply_attributes(tree: &mut VnTree, id: NodeId, attributes: DataMap) {
    for (key, value) in attributes {
        match key.as_str() {
            k if RESERVED_KEYS.contains(&k) => continue,
            "name" => match value {
                Value::String(name) => {
                    if let Some(data) = tree.data_mut(id) {
                        NAME.write(data, Value::String(name));
                    }
                }
                Value::Null => {}
                other => {
                    if let Some(data) = tree.data_mut(id) {
                        NAME.write(data, Value::String(other.to_string()));
                    }
                }
            },
            "_id" | "identity" => {
                if let Some(data) = tree.data_mut(id) {
                    IDENTITY.write(data, value);
                }
            }
            EMBED_KEY => apply_embed(tree, id, &value),
            _ => {
                if let Some(data) = tree.data_mut(id) {
                    data.insert(key, value);
                }
            }
        }
    }
}

fn apply_embed(tree: &mut VnTree, id: NodeId, value: &Value) {
    let kind = match value {
        Value::Null | Value::Bool(false) => NodeKind::Plain,
        Value::Bool(true) => NodeKind::Embed(EmbedState::default()),
        Value::Map(map) => {
            let flag = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);
            let record = EmbedRecord {
                active: flag("active"),
                hosted: flag("hosted"),
            };
            NodeKind::Embed(EmbedState::restore(&record))
        }
        other => {
            warn!("ignoring unrecognised «{EMBED_KEY}» value {other} on «{}»", tree.name(id));
            return;
        }
    };
    if let Some(node) = tree.node_mut(id) {
        if node.children.is_empty() {
            node.kind = kind;
        } else {
            warn!("«{EMBED_KEY}» must be set before children are attached; ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeTraversal;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_shape() {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        tree.insert(root, NodeBuilder::named("leaf").with("n", 1)).unwrap();
        let dict = tree
            .to_structural_dict(root, &DictOptions::content())
            .unwrap();
        let text = serde_json::to_string(&dict).unwrap();
        assert_eq!(text, r#"{"data":{},"childs":[{"data":{"n":1},"childs":[]}]}"#);
    }

    #[test]
    fn test_non_recursive_has_no_childs() {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        tree.add(root, "leaf").unwrap();
        let options = DictOptions {
            recursive: false,
            ..DictOptions::default()
        };
        let dict = tree.to_structural_dict(root, &options).unwrap();
        assert!(dict.childs.is_none());
    }

    #[test]
    fn test_attributes_applied() {
        let dict: TreeDict = serde_json::from_str(
            r#"{"name": "top", "_id": "fixed", "colour": "blue", "parent": 7,
                "childs": [{"name": "kid"}]}"#,
        )
        .unwrap();
        assert_eq!(dict.node_count(), 2);
        let tree = VnTree::from_structural_dict(dict);
        let root = tree.root();
        assert_eq!(tree.name(root), "top");
        assert_eq!(tree.identity(root), Some("fixed"));
        assert_eq!(tree.get_data(root, &["colour"]), Some(Value::from("blue")));
        assert_eq!(tree.get_data(root, &["parent"]), None);
        assert_eq!(tree.name(tree.children(root)[0]), "kid");
    }

    #[test]
    fn test_embed_state_round_trip() {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        let embed = tree
            .insert(root, NodeBuilder::named("embed").class(NodeClass::Embed))
            .unwrap();
        tree.add(embed, "visible").unwrap();
        tree.embed_tree(embed, VnTree::new("guest")).unwrap();

        let dict = tree.to_structural_dict(root, &DictOptions::default()).unwrap();
        let copy = VnTree::from_structural_dict(dict);
        let copy_embed = copy.children(copy.root())[0];
        assert!(copy.kind(copy_embed).unwrap().is_embed());
        let host = copy.embedded_host(copy_embed).unwrap();
        assert_eq!(copy.name(host), "EMBED");
        assert!(!copy.is_active(copy_embed));
        assert_eq!(copy.name(copy.children(copy_embed)[1]), "visible");
        assert!(!copy.kind(copy.children(copy_embed)[1]).unwrap().is_embed());
        assert_eq!(copy.iter(copy.root()).count(), 3);
    }
}
