//! Textual similarity between trees
//!
//! Both trees are serialized to structural-dictionary JSON and compared as
//! character sequences. This is a proxy for equality of structure and data,
//! not an isomorphism check: key order affects the score, and different
//! trees may serialize to similar text.

use tree_diff::TextDiff;

use crate::codec::DictOptions;
use crate::tree::{NodeId, Tree, VnTree};

fn dict_json(tree: &VnTree, id: NodeId, include_tree_metadata: bool, pretty: bool) -> String {
    let options = DictOptions {
        include_tree_metadata,
        ..DictOptions::default()
    };
    let encoded = match tree.to_structural_dict(id, &options) {
        Some(dict) if pretty => serde_json::to_string_pretty(&dict),
        Some(dict) => serde_json::to_string(&dict),
        None => return String::new(),
    };
    encoded.unwrap_or_default()
}

impl VnTree {
    /// Similarity ratio in `[0, 1]` of two whole trees
    ///
    /// Without tree metadata, names and identities stored in the reserved
    /// namespace are ignored.
    pub fn tree_compare(&self, other: &VnTree, include_tree_metadata: bool) -> f64 {
        self.compare_subtrees(self.root(), other, other.root(), include_tree_metadata)
    }

    /// Similarity ratio of the subtree under `id` and the subtree under
    /// `other_id` of `other`
    pub fn compare_subtrees(
        &self,
        id: NodeId,
        other: &VnTree,
        other_id: NodeId,
        include_tree_metadata: bool,
    ) -> f64 {
        TextDiff::ratio(
            &dict_json(self, id, include_tree_metadata, false),
            &dict_json(other, other_id, include_tree_metadata, false),
        )
    }

    /// Unified diff of the two trees' pretty JSON forms; empty when equal
    pub fn tree_diff(&self, other: &VnTree, include_tree_metadata: bool) -> String {
        TextDiff::unified_diff(
            &dict_json(self, self.root(), include_tree_metadata, true),
            &dict_json(other, other.root(), include_tree_metadata, true),
            self.name(self.root()),
            other.name(other.root()),
            3,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_ignored_by_default() {
        let mut one = VnTree::new("one");
        let root = one.root();
        one.add(root, "child").unwrap();
        let mut two = VnTree::new("two");
        let root = two.root();
        two.add(root, "child").unwrap();

        assert_eq!(one.tree_compare(&two, false), 1.0);
        assert!(one.tree_compare(&two, true) < 1.0);
        assert!(one.tree_diff(&two, false).is_empty());
    }

    #[test]
    fn test_data_difference() {
        let mut one = VnTree::new("t");
        let root = one.root();
        one.set_data(root, &["size"], 1).unwrap();
        let mut two = one.clone_tree(false);
        let root = two.root();
        two.set_data(root, &["size"], 2).unwrap();

        let ratio = one.tree_compare(&two, true);
        assert!(ratio > 0.9 && ratio < 1.0);
        let diff = one.tree_diff(&two, true);
        assert!(diff.contains("-    \"size\": 1"));
        assert!(diff.contains("+    \"size\": 2"));
    }

    #[test]
    fn test_reordered_children() {
        let build = |x: i64, keys: [&str; 2]| {
            let mut tree = VnTree::new("t");
            let root = tree.root();
            tree.set_data(root, &["x"], x).unwrap();
            for key in keys {
                let child = tree.add(root, "c").unwrap();
                tree.set_data(child, &["k"], key).unwrap();
            }
            tree
        };
        let one = build(1, ["a", "b"]);
        let two = build(2, ["b", "a"]);
        assert_eq!(one.tree_compare(&two, false), 0.6404494382022472);
    }
}
