//! JSON text form of the structural dictionary

use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

use crate::codec::{DictOptions, TreeDict};
use crate::tree::{NodeId, VnTree};

impl VnTree {
    /// Serialize the subtree under `id` as pretty-printed JSON, also writing
    /// it to `path` when one is given
    pub fn to_json(&self, id: NodeId, path: Option<&Path>) -> Result<String> {
        let dict = self
            .to_structural_dict(id, &DictOptions::default())
            .with_context(|| format!("{id} is not a node of this tree"))?;
        let text = serde_json::to_string_pretty(&dict).context("Failed to encode tree as JSON")?;
        if let Some(path) = path {
            fs::write(path, &text)
                .with_context(|| format!("Failed to write JSON file {}", path.display()))?;
        }
        Ok(text)
    }

    /// Build a tree from a JSON file path or a literal JSON string
    ///
    /// Missing files and unparsable text are logged and yield `None`.
    pub fn from_json(source: &str) -> Option<VnTree> {
        match read_json(source) {
            Ok(dict) => Some(VnTree::from_structural_dict(dict)),
            Err(err) => {
                warn!("from_json: cannot load tree: {err:#}");
                None
            }
        }
    }
}

fn read_json(source: &str) -> Result<TreeDict> {
    let path = Path::new(source);
    let looks_literal = source.trim_start().starts_with(['{', '[']);
    if !looks_literal && path.is_file() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON file {}", path.display()))
    } else if looks_literal {
        serde_json::from_str(source).context("Failed to parse JSON text")
    } else {
        anyhow::bail!("«{source}» is neither a JSON file nor JSON text")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn test_literal_round_trip() {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        tree.add(root, "child").unwrap();
        let text = tree.to_json(root, None).unwrap();
        let copy = VnTree::from_json(&text).unwrap();
        assert_eq!(copy.identities(), tree.identities());
        assert_eq!(copy.name(copy.children(copy.root())[0]), "child");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        let tree = VnTree::new("top");
        tree.to_json(tree.root(), Some(path.as_path())).unwrap();
        let copy = VnTree::from_json(path.to_str().unwrap()).unwrap();
        assert_eq!(copy.name(copy.root()), "top");
    }

    #[test]
    fn test_failures_are_sentinels() {
        assert!(VnTree::from_json("{not json").is_none());
        assert!(VnTree::from_json("/definitely/not/here.json").is_none());
    }
}
