//! Key/value table container
//!
//! A tree is stored in one named table: the structural dictionary under the
//! reserved key `_vntree`, and each node's data under the node's identity.
//! Values are MessagePack-encoded. Per-node entries can be rewritten on their
//! own with [`VnTree::table_write_node`], and such updates win over the
//! structural dictionary when the tree is loaded again.

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;

use crate::attr::{Attribute, META_NS, TABLE_NAME};
use crate::codec::container::{decode, encode};
use crate::codec::{DictOptions, TreeDict};
use crate::tree::{NodeId, Tree, TraversalOrder, TreeTraversal, VnTree};
use crate::value::{DataMap, Value};

/// Table used when neither the caller nor the tree names one
pub const DEFAULT_TABLE: &str = "vntree0";

/// Key holding the structural dictionary
pub const STRUCTURE_KEY: &str = META_NS;

/// A store of named tables mapping string keys to byte blobs
pub trait KeyValueTable {
    fn read(&self, table: &str, key: &str) -> Result<Option<Vec<u8>>>;

    fn write(&mut self, table: &str, key: &str, value: Vec<u8>) -> Result<()>;

    /// Make previous writes durable
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory [`KeyValueTable`]
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    tables: HashMap<String, IndexMap<String, Vec<u8>>>,
    commits: usize,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of a table in insertion order
    pub fn keys(&self, table: &str) -> Vec<&str> {
        self.tables
            .get(table)
            .map(|entries| entries.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl KeyValueTable for MemoryTable {
    fn read(&self, table: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .tables
            .get(table)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn write(&mut self, table: &str, key: &str, value: Vec<u8>) -> Result<()> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}

impl VnTree {
    /// The table this tree was last saved to, or the default
    pub fn table_name(&self) -> String {
        TABLE_NAME
            .get(self, self.root())
            .as_str()
            .unwrap_or(DEFAULT_TABLE)
            .to_string()
    }

    /// Save the whole tree into a table
    ///
    /// Every node is written independently. Failed writes are logged and
    /// reported together as an error; entries already written stay written.
    pub fn save_table(&mut self, store: &mut impl KeyValueTable, table: Option<&str>) -> Result<()> {
        let table = table.map_or_else(|| self.table_name(), str::to_string);
        let root = self.root();
        TABLE_NAME.set(self, root, Value::from(table.as_str()))?;

        let dict = self
            .to_structural_dict(root, &DictOptions::default())
            .ok_or_else(|| anyhow!("tree has no root"))?;
        store.write(&table, STRUCTURE_KEY, encode(&dict)?)?;

        let nodes: Vec<NodeId> = self.walk_all(root, TraversalOrder::Forward).collect();
        let mut failed = 0;
        for id in nodes {
            if let Err(err) = self.table_write_node(store, &table, id) {
                warn!("save_table: node «{}»: {err:#}", self.name(id));
                failed += 1;
            }
        }
        store.commit()?;
        if failed > 0 {
            bail!("{failed} node(s) could not be written to table «{table}»");
        }
        debug!("saved {} nodes to table «{table}»", self.node_count());
        Ok(())
    }

    /// Write one node's data entry
    pub fn table_write_node(
        &self,
        store: &mut impl KeyValueTable,
        table: &str,
        id: NodeId,
    ) -> Result<()> {
        let identity = self
            .identity(id)
            .ok_or_else(|| anyhow!("node has no identity"))?;
        let data = self
            .to_structural_dict(id, &DictOptions {
                data_only: true,
                ..DictOptions::default()
            })
            .ok_or_else(|| anyhow!("{id} is not a node of this tree"))?;
        store.write(table, identity, encode(&data)?)
    }

    /// Merge a node's stored data entry into the node
    ///
    /// Stored values replace the node's values except inside the reserved
    /// namespace. Returns whether an entry was found.
    pub fn table_read_node(
        &mut self,
        store: &impl KeyValueTable,
        table: &str,
        id: NodeId,
    ) -> Result<bool> {
        let identity = self
            .identity(id)
            .ok_or_else(|| anyhow!("node has no identity"))?
            .to_string();
        let Some(bytes) = store.read(table, &identity)? else {
            return Ok(false);
        };
        let stored: TreeDict = decode(&bytes)?;
        let data = self
            .data_mut(id)
            .ok_or_else(|| anyhow!("{id} is not a node of this tree"))?;
        merge_stored(data, stored.data.unwrap_or_default());
        Ok(true)
    }

    /// Load a tree saved with [`save_table`](Self::save_table)
    ///
    /// Returns `None`, after logging, when the table holds no tree.
    pub fn load_table(store: &impl KeyValueTable, table: Option<&str>) -> Option<VnTree> {
        let table = table.unwrap_or(DEFAULT_TABLE);
        match read_table(store, table) {
            Ok(tree) => Some(tree),
            Err(err) => {
                warn!("load_table: table «{table}»: {err:#}");
                None
            }
        }
    }
}

fn merge_stored(data: &mut DataMap, stored: DataMap) {
    for (key, value) in stored {
        if key != META_NS {
            data.insert(key, value);
        }
    }
}

fn read_table(store: &impl KeyValueTable, table: &str) -> Result<VnTree> {
    let bytes = store
        .read(table, STRUCTURE_KEY)?
        .ok_or_else(|| anyhow!("no «{STRUCTURE_KEY}» entry"))?;
    let dict: TreeDict = decode(&bytes)?;
    let mut tree = VnTree::from_structural_dict(dict);
    let nodes: Vec<NodeId> = tree.walk_all(tree.root(), TraversalOrder::Forward).collect();
    for id in nodes {
        match tree.table_read_node(store, table, id) {
            Ok(true) => {}
            Ok(false) => debug!("load_table: no data entry for «{}»", tree.name(id)),
            Err(err) => warn!("load_table: node «{}»: {err:#}", tree.name(id)),
        }
    }
    let root = tree.root();
    TABLE_NAME.set(&mut tree, root, Value::from(table))?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeBuilder;

    struct FlakyTable {
        inner: MemoryTable,
        fail_key: String,
    }

    impl KeyValueTable for FlakyTable {
        fn read(&self, table: &str, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.read(table, key)
        }

        fn write(&mut self, table: &str, key: &str, value: Vec<u8>) -> Result<()> {
            if key == self.fail_key {
                bail!("disk full");
            }
            self.inner.write(table, key, value)
        }
    }

    fn sample() -> (VnTree, NodeId) {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        let child = tree
            .insert(root, NodeBuilder::named("child").with("count", 2))
            .unwrap();
        (tree, child)
    }

    #[test]
    fn test_layout() {
        let (mut tree, _) = sample();
        let mut store = MemoryTable::new();
        tree.save_table(&mut store, None).unwrap();
        let mut expected = vec![STRUCTURE_KEY.to_string()];
        expected.extend(tree.identities());
        assert_eq!(store.keys(DEFAULT_TABLE), expected);
        assert_eq!(store.commits(), 1);
        assert_eq!(tree.table_name(), DEFAULT_TABLE);
    }

    #[test]
    fn test_node_update_wins_on_load() {
        let (mut tree, child) = sample();
        let mut store = MemoryTable::new();
        tree.save_table(&mut store, Some("trees")).unwrap();

        tree.set_data(child, &["count"], 5).unwrap();
        tree.table_write_node(&mut store, "trees", child).unwrap();

        let loaded = VnTree::load_table(&store, Some("trees")).unwrap();
        assert_eq!(loaded.table_name(), "trees");
        let loaded_child = loaded.children(loaded.root())[0];
        assert_eq!(loaded.get_data(loaded_child, &["count"]), Some(Value::Int(5)));
        assert_eq!(loaded.identities(), tree.identities());
    }

    #[test]
    fn test_partial_failure_reported() {
        let (mut tree, child) = sample();
        let mut store = FlakyTable {
            inner: MemoryTable::new(),
            fail_key: tree.identity(child).unwrap().to_string(),
        };
        assert!(tree.save_table(&mut store, None).is_err());
        // The root entry was still written
        let root_identity = tree.identity(tree.root()).unwrap();
        assert!(store.read(DEFAULT_TABLE, root_identity).unwrap().is_some());
    }

    #[test]
    fn test_empty_table() {
        assert!(VnTree::load_table(&MemoryTable::new(), None).is_none());
    }
}
