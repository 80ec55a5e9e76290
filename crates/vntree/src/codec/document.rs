//! Document-database contract
//!
//! Each node maps to one document `{_id, name, <data fields>..., parent,
//! childs}` where `parent` is the parent's identity (or null) and `childs`
//! lists the children's identities. The database client sits behind
//! [`DocumentStore`]; [`MemoryDocumentStore`] is an in-process stand-in.

use anyhow::{anyhow, bail, Result};
use log::{debug, warn};

use crate::attr::{IDENTITY, META_NS, NAME};
use crate::tree::{NodeBuilder, NodeId, Tree, TraversalOrder, TreeTraversal, VnTree};
use crate::value::{DataMap, Value};

/// A document is an ordered map of fields
pub type Document = DataMap;

const ID_FIELD: &str = "_id";
const NAME_FIELD: &str = "name";
const PARENT_FIELD: &str = "parent";
const CHILDS_FIELD: &str = "childs";
const STRUCTURE_FIELDS: [&str; 4] = [ID_FIELD, NAME_FIELD, PARENT_FIELD, CHILDS_FIELD];

/// The operations a document collection must provide
///
/// Filters match documents whose fields equal every field of the filter.
pub trait DocumentStore {
    fn find_one(&self, filter: &Document) -> Result<Option<Document>>;

    fn insert_one(&mut self, document: Document) -> Result<()>;

    /// Set the patch's fields on the first match; with `upsert`, insert
    /// filter and patch together when nothing matches
    fn update_one(&mut self, filter: &Document, patch: Document, upsert: bool) -> Result<()>;

    /// Remove the first match, returning whether one existed
    fn delete_one(&mut self, filter: &Document) -> Result<bool>;
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, value)| document.get(key) == Some(value))
}

fn by_id(identity: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD.into(), Value::from(identity));
    filter
}

/// In-memory [`DocumentStore`] with unique `_id`s
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDocumentStore {
    documents: Vec<Document>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find_one(&self, filter: &Document) -> Result<Option<Document>> {
        Ok(self.documents.iter().find(|d| matches(d, filter)).cloned())
    }

    fn insert_one(&mut self, document: Document) -> Result<()> {
        if let Some(id) = document.get(ID_FIELD) {
            let duplicate = self
                .documents
                .iter()
                .any(|d| d.get(ID_FIELD) == Some(id));
            if duplicate {
                bail!("duplicate key {ID_FIELD}={id}");
            }
        }
        self.documents.push(document);
        Ok(())
    }

    fn update_one(&mut self, filter: &Document, patch: Document, upsert: bool) -> Result<()> {
        match self.documents.iter_mut().find(|d| matches(d, filter)) {
            Some(document) => document.extend(patch),
            None if upsert => {
                let mut document = filter.clone();
                document.extend(patch);
                self.documents.push(document);
            }
            None => debug!("update_one: no document matches {filter:?}"),
        }
        Ok(())
    }

    fn delete_one(&mut self, filter: &Document) -> Result<bool> {
        match self.documents.iter().position(|d| matches(d, filter)) {
            Some(index) => {
                self.documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl VnTree {
    /// The document describing one node
    pub fn to_document(&self, id: NodeId) -> Option<Document> {
        let identity = self.identity(id)?;
        let mut document = by_id(identity);
        document.insert(NAME_FIELD.into(), Value::from(self.name(id)));
        for (key, value) in self.data(id)? {
            if key != META_NS && !STRUCTURE_FIELDS.contains(&key.as_str()) {
                document.insert(key.clone(), value.clone());
            }
        }
        let parent = self.parent(id).and_then(|p| self.identity(p));
        document.insert(PARENT_FIELD.into(), Value::from(parent));
        let childs = self
            .children(id)
            .iter()
            .filter_map(|&child| self.identity(child))
            .map(Value::from)
            .collect();
        document.insert(CHILDS_FIELD.into(), Value::List(childs));
        Some(document)
    }

    fn subtree_or_node(&self, id: NodeId, recursive: bool) -> Vec<NodeId> {
        if recursive {
            self.walk_all(id, TraversalOrder::Forward).collect()
        } else {
            vec![id]
        }
    }

    /// Insert the node's document, or every document of its subtree
    pub fn db_insert(&self, store: &mut impl DocumentStore, id: NodeId, recursive: bool) -> Result<()> {
        let mut failed = 0;
        for node in self.subtree_or_node(id, recursive) {
            let document = self
                .to_document(node)
                .ok_or_else(|| anyhow!("{node} has no identity"))?;
            if let Err(err) = store.insert_one(document) {
                warn!("db_insert: «{}»: {err:#}", self.name(node));
                failed += 1;
            }
        }
        if failed > 0 {
            bail!("{failed} document(s) could not be inserted");
        }
        Ok(())
    }

    /// Upsert the node's document, or every document of its subtree
    pub fn db_update(&self, store: &mut impl DocumentStore, id: NodeId, recursive: bool) -> Result<()> {
        for node in self.subtree_or_node(id, recursive) {
            let mut document = self
                .to_document(node)
                .ok_or_else(|| anyhow!("{node} has no identity"))?;
            let filter = document
                .shift_remove_entry(ID_FIELD)
                .map(|(key, value)| Document::from_iter([(key, value)]))
                .unwrap_or_default();
            store.update_one(&filter, document, true)?;
        }
        Ok(())
    }

    /// Delete the node's document, or every document of its subtree;
    /// returns how many were removed
    pub fn db_delete(&self, store: &mut impl DocumentStore, id: NodeId, recursive: bool) -> Result<usize> {
        let mut removed = 0;
        for node in self.subtree_or_node(id, recursive) {
            let identity = self
                .identity(node)
                .ok_or_else(|| anyhow!("{node} has no identity"))?;
            if store.delete_one(&by_id(identity))? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Merge the stored document's fields into the node's data
    ///
    /// Existing values are not clobbered; stored maps are merged with the
    /// node's map winning. Returns `false`, after logging, when the node
    /// has no stored document.
    pub fn db_load(&mut self, store: &impl DocumentStore, id: NodeId) -> Result<bool> {
        let identity = self
            .identity(id)
            .ok_or_else(|| anyhow!("{id} has no identity"))?;
        let Some(document) = store.find_one(&by_id(identity))? else {
            warn!("db_load: no document for «{}»", self.name(id));
            return Ok(false);
        };
        let data = self
            .data_mut(id)
            .ok_or_else(|| anyhow!("{id} is not a node of this tree"))?;
        for (key, stored) in document {
            if STRUCTURE_FIELDS.contains(&key.as_str()) {
                continue;
            }
            match data.get_mut(&key) {
                None => {
                    data.insert(key, stored);
                }
                Some(Value::Map(current)) => {
                    if let Value::Map(mut stored) = stored {
                        stored.extend(current.drain(..));
                        *current = stored;
                    }
                }
                Some(_) => {}
            }
        }
        Ok(true)
    }

    /// Rebuild the subtree whose root document has `identity`
    ///
    /// Missing child documents are logged and skipped. Returns `None` when
    /// the root document is absent or the store fails.
    pub fn from_documents(store: &impl DocumentStore, identity: &str) -> Option<VnTree> {
        let root = match store.find_one(&by_id(identity)) {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!("from_documents: no document with {ID_FIELD}={identity}");
                return None;
            }
            Err(err) => {
                warn!("from_documents: {err:#}");
                return None;
            }
        };
        let (builder, childs) = document_builder(root);
        let mut tree = VnTree::from_builder(builder);
        let mut pending: Vec<(NodeId, Vec<String>)> = vec![(tree.root(), childs)];
        while let Some((parent, childs)) = pending.pop() {
            for child in childs {
                match store.find_one(&by_id(&child)) {
                    Ok(Some(document)) => {
                        let (builder, grandchilds) = document_builder(document);
                        match tree.insert(parent, builder) {
                            Ok(id) => pending.push((id, grandchilds)),
                            Err(err) => warn!("from_documents: {err}"),
                        }
                    }
                    Ok(None) => warn!("from_documents: missing child document {child}"),
                    Err(err) => warn!("from_documents: {err:#}"),
                }
            }
        }
        Some(tree)
    }
}

fn document_builder(mut document: Document) -> (NodeBuilder, Vec<String>) {
    let childs = match document.shift_remove(CHILDS_FIELD) {
        Some(Value::List(ids)) => ids
            .into_iter()
            .filter_map(|id| id.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    document.shift_remove(PARENT_FIELD);
    let identity = document.shift_remove(ID_FIELD);
    let name = document.shift_remove(NAME_FIELD);

    let mut data = document;
    if let Some(name) = name {
        NAME.write(&mut data, name);
    }
    if let Some(identity) = identity {
        IDENTITY.write(&mut data, identity);
    }
    (NodeBuilder::new().data(data), childs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (VnTree, NodeId, NodeId) {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        tree.set_identity(root, "r").unwrap();
        let a = tree
            .insert(root, NodeBuilder::named("a").identity("a").with("size", 3))
            .unwrap();
        let a1 = tree
            .insert(a, NodeBuilder::named("a1").identity("a1"))
            .unwrap();
        tree.insert(root, NodeBuilder::named("b").identity("b"))
            .unwrap();
        (tree, a, a1)
    }

    #[test]
    fn test_document_shape() {
        let (tree, a, _) = sample();
        let document = tree.to_document(a).unwrap();
        assert_eq!(
            serde_json::to_string(&document).unwrap(),
            r#"{"_id":"a","name":"a","size":3,"parent":"r","childs":["a1"]}"#
        );
        let root_doc = tree.to_document(tree.root()).unwrap();
        assert_eq!(root_doc.get("parent"), Some(&Value::Null));
    }

    #[test]
    fn test_insert_and_rebuild() {
        let (tree, _, _) = sample();
        let mut store = MemoryDocumentStore::new();
        tree.db_insert(&mut store, tree.root(), true).unwrap();
        assert_eq!(store.len(), 4);
        // Inserting again collides on every _id
        assert!(tree.db_insert(&mut store, tree.root(), true).is_err());

        let copy = VnTree::from_documents(&store, "r").unwrap();
        assert_eq!(copy.identities(), tree.identities());
        let root = copy.root();
        let a = copy.get_node_by_path(root, "/top/a").unwrap();
        assert_eq!(copy.get_data(a, &["size"]), Some(Value::Int(3)));
    }

    #[test]
    fn test_update_and_delete() {
        let (mut tree, a, _) = sample();
        let mut store = MemoryDocumentStore::new();
        tree.db_update(&mut store, a, false).unwrap();
        assert_eq!(store.len(), 1);

        tree.set_data(a, &["size"], 4).unwrap();
        tree.db_update(&mut store, a, true).unwrap();
        assert_eq!(store.len(), 2);
        let stored = store.find_one(&by_id("a")).unwrap().unwrap();
        assert_eq!(stored.get("size"), Some(&Value::Int(4)));

        assert_eq!(tree.db_delete(&mut store, a, true).unwrap(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_does_not_clobber() {
        let (mut tree, a, _) = sample();
        let mut store = MemoryDocumentStore::new();
        let mut document = tree.to_document(a).unwrap();
        document.insert("size".into(), Value::Int(99));
        document.insert("extra".into(), Value::from("kept"));
        store.insert_one(document).unwrap();

        assert!(tree.db_load(&store, a).unwrap());
        assert_eq!(tree.get_data(a, &["size"]), Some(Value::Int(3)));
        assert_eq!(tree.get_data(a, &["extra"]), Some(Value::from("kept")));
        let b = tree.get_node_by_path(tree.root(), "b").unwrap();
        assert!(!tree.db_load(&store, b).unwrap());
    }
}
