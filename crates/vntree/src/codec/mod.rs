//! Conversions between a tree and its serialized forms
//!
//! The structural dictionary ([`TreeDict`]) is the canonical form; JSON,
//! the binary container and the key/value table all carry it. The markup
//! and comma-line formats are written node by node.

mod container;
pub(crate) mod dict;
mod document;
mod json;
mod lines;
mod table;
mod yaml;

pub use container::CONTAINER_EXTENSION;
pub use dict::{DictOptions, TreeDict, EMBED_KEY, RESERVED_KEYS};
pub use document::{Document, DocumentStore, MemoryDocumentStore};
pub use table::{KeyValueTable, MemoryTable, DEFAULT_TABLE, STRUCTURE_KEY};
pub use yaml::CodecRegistry;
