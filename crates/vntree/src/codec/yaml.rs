//! Flow-style markup: one tagged, anchored entry per node
//!
//! ```yaml
//! - !Node &root
//!   data: {"_vntree": {"name": "top"}}
//! - !Node &n0
//!   parent: *root
//!   data: {"_vntree": {"name": "child"}, "size": 3}
//! ```
//!
//! Entries are listed in forward order and the first one is the root. Each
//! entry starts with `- ` in the first column, and its `parent` field is an
//! alias of the parent entry's anchor. Tags map to node classes through an
//! explicit [`CodecRegistry`].

use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_yaml::Value as Yaml;
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::codec::dict::EMBED_KEY;
use crate::error::Error;
use crate::tree::{NodeBuilder, NodeClass, NodeId, Tree, TreeTraversal, TraversalOrder, VnTree};
use crate::value::{DataMap, Value};

/// Tag names for each node class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecRegistry {
    tags: IndexMap<String, NodeClass>,
}

impl CodecRegistry {
    /// A registry without any tags
    pub fn empty() -> Self {
        Self {
            tags: IndexMap::new(),
        }
    }

    /// Map `tag` to `class`; the first tag registered for a class is the one
    /// used when exporting
    pub fn register(&mut self, tag: impl Into<String>, class: NodeClass) -> &mut Self {
        self.tags.insert(tag.into(), class);
        self
    }

    pub fn class_of(&self, tag: &str) -> Option<NodeClass> {
        self.tags.get(tag.trim_start_matches('!')).copied()
    }

    pub fn tag_of(&self, class: NodeClass) -> Option<&str> {
        self.tags
            .iter()
            .find(|(_, c)| **c == class)
            .map(|(tag, _)| tag.as_str())
    }
}

impl Default for CodecRegistry {
    /// `Node` for plain nodes, `EmbedNode` for embedding nodes
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("Node", NodeClass::Plain)
            .register("EmbedNode", NodeClass::Embed);
        registry
    }
}

impl VnTree {
    /// Export the subtree under `id`, hidden children included
    pub fn to_yaml(&self, id: NodeId, registry: &CodecRegistry) -> Result<String> {
        self.get(id).ok_or(Error::UnknownNode(id))?;
        let mut anchors: HashMap<NodeId, String> = HashMap::new();
        let mut text = String::new();
        for node in self.walk_all(id, TraversalOrder::Forward) {
            let kind = self.kind(node).ok_or(Error::UnknownNode(node))?;
            let tag = registry
                .tag_of(kind.class())
                .ok_or_else(|| anyhow!("no tag registered for {:?} nodes", kind.class()))?;

            let parent = self.parent(node).filter(|_| node != id);
            let anchor = match parent {
                None => "root".to_string(),
                Some(parent) => {
                    let index = self
                        .children(parent)
                        .iter()
                        .position(|&c| c == node)
                        .unwrap_or_default();
                    match anchors.get(&parent).map(String::as_str) {
                        Some("root") | None => format!("n{index}"),
                        Some(parent_anchor) => format!("{parent_anchor}_{index}"),
                    }
                }
            };

            writeln!(text, "- !{tag} &{anchor}")?;
            if let Some(parent_anchor) = parent.and_then(|p| anchors.get(&p)) {
                writeln!(text, "  parent: *{parent_anchor}")?;
            }
            if let Some(state) = kind.embed_state() {
                let record = state.record();
                writeln!(
                    text,
                    "  {EMBED_KEY}: {{active: {}, hosted: {}}}",
                    record.active, record.hosted
                )?;
            }
            let data = self.data(node).ok_or(Error::UnknownNode(node))?;
            writeln!(text, "  data: {}", flow_map(data))?;
            anchors.insert(node, anchor);
        }
        Ok(text)
    }

    /// Import a tree from flow-style markup
    ///
    /// Unknown tags, dangling parent references and malformed entries are
    /// logged and yield `None`; an extra root entry is logged and skipped.
    pub fn from_yaml(text: &str, registry: &CodecRegistry) -> Option<VnTree> {
        match import(text, registry) {
            Ok(tree) => Some(tree),
            Err(err) => {
                warn!("from_yaml: cannot import tree: {err:#}");
                None
            }
        }
    }
}

fn import(text: &str, registry: &CodecRegistry) -> Result<VnTree> {
    let document: Yaml = serde_yaml::from_str(text).context("Failed to parse markup")?;
    let Yaml::Sequence(entries) = document else {
        bail!("markup must be a list of node entries");
    };

    let refs = scan_refs(text);
    if refs.len() != entries.len() {
        bail!(
            "found {} entry lines for {} entries; each entry must start with '- ' in the first column",
            refs.len(),
            entries.len()
        );
    }

    let mut tree: Option<VnTree> = None;
    let mut anchors: HashMap<&str, NodeId> = HashMap::new();
    for (index, (entry, refs)) in entries.iter().zip(&refs).enumerate() {
        let (class, fields) = unwrap_entry(entry, registry)
            .with_context(|| format!("entry {index}"))?;

        let parent = match fields.get("parent") {
            None | Some(Yaml::Null) => None,
            Some(Yaml::Tagged(_) | Yaml::Mapping(_)) => {
                let Some(alias) = refs.parent.as_deref() else {
                    bail!("entry {index}: parent must be an alias of an earlier entry");
                };
                match anchors.get(alias) {
                    Some(&id) => Some(id),
                    None => bail!("entry {index}: parent *{alias} is not an earlier entry"),
                }
            }
            Some(other) => {
                return Err(Error::InvalidParent(format!("{other:?}")))
                    .with_context(|| format!("entry {index}"));
            }
        };

        let builder = entry_builder(class, fields).with_context(|| format!("entry {index}"))?;
        let id = match parent {
            None if tree.is_none() => {
                let root = VnTree::from_builder(builder);
                let id = root.root();
                tree = Some(root);
                id
            }
            None => {
                warn!("from_yaml: entry {index} has no parent; only one root is allowed, skipped");
                continue;
            }
            Some(parent) => {
                let Some(tree) = tree.as_mut() else {
                    bail!("the first entry must be the root");
                };
                tree.insert(parent, builder)?
            }
        };
        if let Some(anchor) = refs.anchor.as_deref() {
            anchors.insert(anchor, id);
        }
    }
    let tree = tree.ok_or_else(|| anyhow!("markup holds no entries"))?;
    debug!("from_yaml: imported {} nodes", tree.node_count());
    Ok(tree)
}

/// Anchor and parent alias of one top-level entry
#[derive(Debug, Default, PartialEq)]
struct EntryRefs {
    anchor: Option<String>,
    parent: Option<String>,
    /// Column of the entry's keys
    indent: Option<usize>,
}

/// Read anchors and parent aliases from the entry lines
///
/// Parsed values arrive with aliases expanded, so twin entries could not be
/// told apart from the values alone.
fn scan_refs(text: &str) -> Vec<EntryRefs> {
    let mut refs: Vec<EntryRefs> = Vec::new();
    for line in text.lines() {
        let header = line
            .strip_prefix('-')
            .filter(|rest| rest.is_empty() || rest.starts_with([' ', '\t']));
        if let Some(header) = header {
            let mut entry = EntryRefs::default();
            let mut rest = header.trim_start();
            while rest.starts_with(['!', '&']) {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                if let Some(anchor) = rest[..end].strip_prefix('&') {
                    entry.anchor = Some(anchor.to_string());
                }
                rest = rest[end..].trim_start();
            }
            if !rest.is_empty() && !rest.starts_with('#') {
                entry.indent = Some(line.len() - rest.len());
                entry.parent = parent_alias(rest);
            }
            refs.push(entry);
            continue;
        }

        let Some(entry) = refs.last_mut() else {
            continue;
        };
        let content = line.trim_start();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let indent = line.len() - content.len();
        if *entry.indent.get_or_insert(indent) == indent && entry.parent.is_none() {
            entry.parent = parent_alias(content);
        }
    }
    refs
}

/// The alias name in a `parent: *name` line
fn parent_alias(line: &str) -> Option<String> {
    let alias = line.strip_prefix("parent:")?.trim_start().strip_prefix('*')?;
    let end = alias
        .find(|c: char| c.is_whitespace() || ",[]{}".contains(c))
        .unwrap_or(alias.len());
    Some(alias[..end].to_string())
}

fn unwrap_entry<'y>(
    entry: &'y Yaml,
    registry: &CodecRegistry,
) -> Result<(NodeClass, &'y serde_yaml::Mapping)> {
    let (class, value) = match entry {
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let class = registry
                .class_of(&tag)
                .ok_or_else(|| anyhow!("unregistered tag {tag}"))?;
            (class, &tagged.value)
        }
        other => (NodeClass::Plain, other),
    };
    match value {
        Yaml::Mapping(fields) => Ok((class, fields)),
        _ => bail!("node entries must be mappings"),
    }
}

fn entry_builder(class: NodeClass, fields: &serde_yaml::Mapping) -> Result<NodeBuilder> {
    let mut builder = NodeBuilder::new().class(class);
    for (key, value) in fields {
        let key = key
            .as_str()
            .ok_or_else(|| anyhow!("field names must be strings"))?;
        match key {
            "parent" => {}
            "data" => {
                let data: DataMap = match value {
                    Yaml::Null => DataMap::new(),
                    other => serde_yaml::from_value(other.clone())
                        .context("data must be a mapping with string keys")?,
                };
                builder = builder.data(data);
            }
            _ => {
                let value: Value = serde_yaml::from_value(value.clone())
                    .with_context(|| format!("unsupported value for «{key}»"))?;
                builder = builder.attribute(key, value);
            }
        }
    }
    Ok(builder)
}

/// A single-line flow mapping with double-quoted strings
fn flow_map(map: &DataMap) -> String {
    let entries: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("{}: {}", quote(key), flow_value(value)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn flow_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_nan() => ".nan".to_string(),
        Value::Float(f) if f.is_infinite() => {
            if *f > 0.0 { ".inf" } else { "-.inf" }.to_string()
        }
        Value::Float(f) => format!("{f:?}"),
        Value::String(s) => quote(s),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(flow_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => flow_map(map),
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry() {
        let registry = CodecRegistry::default();
        assert_eq!(registry.class_of("!Node"), Some(NodeClass::Plain));
        assert_eq!(registry.class_of("EmbedNode"), Some(NodeClass::Embed));
        assert_eq!(registry.tag_of(NodeClass::Embed), Some("EmbedNode"));
        assert_eq!(CodecRegistry::empty().class_of("Node"), None);
    }

    #[test]
    fn test_export_layout() {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        let a = tree
            .insert(root, NodeBuilder::named("a").identity("ida").with("x", 1.5))
            .unwrap();
        tree.insert(a, NodeBuilder::named("a1").identity("ida1")).unwrap();
        tree.set_identity(root, "idr").unwrap();

        let text = tree.to_yaml(root, &CodecRegistry::default()).unwrap();
        insta::assert_snapshot!(text, @r#"
        - !Node &root
          data: {"_vntree": {"name": "top", "_id": "idr"}}
        - !Node &n0
          parent: *root
          data: {"x": 1.5, "_vntree": {"name": "a", "_id": "ida"}}
        - !Node &n0_0
          parent: *n0
          data: {"_vntree": {"name": "a1", "_id": "ida1"}}
        "#);
    }

    #[test]
    fn test_round_trip_keeps_identities() {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        tree.add(a, "a1").unwrap();
        tree.add(root, "b").unwrap();
        let registry = CodecRegistry::default();
        let copy = VnTree::from_yaml(&tree.to_yaml(root, &registry).unwrap(), &registry).unwrap();
        assert_eq!(copy.identities(), tree.identities());
        assert_eq!(copy.path(copy.children(copy.root())[0]), "/top/a");
    }

    #[test]
    fn test_unregistered_tag() {
        let text = "- !Mystery &root\n  name: x\n";
        assert!(VnTree::from_yaml(text, &CodecRegistry::default()).is_none());
    }

    #[test]
    fn test_scalar_parent_rejected() {
        let text = "- !Node &root\n  name: x\n- !Node\n  parent: 5\n";
        assert!(VnTree::from_yaml(text, &CodecRegistry::default()).is_none());
    }

    #[test]
    fn test_twin_entries_resolved_by_anchor() {
        let text = "\
- !Node &root
  name: top
- !Node &a
  name: twin
  parent: *root
- !Node &b
  name: twin
  parent: *root
- !Node
  name: kid
  parent: *a
";
        let tree = VnTree::from_yaml(text, &CodecRegistry::default()).unwrap();
        let root = tree.root();
        let twins = tree.children(root);
        assert_eq!(twins.len(), 2);
        assert_eq!(tree.children(twins[0]).len(), 1);
        assert_eq!(tree.children(twins[1]).len(), 0);
        assert_eq!(tree.path(tree.children(twins[0])[0]), "/top/twin/kid");
    }

    #[test]
    fn test_scan_refs() {
        let text = "\
# outline
- &top !Node
  name: x
- !Node &n0
  data:
    parent: *nested
  parent: *top # comment
- parent: *n0
";
        let refs = scan_refs(text);
        let found: Vec<(Option<&str>, Option<&str>)> = refs
            .iter()
            .map(|r| (r.anchor.as_deref(), r.parent.as_deref()))
            .collect();
        assert_eq!(
            found,
            [(Some("top"), None), (Some("n0"), Some("top")), (None, Some("n0"))]
        );
    }

    #[test]
    fn test_unknown_alias_rejected() {
        // serde_yaml itself refuses an undefined alias
        let text = "- !Node &root\n  name: x\n- !Node\n  parent: *nowhere\n";
        assert!(VnTree::from_yaml(text, &CodecRegistry::default()).is_none());
    }

    #[test]
    fn test_flow_sequence_rejected() {
        let text = "[!Node {name: x}]";
        assert!(VnTree::from_yaml(text, &CodecRegistry::default()).is_none());
    }

    #[test]
    fn test_second_root_skipped() {
        let text = "- !Node &root\n  name: x\n- !Node\n  name: y\n  parent: null\n";
        let tree = VnTree::from_yaml(text, &CodecRegistry::default()).unwrap();
        assert_eq!(tree.node_count(), 1);
    }
}
