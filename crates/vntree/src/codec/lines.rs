//! Comma-separated line format
//!
//! Each line reads `parent-name, node-name, key=value, ...`. The first line
//! has an empty parent field and defines the root; every later parent is
//! looked up by name over the tree built so far. Values are coerced to
//! integers, then floats, else kept as strings. Lines starting with `#` are
//! comments.

use log::{debug, warn};

use crate::attr::META_NS;
use crate::tree::{NodeBuilder, NodeId, Tree, TreeTraversal, VnTree};
use crate::value::{DataMap, Value};

struct Line<'a> {
    parent: &'a str,
    name: &'a str,
    data: DataMap,
}

fn parse_line(line: &str) -> Option<Line<'_>> {
    let mut fields = line.split(',').map(str::trim);
    let parent = fields.next()?;
    let name = fields.next()?;
    let mut data = DataMap::new();
    for field in fields.filter(|f| !f.is_empty()) {
        match field.split_once('=') {
            Some((key, value)) => {
                data.insert(key.trim().to_string(), Value::coerce(value.trim()));
            }
            None => warn!("from_lines: ignoring field «{field}» without '='"),
        }
    }
    Some(Line { parent, name, data })
}

impl VnTree {
    /// Build a tree from comma-separated lines
    ///
    /// Returns `None` when there is no root line or the first line names a
    /// parent. Later lines with an empty or unknown parent are logged and
    /// skipped.
    pub fn from_lines(text: &str) -> Option<VnTree> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(number, line)| (number + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (number, first) = lines.next()?;
        let Some(root_line) = parse_line(first) else {
            warn!("from_lines: line {number}: expected «parent, name, ...»");
            return None;
        };
        if !root_line.parent.is_empty() {
            warn!(
                "from_lines: line {number}: the root line must have an empty parent, found «{}»",
                root_line.parent
            );
            return None;
        }
        let mut tree = VnTree::from_builder(NodeBuilder::named(root_line.name).data(root_line.data));
        let root = tree.root();

        for (number, line) in lines {
            let Some(Line { parent, name, data }) = parse_line(line) else {
                warn!("from_lines: line {number}: expected «parent, name, ...»; skipped");
                continue;
            };
            if parent.is_empty() {
                warn!("from_lines: line {number}: only one root is allowed; «{name}» skipped");
                continue;
            }
            let Some(parent_id) = tree.find_one_node_by_name(root, parent) else {
                warn!("from_lines: line {number}: unknown parent «{parent}»; «{name}» skipped");
                continue;
            };
            if let Err(err) = tree.insert(parent_id, NodeBuilder::named(name).data(data)) {
                warn!("from_lines: line {number}: {err}");
            }
        }
        debug!("from_lines: built {} nodes", tree.node_count());
        Some(tree)
    }

    /// Write the subtree under `id` in the comma-separated line format
    ///
    /// Only scalar values that survive the format are written; the reserved
    /// namespace is left out.
    pub fn to_lines(&self, id: NodeId) -> String {
        let mut text = String::new();
        for node in self.iter(id) {
            let parent = if node == id {
                ""
            } else {
                self.parent(node).map_or("", |p| self.name(p))
            };
            let mut fields = vec![parent.to_string(), self.name(node).to_string()];
            for (key, value) in self.data(node).into_iter().flatten() {
                if key == META_NS {
                    continue;
                }
                let rendered = match value {
                    Value::List(_) | Value::Map(_) => None,
                    scalar => Some(scalar.to_string()),
                };
                match rendered {
                    Some(v) if !v.contains([',', '\n']) && !key.contains([',', '=']) => {
                        fields.push(format!("{key}={v}"));
                    }
                    _ => debug!("to_lines: «{key}» of «{}» cannot be written", self.name(node)),
                }
            }
            text.push_str(&fields.join(", "));
            text.push('\n');
        }
        text
    }
}
