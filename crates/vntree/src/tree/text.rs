//! Plain-text outline rendering

use std::fmt;

use crate::tree::{NodeId, Tree, TreeTraversal, VnTree};

/// Glyphs used by [`VnTree::to_text_tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextTreeSymbols {
    /// Marker on the starting node's line
    pub root: &'static str,
    /// Marker on every other line
    pub node: &'static str,
    /// Branch glyph for a parent's first child
    pub first: &'static str,
    /// Branch glyph for a child between the first and the last
    pub middle: &'static str,
    /// Branch glyph for a last child without children
    pub last_leaf: &'static str,
    /// Branch glyph for a last child with children
    pub last_branch: &'static str,
    pub horizontal: &'static str,
    pub vertical: &'static str,
}

impl TextTreeSymbols {
    pub const ASCII: Self = Self {
        root: "|",
        node: "|",
        first: "+",
        middle: "+",
        last_leaf: "+",
        last_branch: "+",
        horizontal: "-",
        vertical: ".",
    };

    pub const UNICODE: Self = Self {
        root: "◉",
        node: "●",
        first: "├",
        middle: "├",
        last_leaf: "└",
        last_branch: "└",
        horizontal: "─",
        vertical: "│",
    };
}

impl Default for TextTreeSymbols {
    fn default() -> Self {
        Self::ASCII
    }
}

/// Per-node text appended after the line prefix
#[derive(Clone, Copy, Default)]
pub enum NameFormat<'a> {
    /// A space, then the node's name
    #[default]
    Name,
    /// Structure only
    Hidden,
    /// Caller-supplied suffix
    Custom(&'a dyn Fn(&VnTree, NodeId) -> String),
}

impl fmt::Debug for NameFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameFormat::Name => write!(f, "Name"),
            NameFormat::Hidden => write!(f, "Hidden"),
            NameFormat::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextTreeOptions<'a> {
    /// Columns per level; values below 2 are raised to 2
    pub indent: usize,
    pub names: NameFormat<'a>,
    pub symbols: TextTreeSymbols,
}

impl Default for TextTreeOptions<'_> {
    fn default() -> Self {
        Self {
            indent: 3,
            names: NameFormat::Name,
            symbols: TextTreeSymbols::ASCII,
        }
    }
}

impl<'a> TextTreeOptions<'a> {
    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn names(mut self, names: NameFormat<'a>) -> Self {
        self.names = names;
        self
    }

    pub fn symbols(mut self, symbols: TextTreeSymbols) -> Self {
        self.symbols = symbols;
        self
    }
}

impl VnTree {
    /// Render the subtree under `id` as an indented outline, one line per
    /// visible node in forward order
    pub fn to_text_tree(&self, id: NodeId, options: &TextTreeOptions<'_>) -> String {
        let indent = options.indent.max(2);
        let symbols = &options.symbols;
        let base = self.depth(id);
        let mut text = String::new();
        for node in self.iter(id) {
            let level = self.depth(node) - base;
            if level > 0 {
                let column = format!("{}{}", symbols.vertical, " ".repeat(indent - 1));
                text.push_str(&column.repeat(level - 1));
                text.push_str(self.branch_glyph(node, symbols));
                text.push_str(&symbols.horizontal.repeat(indent - 1));
                text.push_str(symbols.node);
            } else {
                text.push_str(symbols.root);
            }
            match options.names {
                NameFormat::Name => {
                    text.push(' ');
                    text.push_str(self.name(node));
                }
                NameFormat::Hidden => {}
                NameFormat::Custom(suffix) => text.push_str(&suffix(self, node)),
            }
            text.push('\n');
        }
        text
    }

    fn branch_glyph(&self, id: NodeId, symbols: &TextTreeSymbols) -> &'static str {
        let siblings = self
            .parent(id)
            .map(|parent| self.visible_children(parent))
            .unwrap_or_default();
        if siblings.last() == Some(&id) {
            if self.visible_children(id).is_empty() {
                symbols.last_leaf
            } else {
                symbols.last_branch
            }
        } else if siblings.first() == Some(&id) {
            symbols.first
        } else {
            symbols.middle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small() -> VnTree {
        let mut tree = VnTree::new("top");
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        tree.add(a, "a1").unwrap();
        tree.add(root, "b").unwrap();
        tree
    }

    #[test]
    fn test_ascii() {
        let tree = small();
        let text = tree.to_text_tree(tree.root(), &TextTreeOptions::default());
        assert_eq!(text, "| top\n+--| a\n.  +--| a1\n+--| b\n");
    }

    #[test]
    fn test_indent_clamped() {
        let tree = small();
        let text = tree.to_text_tree(tree.root(), &TextTreeOptions::default().indent(0));
        assert_eq!(text, "| top\n+-| a\n. +-| a1\n+-| b\n");
    }

    #[test]
    fn test_hidden_names() {
        let tree = small();
        let options = TextTreeOptions::default().names(NameFormat::Hidden);
        assert_eq!(tree.to_text_tree(tree.root(), &options), "|\n+--|\n.  +--|\n+--|\n");
    }

    #[test]
    fn test_custom_names_from_subtree() {
        let tree = small();
        let suffix = |t: &VnTree, n: NodeId| format!(" <{}>", t.level(n));
        let options = TextTreeOptions::default().names(NameFormat::Custom(&suffix));
        let a = tree.children(tree.root())[0];
        assert_eq!(tree.to_text_tree(a, &options), "| <2>\n+--| <3>\n");
    }

    #[test]
    fn test_unicode() {
        let tree = small();
        let options = TextTreeOptions::default().symbols(TextTreeSymbols::UNICODE);
        insta::assert_snapshot!(tree.to_text_tree(tree.root(), &options), @r"
        ◉ top
        ├──● a
        │  └──● a1
        └──● b
        ");
    }
}
