//! Builds a small outline of the world, prints it and round-trips it
//! through the text formats.
//!
//! Run with `RUST_LOG=debug` to see codec logging.

use vntree::prelude::*;

const WORLD: &str = "
# parent, name, key=value...
, The World
The World, Europe
The World, Asia
Europe, Belgium, capital=Brussels, population=11515793
Europe, Portugal, capital=Lisbon, population=10295909
Asia, Japan, capital=Tokyo, population=125700000
";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut tree = VnTree::from_lines(WORLD).ok_or_else(|| anyhow::anyhow!("cannot parse the outline"))?;
    let root = tree.root();
    let europe = tree
        .find_one_node_by_name(root, "Europe")
        .ok_or_else(|| anyhow::anyhow!("Europe is missing"))?;
    tree.insert(
        europe,
        NodeBuilder::named("Iceland")
            .with("capital", "Reykjavik")
            .with("population", 387758),
    )?;

    println!("{}", tree.to_text_tree(root, &TextTreeOptions::default().symbols(TextTreeSymbols::UNICODE)));

    let json = tree.to_json(root, None)?;
    let from_json = VnTree::from_json(&json).ok_or_else(|| anyhow::anyhow!("cannot read back JSON"))?;
    println!("json round trip similarity: {}", tree.tree_compare(&from_json, true));

    println!("{}", tree.to_lines(root));
    Ok(())
}
