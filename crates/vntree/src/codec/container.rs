//! Single-file binary container (MessagePack-encoded structural dictionary)

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::attr::{Attribute, FILE_PATH};
use crate::codec::{DictOptions, TreeDict};
use crate::tree::{Tree, VnTree};
use crate::value::Value;

/// Extension enforced by [`VnTree::save_file`]
pub const CONTAINER_EXTENSION: &str = "vnpkl";

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = env::current_dir().context("Failed to resolve current directory")?;
        Ok(cwd.join(path))
    }
}

pub(crate) fn encode(dict: &TreeDict) -> Result<Vec<u8>> {
    let value = rmpv::ext::to_value(dict).context("Failed to convert tree to MessagePack")?;
    let mut bytes = Vec::new();
    rmpv::encode::write_value(&mut bytes, &value).context("Failed to encode MessagePack")?;
    Ok(bytes)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut reader = bytes;
    let value = rmpv::decode::read_value(&mut reader).context("Failed to decode MessagePack")?;
    rmpv::ext::from_value(value).context("Unexpected MessagePack content")
}

impl VnTree {
    /// Save the whole tree, from the root, to a container file
    ///
    /// Without `path` the file path recorded by the last save or open is
    /// reused. With `enforce_ext` the `.vnpkl` extension is added when
    /// missing. The absolute path is recorded on the root before writing
    /// and returned.
    pub fn save_file(&mut self, path: Option<&Path>, enforce_ext: bool) -> Result<PathBuf> {
        let root = self.root();
        let mut path = match path {
            Some(path) => path.to_path_buf(),
            None => FILE_PATH
                .get(self, root)
                .as_str()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("no file path given and none recorded on the tree"))?,
        };
        if enforce_ext && path.extension().and_then(|e| e.to_str()) != Some(CONTAINER_EXTENSION) {
            let mut name = path.clone().into_os_string();
            name.push(".");
            name.push(CONTAINER_EXTENSION);
            path = PathBuf::from(name);
        }
        let path = absolute(&path)?;
        FILE_PATH.set(self, root, Value::String(path.display().to_string()))?;

        let dict = self
            .to_structural_dict(root, &DictOptions::default())
            .ok_or_else(|| anyhow!("tree has no root"))?;
        let bytes = encode(&dict)?;
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write container file {}", path.display()))?;
        debug!("saved {} nodes to {}", self.node_count(), path.display());
        Ok(path)
    }

    /// Open a container file written by [`save_file`](Self::save_file)
    ///
    /// The file path is recorded on the new root. Unreadable files are
    /// logged and yield `None`.
    pub fn open_file(path: impl AsRef<Path>) -> Option<VnTree> {
        let path = path.as_ref();
        match read_container(path) {
            Ok(tree) => Some(tree),
            Err(err) => {
                warn!("open_file: {err:#}");
                None
            }
        }
    }
}

fn read_container(path: &Path) -> Result<VnTree> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read container file {}", path.display()))?;
    let dict: TreeDict =
        decode(&bytes).with_context(|| format!("Corrupt container file {}", path.display()))?;
    let mut tree = VnTree::from_structural_dict(dict);
    let root = tree.root();
    let path = absolute(path)?;
    FILE_PATH.set(&mut tree, root, Value::String(path.display().to_string()))?;
    Ok(tree)
}
