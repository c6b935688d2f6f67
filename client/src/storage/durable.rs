use super::{KeyValueStore, Result, StorageError};
use anyhow::Context;
use std::path::Path;

/// Durable backend: one sled tree holding every key.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    const TREE: &'static str = "kv";

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create storage directory {:?}", path))?;
        let db = sled::open(path)
            .with_context(|| format!("failed to open sled database at {:?}", path))?;
        Ok(Self { db })
    }

    fn tree(&self) -> sled::Result<sled::Tree> {
        self.db.open_tree(Self::TREE)
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(raw) = self.tree()?.get(key.as_bytes())? else {
            return Ok(None);
        };
        String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|_| StorageError::Backend(format!("value under {key:?} was not valid UTF-8")))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let tree = self.tree()?;
        tree.insert(key.as_bytes(), value.as_bytes())?;
        tree.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let tree = self.tree()?;
        tree.remove(key.as_bytes())?;
        tree.flush()?;
        Ok(())
    }
}
