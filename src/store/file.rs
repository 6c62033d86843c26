//! JSON-file key-value store

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::StoreError;

/// Keeps each key in `<dir>/<key>.json`.
///
/// Writes land in a sibling temp file which is synced and then renamed over
/// the target, so a reader sees either the old or the new value in full.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::write(&dir.display().to_string(), e))?;
        debug!("File store opened at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, std::io::Error> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("unsupported store key: {:?}", key),
            ));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

/// Best-effort removal of a half-written temp file
async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", tmp.display(), e);
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key).map_err(|e| StoreError::read(key, e))?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::read(key, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key).map_err(|e| StoreError::write(key, e))?;
        let tmp = path.with_extension("json.tmp");

        if let Err(e) = write_synced(&tmp, value.as_bytes()).await {
            discard(&tmp).await;
            return Err(StoreError::write(key, e));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            discard(&tmp).await;
            return Err(StoreError::write(key, e));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key).map_err(|e| StoreError::write(key, e))?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::write(key, e)),
        }
    }
}
