use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, sync::Mutex};

use crate::{
    error::Error,
    pipeline::{Sink, Snapshot},
};

/// Single latest-snapshot JSON file, `{timestamp, source?, data}`.
///
/// Clones share one write lock, so the temp file has a single writer.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl SnapshotFile {
    pub fn new(path: PathBuf) -> Self {
        SnapshotFile {
            path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<Snapshot, Error> {
        let data = fs::read_to_string(&self.path).await?;
        let snapshot = serde_json::from_str(&data)?;
        Ok(snapshot)
    }

    /// Writes next to the target and renames it into place.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let data = serde_json::to_vec_pretty(snapshot)?;

        let _guard = self.lock.lock().await;
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl Sink for SnapshotFile {
    fn name(&self) -> &str {
        "cache_file"
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), Error> {
        self.write(snapshot).await.map_err(|e| {
            Error::PersistenceFailure(format!("{}: {}", self.path.display(), e))
        })
    }
}
