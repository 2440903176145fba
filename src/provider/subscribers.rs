use std::path::PathBuf;

use tokio::{fs, sync::Mutex};
use tracing::{error, warn};

use crate::{error::Error, helpers::Status};

/// Chat ids persisted as a flat JSON list. Every read-modify-write runs
/// under one in-process lock.
#[derive(Debug)]
pub struct SubscriberStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SubscriberStore {
    pub fn new(path: PathBuf) -> Self {
        SubscriberStore {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Current subscribers, empty when the file cannot be read.
    pub async fn load(&self) -> Vec<i64> {
        let _guard = self.lock.lock().await;

        match self.read().await {
            Ok(ids) => ids,
            Err(err) => {
                warn!("{}", err);
                vec![]
            },
        }
    }

    pub async fn count(&self) -> usize {
        self.load().await.len()
    }

    pub async fn add(&self, chat_id: i64) -> bool {
        self.update(chat_id, Status::Subscribed).await
    }

    pub async fn remove(&self, chat_id: i64) -> bool {
        self.update(chat_id, Status::Unsubscribed).await
    }

    /// Applies the change idempotently; `false` only on an I/O failure.
    async fn update(&self, chat_id: i64, status: Status) -> bool {
        let _guard = self.lock.lock().await;

        let mut ids = match self.read().await {
            Ok(ids) => ids,
            Err(err) => {
                error!("chat {} not {}: {}", chat_id, status, err);
                return false;
            },
        };

        let changed = match status {
            Status::Subscribed if !ids.contains(&chat_id) => {
                ids.push(chat_id);
                true
            },
            Status::Unsubscribed if ids.contains(&chat_id) => {
                ids.retain(|id| *id != chat_id);
                true
            },
            _ => false,
        };

        if changed {
            if let Err(err) = self.write(&ids).await {
                error!("chat {} not {}: {}", chat_id, status, err);
                return false;
            }
        }

        true
    }

    async fn read(&self) -> Result<Vec<i64>, Error> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(vec![]);
            },
            Err(err) => {
                return Err(Error::SubscriberIOFailure(format!(
                    "{}: {}",
                    self.path.display(),
                    err
                )));
            },
        };

        if data.trim().is_empty() {
            return Ok(vec![]);
        }

        serde_json::from_str(&data).map_err(|err| {
            Error::SubscriberIOFailure(format!("{}: {}", self.path.display(), err))
        })
    }

    async fn write(&self, ids: &[i64]) -> Result<(), Error> {
        let failure = |err: std::io::Error| {
            Error::SubscriberIOFailure(format!("{}: {}", self.path.display(), err))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(failure)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let data = serde_json::to_vec(ids)?;

        fs::write(&tmp, data).await.map_err(failure)?;
        fs::rename(&tmp, &self.path).await.map_err(failure)?;

        Ok(())
    }
}
