//! Key-value preferences persisted across app starts

use crate::{NearbyError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for platform-agnostic string preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Read a value, `None` if the key was never written
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn put_string(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory preferences, suitable for tests and ephemeral runs
#[derive(Clone, Default)]
pub struct InMemoryPreferences {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferences {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences stored as a flat JSON object in a single file.
///
/// The file is read on every access so separate instances over the same
/// path observe each other's writes. A missing file is an empty store.
pub struct FilePreferences {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                NearbyError::Storage(format!(
                    "corrupt preferences file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PreferenceStore for FilePreferences {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.get(key).cloned())
    }

    async fn put_string(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write next to the target, then rename over it
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(&values)?).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("Stored preference {} in {}", key, self.path.display());
        Ok(())
    }
}
