// Per-install identifier, generated lazily on first use and then persisted

use crate::preferences::PreferenceStore;
use crate::{ErrorContext, Result};
use tracing::info;
use uuid::Uuid;

/// Preference key holding the install identifier
pub const KEY_UUID: &str = "key_uuid";

pub struct InstallId;

impl InstallId {
    /// Return the stored identifier, generating and storing one if absent.
    ///
    /// An empty stored value counts as absent.
    pub async fn get_or_create<S>(store: &S) -> Result<String>
    where
        S: PreferenceStore + ?Sized,
    {
        if let Some(uuid) = store.get_string(KEY_UUID).await? {
            if !uuid.is_empty() {
                return Ok(uuid);
            }
        }

        let uuid = Uuid::new_v4().to_string();
        if let Err(e) = store.put_string(KEY_UUID, &uuid).await {
            e.log_with_context(&ErrorContext::new().with_preference_key(KEY_UUID));
            return Err(e);
        }
        info!("Generated install id {}", uuid);
        Ok(uuid)
    }
}
