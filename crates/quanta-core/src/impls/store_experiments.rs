//! StoreExperimentState - experiment state kept in a `KeyValueStore`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::ports::{ExperimentState, KeyValueStore};

pub const AB_CONFIG_KEY: &str = "tools.quanta.ab";
pub const AB_VERSION_KEY: &str = "tools.quanta.ab.version";

/// Values are stored as raw UTF-8. Store failures are logged and
/// swallowed: experiment data is refreshed by the next successful upload.
pub struct StoreExperimentState {
    store: Arc<dyn KeyValueStore>,
}

impl StoreExperimentState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn ab_config(&self) -> Option<String> {
        self.read_string(AB_CONFIG_KEY).await
    }

    async fn read_string(&self, key: &str) -> Option<String> {
        match self.store.read(key).await {
            Ok(Some(bytes)) => String::from_utf8(bytes).ok().filter(|s| !s.is_empty()),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "failed to read experiment state");
                None
            }
        }
    }

    async fn write_string(&self, key: &str, value: &str) {
        if let Err(e) = self.store.write(key, value.as_bytes()).await {
            warn!(key, error = %e, "failed to write experiment state");
        }
    }
}

#[async_trait]
impl ExperimentState for StoreExperimentState {
    async fn ab_version(&self) -> Option<String> {
        self.read_string(AB_VERSION_KEY).await
    }

    async fn set_ab_version(&self, version: String) {
        self.write_string(AB_VERSION_KEY, &version).await;
    }

    async fn set_ab_config(&self, json: String) {
        self.write_string(AB_CONFIG_KEY, &json).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::MemoryStore;

    #[tokio::test]
    async fn version_and_config_roundtrip() {
        let store = MemoryStore::new();
        let state = StoreExperimentState::new(Arc::new(store.clone()));

        assert_eq!(state.ab_version().await, None);
        state.set_ab_version("v3".to_string()).await;
        state.set_ab_config(r#"[{"name":["exp"],"variants":[50,50]}]"#.to_string()).await;

        assert_eq!(state.ab_version().await.as_deref(), Some("v3"));
        assert!(state.ab_config().await.unwrap().contains("variants"));
        assert!(store.contains(AB_CONFIG_KEY).await);
    }
}
