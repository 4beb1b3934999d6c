//! TrackerBuilder - Tracker の構築とワイヤリング
//!
//! # 設計原則
//! - 設定は `QuantaConfig` から、コラボレータは差し替え可能
//! - 起動時検証（Fail-fast）：app_id が空なら build() でエラー
//! - 未指定のコラボレータは本番用の実装で埋める

use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use super::identity::{host_profile, normalize_app_id, resolve_user_id};
use super::tracker::Tracker;
use crate::config::QuantaConfig;
use crate::domain::DeliveryContext;
use crate::error::{QuantaError, Result};
use crate::impls::{FileStore, HttpTransport, StoreExperimentState};
use crate::ports::{Clock, ExperimentState, KeyValueStore, SystemClock, Transport};
use crate::queue::{DeliveryQueue, QueueOptions};

/// # 使用例
/// ```ignore
/// let tracker = TrackerBuilder::from_config(&config)
///     .store(Arc::new(MemoryStore::new()))
///     .build()
///     .await?;
/// tracker.launch().await;
/// ```
pub struct TrackerBuilder {
    app_id: String,
    user_id: Option<String>,
    endpoint: Url,
    storage_dir: PathBuf,
    send_launch_event: bool,
    options: QueueOptions,
    bundle_id: Option<String>,
    app_version: Option<String>,
    store: Option<Arc<dyn KeyValueStore>>,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    experiments: Option<Arc<dyn ExperimentState>>,
}

impl TrackerBuilder {
    pub fn new(app_id: impl Into<String>) -> Self {
        let config = QuantaConfig {
            app_id: app_id.into(),
            ..Default::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &QuantaConfig) -> Self {
        Self {
            app_id: config.app_id.clone(),
            user_id: config.user_id.clone(),
            endpoint: config.endpoint.clone(),
            storage_dir: config.storage_dir.clone(),
            send_launch_event: config.send_launch_event,
            options: config.queue.to_options(),
            bundle_id: None,
            app_version: None,
            store: None,
            transport: None,
            clock: None,
            experiments: None,
        }
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn send_launch_event(mut self, enabled: bool) -> Self {
        self.send_launch_event = enabled;
        self
    }

    pub fn options(mut self, options: QueueOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the reported bundle id (truncated to 50 characters on the wire).
    pub fn bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.bundle_id = Some(bundle_id.into());
        self
    }

    /// Override the reported app version (truncated to 50 characters on the wire).
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn experiments(mut self, experiments: Arc<dyn ExperimentState>) -> Self {
        self.experiments = Some(experiments);
        self
    }

    /// Wire everything up and hydrate the queue.
    ///
    /// # 検証
    /// - app_id が空なら `QuantaError::InvalidConfig`
    /// - store / user id の読み書きに失敗したらそのエラーを返す
    pub async fn build(self) -> Result<Tracker> {
        if self.app_id.trim().is_empty() {
            return Err(QuantaError::InvalidConfig("app_id must be set".to_string()));
        }

        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FileStore::open(&self.storage_dir).await?),
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let experiments = self
            .experiments
            .unwrap_or_else(|| Arc::new(StoreExperimentState::new(Arc::clone(&store))));

        let user_id = resolve_user_id(store.as_ref(), self.user_id.as_deref()).await?;
        let mut user = host_profile(user_id, normalize_app_id(&self.app_id));
        if let Some(bundle_id) = self.bundle_id {
            user.bundle_id = bundle_id;
        }
        if let Some(version) = self.app_version {
            user.version = version;
        }

        let context = DeliveryContext::new(transport, experiments, self.endpoint);
        let queue = DeliveryQueue::open(store, Arc::clone(&clock), context, self.options).await;

        Ok(Tracker::new(queue, clock, user, self.send_launch_event))
    }
}
