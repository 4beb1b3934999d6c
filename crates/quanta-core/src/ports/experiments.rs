//! ExperimentState port - server-issued A/B configuration.
//!
//! Some task kinds receive experiment data in their delivery response and
//! write it back here. The queue itself never touches this state.

use async_trait::async_trait;

#[async_trait]
pub trait ExperimentState: Send + Sync {
    /// Version token sent back to the collector as `X-AB-Version`.
    async fn ab_version(&self) -> Option<String>;

    async fn set_ab_version(&self, version: String);

    /// Raw experiment configuration JSON issued by the collector.
    async fn set_ab_config(&self, json: String);
}
