//! UserLogTask - combined user + event upload.
//!
//! The only kind whose response carries data back: the collector may answer
//! with a JSON string holding the experiment configuration, and with an
//! `X-AB-Version` header that must be echoed on later uploads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::context::DeliveryContext;
use super::task::Deliverable;
use super::wire::{self, RECORD_SEPARATOR, safe, safe_keep_unit};
use crate::ports::{TransportRequest, TransportResponse};

pub const AB_VERSION_HEADER: &str = "X-AB-Version";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLogTask {
    pub app_id: String,
    /// `UserData::to_wire()` at the time the event was logged.
    pub user_data: String,
    pub event: String,
    pub revenue: String,
    pub added_arguments: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub ab_letters: Option<String>,
}

impl UserLogTask {
    pub fn body(&self) -> String {
        let mut fields = vec![
            self.app_id.clone(),
            self.time.timestamp().to_string(),
            safe(&self.event),
            safe(&self.revenue),
            safe_keep_unit(&self.added_arguments),
            self.user_data.clone(),
        ];
        if let Some(letters) = &self.ab_letters {
            fields.push(letters.clone());
        }
        fields.join(&RECORD_SEPARATOR.to_string())
    }

    async fn apply_response(&self, ctx: &DeliveryContext, response: &TransportResponse) {
        if let Ok(config) = serde_json::from_slice::<String>(&response.body)
            && !config.is_empty()
        {
            info!(bytes = config.len(), "received experiment configuration");
            ctx.experiments().set_ab_config(config).await;
        }
        if let Some(version) = response.header(AB_VERSION_HEADER) {
            ctx.experiments().set_ab_version(version.to_string()).await;
        }
    }
}

#[async_trait]
impl Deliverable for UserLogTask {
    const KIND: &'static str = "UserLogTask";

    fn created_at(&self) -> DateTime<Utc> {
        self.time
    }

    async fn attempt_delivery(&self, ctx: &DeliveryContext) -> bool {
        let Some(url) = wire::endpoint_url(ctx.endpoint(), &["ee", ""]) else {
            return false;
        };
        let mut request = TransportRequest::post(url).with_body(self.body());
        if let Some(version) = ctx.experiments().ab_version().await {
            request = request.with_header(AB_VERSION_HEADER, version);
        }

        let Some(response) = ctx.send(request).await else {
            return false;
        };
        // Experiment data is applied even when the status says the upload failed.
        self.apply_response(ctx, &response).await;
        response.is_ok()
    }
}
