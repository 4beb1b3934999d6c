//! LogTask - legacy single-event upload (everything in the URL path).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::DeliveryContext;
use super::task::Deliverable;
use super::wire;
use crate::ports::TransportRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTask {
    pub app_id: String,
    pub user_id: String,
    pub event: String,
    pub revenue: String,
    pub added_arguments: String,
    pub time: DateTime<Utc>,
}

impl LogTask {
    pub fn request(&self, ctx: &DeliveryContext) -> Option<TransportRequest> {
        let mut segments = vec![
            "e".to_string(),
            self.app_id.clone(),
            self.user_id.clone(),
            wire::timestamp(self.time),
            self.event.clone(),
        ];
        if self.revenue != "0" || !self.added_arguments.is_empty() {
            segments.push(self.revenue.clone());
        }
        if !self.added_arguments.is_empty() {
            segments.push(self.added_arguments.clone());
        }

        wire::endpoint_url(ctx.endpoint(), &segments).map(TransportRequest::post)
    }
}

#[async_trait]
impl Deliverable for LogTask {
    const KIND: &'static str = "LogTask";

    fn created_at(&self) -> DateTime<Utc> {
        self.time
    }

    async fn attempt_delivery(&self, ctx: &DeliveryContext) -> bool {
        let Some(request) = self.request(ctx) else {
            return false;
        };
        ctx.send(request).await.is_some_and(|r| r.is_ok())
    }
}
