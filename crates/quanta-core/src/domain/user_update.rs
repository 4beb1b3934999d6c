//! UserUpdateTask - legacy user-profile upload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::DeliveryContext;
use super::task::Deliverable;
use super::user::UserData;
use super::wire;
use crate::ports::TransportRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUpdateTask {
    pub time: DateTime<Utc>,
    pub id: String,
    pub app_id: String,
    pub device: String,
    pub os: String,
    pub bundle_id: String,
    pub debug_flags: i64,
    pub version: String,
    pub language: String,
}

impl UserUpdateTask {
    pub fn from_user(user: &UserData, time: DateTime<Utc>) -> Self {
        Self {
            time,
            id: user.id.clone(),
            app_id: user.app_id.clone(),
            device: user.device.clone(),
            os: user.os.clone(),
            bundle_id: user.bundle_id.clone(),
            debug_flags: user.debug_flags,
            version: user.version.clone(),
            language: user.language.clone(),
        }
    }

    pub fn request(&self, ctx: &DeliveryContext) -> Option<TransportRequest> {
        let segments = [
            "u".to_string(),
            wire::timestamp(self.time),
            self.id.clone(),
            self.app_id.clone(),
            self.device.clone(),
            self.os.clone(),
            self.bundle_id.clone(),
            self.debug_flags.to_string(),
            self.version.clone(),
            self.language.clone(),
        ];
        wire::endpoint_url(ctx.endpoint(), &segments).map(TransportRequest::post)
    }
}

#[async_trait]
impl Deliverable for UserUpdateTask {
    const KIND: &'static str = "UserUpdateTask";

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
