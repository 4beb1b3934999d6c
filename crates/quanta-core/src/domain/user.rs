//! User profile carried by combined uploads.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::wire::{RECORD_SEPARATOR, safe, truncate_chars};

/// Longest bundle id / app version the collector accepts.
pub const MAX_PROFILE_FIELD: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub app_id: String,
    pub device: String,
    pub os: String,
    pub bundle_id: String,
    /// Bit set: 1 = debug build, 2 = simulator, 4 = beta distribution.
    pub debug_flags: i64,
    pub version: String,
    pub language: String,
}

impl UserData {
    /// Record-separated wire form embedded in `UserLogTask` bodies.
    pub fn to_wire(&self) -> String {
        let bundle_id = clamp_field("bundle id", &self.bundle_id);
        let version = clamp_field("app version", &self.version);

        [
            self.id.clone(),
            self.app_id.clone(),
            safe(&self.device),
            safe(&self.os),
            safe(&bundle_id),
            self.debug_flags.to_string(),
            safe(&version),
            self.language.clone(),
        ]
        .join(&RECORD_SEPARATOR.to_string())
    }
}

pub(crate) fn clamp_field(what: &str, value: &str) -> String {
    if value.chars().count() > MAX_PROFILE_FIELD {
        let truncated = truncate_chars(value, MAX_PROFILE_FIELD);
        warn!(
            field = what,
            truncated = %truncated,
            "value longer than {MAX_PROFILE_FIELD} characters will be truncated"
        );
        truncated
    } else {
        value.to_string()
    }
}
