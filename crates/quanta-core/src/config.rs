//! Configuration: optional TOML file + `QUANTA__*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::{QuantaError, Result};
use crate::queue::{BackoffPolicy, DEFAULT_STORAGE_KEY, QueueOptions};

pub const ENV_PREFIX: &str = "QUANTA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantaConfig {
    pub app_id: String,

    /// Fixed user id. When unset, a persisted or freshly generated id is used.
    pub user_id: Option<String>,

    /// Ingest base URL.
    pub endpoint: Url,

    /// Directory of the file-backed store.
    pub storage_dir: PathBuf,

    /// Send a `launch` event on startup.
    pub send_launch_event: bool,

    pub queue: QueueSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub storage_key: String,
    pub max_retries: u32,
    pub max_age_secs: u64,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub pause_ms: u64,
}

impl Default for QuantaConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            user_id: None,
            endpoint: default_endpoint(),
            storage_dir: PathBuf::from(".quanta"),
            send_launch_event: true,
            queue: QueueSettings::default(),
        }
    }
}

fn default_endpoint() -> Url {
    // Constant, known-good URL.
    Url::parse("https://analytics-ingress.quanta.tools").expect("default endpoint is a valid URL")
}

impl Default for QueueSettings {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_retries: policy.max_retries,
            max_age_secs: policy.max_age.as_secs(),
            base_delay_ms: policy.base_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            pause_ms: 100,
        }
    }
}

impl QueueSettings {
    pub fn to_options(&self) -> QueueOptions {
        QueueOptions {
            storage_key: self.storage_key.clone(),
            policy: BackoffPolicy {
                base_delay: Duration::from_millis(self.base_delay_ms),
                multiplier: self.multiplier,
                max_retries: self.max_retries,
                max_age: Duration::from_secs(self.max_age_secs),
            },
            pause: Duration::from_millis(self.pause_ms),
        }
    }
}

impl QuantaConfig {
    /// Load from an optional file, then environment overrides, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!(path = %path.display(), "loading config file");
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let config: QuantaConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(QuantaError::InvalidConfig("app_id must be set".to_string()));
        }
        self.queue.validate()
    }
}

impl QueueSettings {
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.is_empty() {
            return Err(QuantaError::InvalidConfig(
                "queue.storage_key must not be empty".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(QuantaError::InvalidConfig(
                "queue.max_retries must be greater than 0".to_string(),
            ));
        }
        if self.max_age_secs == 0 {
            return Err(QuantaError::InvalidConfig(
                "queue.max_age_secs must be greater than 0".to_string(),
            ));
        }
        // Written so NaN is rejected too.
        if !(self.multiplier >= 1.0) {
            return Err(QuantaError::InvalidConfig(
                "queue.multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_queue_policy() {
        let settings = QueueSettings::default();
        assert_eq!(settings.to_options(), QueueOptions::default());
    }

    #[test]
    fn app_id_is_required() {
        let err = QuantaConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("app_id"));
    }

    #[test]
    fn invalid_queue_settings_are_rejected() {
        let mut settings = QueueSettings {
            max_retries: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        settings.max_retries = 27;
        settings.multiplier = 0.5;
        assert!(settings.validate().is_err());

        settings.multiplier = f64::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn loads_toml_file_with_partial_queue_section() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
app_id = "my-app"
endpoint = "http://localhost:9000/"

[queue]
max_retries = 5
pause_ms = 0
"#
        )
        .unwrap();

        let config = QuantaConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.app_id, "my-app");
        assert_eq!(config.endpoint.as_str(), "http://localhost:9000/");
        assert_eq!(config.queue.max_retries, 5);
        assert_eq!(config.queue.pause_ms, 0);
        assert_eq!(config.queue.base_delay_ms, 500);
        assert_eq!(config.queue.storage_key, DEFAULT_STORAGE_KEY);
        assert!(config.send_launch_event);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = QuantaConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, QuantaError::Config(_)));
    }
}
