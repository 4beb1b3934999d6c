use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuantaError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, QuantaError>;

/// Why a single persisted entry was dropped during hydration.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed slot entry #{index}: {source}")]
    MalformedEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown task kind `{0}`")]
    UnknownKind(String),

    #[error("corrupt payload for task kind `{kind}`: {source}")]
    CorruptPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}
