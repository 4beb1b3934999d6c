//! KeyValueStore port - 永続化スロット
//!
//! The delivery queue keeps its whole state in one slot of this store.
//! Other components (identity, experiment state) use their own keys.

use async_trait::async_trait;

use crate::error::Result;

/// Byte-oriented key-value persistence that survives process restarts.
///
/// # 設計原則
/// - `write` replaces the whole value for the key atomically
/// - `read` of a never-written key is `Ok(None)`, not an error
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn write(&self, key: &str, value: &[u8]) -> Result<()>;
}
