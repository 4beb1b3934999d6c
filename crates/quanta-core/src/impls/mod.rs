//! Impls - ports の具体的な実装
//!
//! - **MemoryStore**: テスト・開発用（非永続）
//! - **FileStore**: ディレクトリ上のファイルに永続化
//! - **HttpTransport**: reqwest による POST
//! - **StoreExperimentState**: KeyValueStore に A/B 設定を保存

pub mod file_store;
pub mod http_transport;
pub mod memory_store;
pub mod store_experiments;

pub use self::file_store::FileStore;
pub use self::http_transport::HttpTransport;
pub use self::memory_store::MemoryStore;
pub use self::store_experiments::StoreExperimentState;
