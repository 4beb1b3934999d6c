//! Ports - 外部コラボレータの抽象化
//!
//! The core consumes these traits and never a concrete network, disk or
//! timer API, so every collaborator can be replaced by a fake in tests.
//!
//! - **Clock**: 現在時刻と待機
//! - **KeyValueStore**: プロセス再起動を越える永続化
//! - **Transport**: 配送試行ごとの送信
//! - **ExperimentState**: サーバーから返る A/B 設定の書き戻し先

pub mod clock;
pub mod experiments;
pub mod store;
pub mod transport;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::experiments::ExperimentState;
pub use self::store::KeyValueStore;
pub use self::transport::{Transport, TransportRequest, TransportResponse};
