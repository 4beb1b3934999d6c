//! quanta-core
//!
//! Durable, strictly ordered delivery of telemetry tasks.
//!
//! # モジュール構成
//! - **domain**: task kinds（LogTask, UserLogTask, UserUpdateTask）、UserData、wire 形式
//! - **ports**: 抽象化レイヤー（Clock, KeyValueStore, Transport, ExperimentState）
//! - **impls**: 実装（MemoryStore, FileStore, HttpTransport, StoreExperimentState）
//! - **queue**: DeliveryQueue、処理ループ、BackoffPolicy、永続化形式
//! - **app**: Tracker と TrackerBuilder
//! - **config**: TOML + 環境変数による設定
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{Tracker, TrackerBuilder};
pub use config::QuantaConfig;
pub use domain::Task;
pub use error::{QuantaError, Result};
pub use queue::{BackoffPolicy, DeliveryQueue, QueueOptions};
