//! Domain model: task kinds, the user profile, and wire helpers.
//!
//! - **task**: `Task` sum type と `Deliverable` trait
//! - **log / user_log / user_update**: 各 task kind の payload と配送処理
//! - **context**: 配送試行に必要な依存（transport, experiment state, endpoint）
//! - **user**: `UserData` とその wire 形式
//! - **wire**: 区切り文字・URL 組み立て

pub mod context;
pub mod log;
pub mod task;
pub mod user;
pub mod user_log;
pub mod user_update;
pub mod wire;

pub use self::context::DeliveryContext;
pub use self::log::LogTask;
pub use self::task::{Deliverable, Task, TaskKind};
pub use self::user::UserData;
pub use self::user_log::UserLogTask;
pub use self::user_update::UserUpdateTask;
