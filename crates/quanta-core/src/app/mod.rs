//! App - producer facade and wiring
//!
//! - **tracker**: イベント・プロフィール更新を task に変換して queue に積む
//! - **builder**: 設定とコラボレータから Tracker を組み立てる
//! - **identity**: user id の解決とホスト情報

pub mod builder;
pub mod identity;
pub mod tracker;

pub use self::builder::TrackerBuilder;
pub use self::tracker::Tracker;
