//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ChannelPublisher**: watch（state, replay あり）+ broadcast（event, replay なし）
//! - **RecordingPublisher**: 配送された値を記録（テスト・デモ用）
//! - **NoopPublisher**: publisher 未設定時のデフォルト
//! - **FailFast / FailInto**: TerminalHandler

pub mod channel_publisher;
pub mod noop;
pub mod recording;
pub mod terminal;

pub use self::channel_publisher::ChannelPublisher;
pub use self::noop::NoopPublisher;
pub use self::recording::{Recorded, RecordingPublisher};
pub use self::terminal::{FailFast, FailInto};
