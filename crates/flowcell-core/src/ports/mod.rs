//! Ports - 抽象化レイヤー
//!
//! core の外側にいるコラボレータへのインターフェース。
//! - **DataPublisher**: state / event の配送先（UI 観測機構）
//! - **TerminalHandler**: 回復されなかったエラーの最終処理

pub mod publisher;
pub mod terminal;

pub use self::publisher::DataPublisher;
pub use self::terminal::TerminalHandler;
