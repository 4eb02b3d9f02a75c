//! State / Event - UI に流す値の定義
//!
//! - `UiState`: ある瞬間の描画に必要なすべて。常に 1 つだけが「現在」。
//! - `UiEvent`: 一度だけ配送されるシグナル（navigate, toast など）。保存されない。

use std::fmt::Debug;

/// UiState は現在状態セルに入る不変スナップショット
///
/// # 使用例
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// enum Screen {
///     Empty,
///     Loading,
///     Ready(Vec<String>),
///     Failed(String),
/// }
///
/// impl UiState for Screen {
///     fn is_failed(&self) -> bool {
///         matches!(self, Screen::Failed(_))
///     }
/// }
/// ```
///
/// 新しい状態は古い状態を丸ごと置き換えます（部分マージはしない）。
pub trait UiState: Clone + Debug + Send + Sync + 'static {
    /// Is this the terminal "Failed" kind (an unrecovered error was mapped into it)?
    fn is_failed(&self) -> bool {
        false
    }
}

/// UiEvent は one-shot のシグナル
///
/// 後から購読したリスナーには再送されません。
pub trait UiEvent: Clone + Debug + Send + Sync + 'static {}
