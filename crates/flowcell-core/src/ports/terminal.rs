//! TerminalHandler port - 最後の砦
//!
//! unit 自身の recovery が無い、または recovery が `None` を返したときに呼ばれます。

use async_trait::async_trait;

use crate::domain::{ActionError, ErrorRecord, UiState};

/// TerminalHandler は escalated error の処理方針
///
/// # 戻り値
/// - `Ok(Some(state))`: その state を通常の結果と同じように apply（"Failed" 画面など）
/// - `Ok(None)`: エラーを握りつぶし、状態は変えない
/// - `Err(error)`: re-raise。drain loop は停止し、`DataFlow::wait()` が
///   `FlowError::Unrecovered` を返す
#[async_trait]
pub trait TerminalHandler<S: UiState>: Send + Sync {
    async fn on_unrecovered(&self, record: &ErrorRecord, current: &S)
    -> Result<Option<S>, ActionError>;
}
