//! TerminalHandler の実装
//!
//! - **FailFast**: デフォルト。ログを出して re-raise（drain loop は止まる）
//! - **FailInto**: アプリ側の上書き。エラーを "Failed" 状態に変換する

use async_trait::async_trait;
use tracing::{error, warn};

use crate::domain::{ActionError, ErrorRecord, UiState};
use crate::ports::TerminalHandler;

/// Log the error, then re-raise it to the owner of the data flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

#[async_trait]
impl<S: UiState> TerminalHandler<S> for FailFast {
    async fn on_unrecovered(
        &self,
        record: &ErrorRecord,
        current: &S,
    ) -> Result<Option<S>, ActionError> {
        error!(
            unit = %record.unit,
            error = %record.error,
            state = ?current,
            "unrecovered error"
        );
        Err(record.error.clone())
    }
}

/// Map every unrecovered error into a terminal state instead of crashing.
///
/// # 使用例
/// ```ignore
/// let handler = FailInto::new(|record: &ErrorRecord, _: &Screen| {
///     Screen::Failed(format!("Got error {}", record.error))
/// });
/// ```
pub struct FailInto<F> {
    map: F,
}

impl<F> FailInto<F> {
    pub fn new(map: F) -> Self {
        Self { map }
    }
}

#[async_trait]
impl<S, F> TerminalHandler<S> for FailInto<F>
where
    S: UiState,
    F: Fn(&ErrorRecord, &S) -> S + Send + Sync,
{
    async fn on_unrecovered(
        &self,
        record: &ErrorRecord,
        current: &S,
    ) -> Result<Option<S>, ActionError> {
        warn!(unit = %record.unit, error = %record.error, "unrecovered error mapped to terminal state");
        Ok(Some((self.map)(record, current)))
    }
}
