//! Errors - エラー型と分類
//!
//! # 分類
//! - `ActionError`: Action / Flow の本体で発生したエラー（recovery の対象）
//! - `FlowError`: drain loop 自体が止まった理由（escalation の結果）
//! - `ErrorRecord`: 失敗した unit と error の組。ルーティングのためだけに使い、保持しない

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ids::UnitRef;

/// ActionError は unit 本体が返す（または panic から変換された）エラー
///
/// recovery 関数と terminal handler の両方に渡せるよう `Clone` です。
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    #[error("{0}")]
    Message(String),

    #[error("{0}")]
    Source(Arc<dyn std::error::Error + Send + Sync + 'static>),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("cancelled before completion")]
    Cancelled,
}

impl ActionError {
    pub fn msg(message: impl Into<String>) -> Self {
        ActionError::Message(message.into())
    }

    /// Wrap any error type, keeping it reachable through `source_error`.
    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ActionError::Source(Arc::new(error))
    }

    pub fn source_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ActionError::Source(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }

    /// Convert a failed `JoinHandle` result of a worker-pool body.
    pub(crate) fn from_join(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            ActionError::Panicked(panic_message(error.into_panic()))
        } else {
            ActionError::Cancelled
        }
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        ActionError::Message(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        ActionError::Message(message.to_string())
    }
}

/// FlowError は drain loop が止まった理由
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// The terminal handler re-raised an unrecovered error.
    #[error("unrecovered error in {unit}: {error}")]
    Unrecovered { unit: UnitRef, error: ActionError },

    /// A recovery function, terminal handler or publisher panicked on the drain task.
    #[error("drain loop panicked: {0}")]
    Panicked(String),

    #[error("data flow is closed")]
    Closed,
}

/// ErrorRecord は失敗した unit と発生したエラー
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub unit: UnitRef,
    pub error: ActionError,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(unit: impl Into<UnitRef>, error: ActionError) -> Self {
        Self {
            unit: unit.into(),
            error,
            occurred_at: Utc::now(),
        }
    }

    pub(crate) fn into_flow_error(self) -> FlowError {
        FlowError::Unrecovered {
            unit: self.unit,
            error: self.error,
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::ActionId;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn wrapped_error_keeps_message_and_source() {
        let error = ActionError::from_error(DiskFull);
        assert_eq!(error.to_string(), "disk full");
        assert!(error.source_error().is_some());
        assert!(ActionError::msg("nope").source_error().is_none());
    }

    #[test]
    fn unrecovered_error_names_the_unit() {
        let id = ActionId::generate();
        let error = ErrorRecord::new(id, "boom".into()).into_flow_error();
        let message = error.to_string();
        assert!(message.contains(&id.to_string()));
        assert!(message.contains("boom"));
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42_u8)), "non-string panic payload");
    }

    #[tokio::test]
    async fn join_panic_becomes_panicked_error() {
        let handle = tokio::spawn(async { panic!("inside body") });
        let error = ActionError::from_join(handle.await.unwrap_err());
        assert!(matches!(error, ActionError::Panicked(ref m) if m == "inside body"));
    }
}
