//! ErrorPipeline - 失敗を recovery か terminal handler に振り分ける
//!
//! # 状態遷移
//! - unit に `on_error` があり、`Some(state)` を返した → **Recovered**
//! - `on_error` が無い、または `None` を返した → **Escalated**（terminal handler へ）
//!
//! recovery 関数と terminal handler は drain task 上でそのまま await されます。
//! そこで panic した場合は捕まえず、drain loop ごと落とします。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{ErrorFn, ErrorRecord, FlowError, UiState};
use crate::observability::StatsCounters;
use crate::ports::TerminalHandler;

/// Result of routing one failure.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Recovery<S> {
    /// The unit's own recovery produced a replacement state.
    Recovered(S),
    /// The terminal handler ran; it may have produced a terminal state.
    Escalated(Option<S>),
}

impl<S> Recovery<S> {
    pub fn into_state(self) -> Option<S> {
        match self {
            Recovery::Recovered(state) => Some(state),
            Recovery::Escalated(state) => state,
        }
    }
}

pub(crate) struct ErrorPipeline<S: UiState> {
    terminal: Arc<dyn TerminalHandler<S>>,
    stats: Arc<StatsCounters>,
}

impl<S: UiState> ErrorPipeline<S> {
    pub fn new(terminal: Arc<dyn TerminalHandler<S>>, stats: Arc<StatsCounters>) -> Self {
        Self { terminal, stats }
    }

    /// `current` is the state before the failing unit; recovery never sees an attempted result.
    pub async fn handle(
        &self,
        record: ErrorRecord,
        on_error: Option<ErrorFn<S>>,
        current: S,
    ) -> Result<Recovery<S>, FlowError> {
        if let Some(recover) = on_error {
            if let Some(state) = recover(record.error.clone(), current.clone()).await {
                warn!(unit = %record.unit, error = %record.error, "recovered from error");
                StatsCounters::bump(&self.stats.recovered);
                return Ok(Recovery::Recovered(state));
            }
            debug!(unit = %record.unit, "recovery declined, escalating");
        }
        self.escalate(record, &current).await
    }

    async fn escalate(&self, record: ErrorRecord, current: &S) -> Result<Recovery<S>, FlowError> {
        StatsCounters::bump(&self.stats.escalated);
        warn!(unit = %record.unit, error = %record.error, "unrecovered error, escalating to terminal handler");
        match self.terminal.on_unrecovered(&record, current).await {
            Ok(replacement) => Ok(Recovery::Escalated(replacement)),
            Err(error) => Err(ErrorRecord { error, ..record }.into_flow_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::action::boxed_error_fn;
    use crate::domain::state::fixtures::TestState;
    use crate::domain::{ActionError, ActionId};
    use crate::impls::{FailFast, FailInto};

    /// Counts invocations and declines to produce a state.
    #[derive(Default)]
    struct CountingTerminal {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TerminalHandler<TestState> for CountingTerminal {
        async fn on_unrecovered(
            &self,
            record: &ErrorRecord,
            _current: &TestState,
        ) -> Result<Option<TestState>, ActionError> {
            self.seen.lock().unwrap().push(record.error.to_string());
            Ok(None)
        }
    }

    fn pipeline(
        terminal: Arc<dyn TerminalHandler<TestState>>,
    ) -> (ErrorPipeline<TestState>, Arc<StatsCounters>) {
        let stats = Arc::new(StatsCounters::default());
        (ErrorPipeline::new(terminal, Arc::clone(&stats)), stats)
    }

    fn record(message: &str) -> ErrorRecord {
        ErrorRecord::new(ActionId::generate(), ActionError::msg(message))
    }

    #[tokio::test]
    async fn own_recovery_wins() {
        let terminal = Arc::new(CountingTerminal::default());
        let (pipeline, stats) = pipeline(terminal.clone());

        let recover = boxed_error_fn(|error: ActionError, _state: TestState| async move {
            Some(TestState::Failed(format!("failed: {error}")))
        });
        let outcome = pipeline
            .handle(record("Err"), Some(recover), TestState::Empty)
            .await
            .unwrap();

        assert_eq!(outcome, Recovery::Recovered(TestState::Failed("failed: Err".into())));
        assert!(terminal.seen.lock().unwrap().is_empty());
        assert_eq!(stats.snapshot().recovered, 1);
    }

    #[tokio::test]
    async fn recovery_sees_pre_failure_state() {
        let (pipeline, _) = pipeline(Arc::new(CountingTerminal::default()));
        let recover = boxed_error_fn(|_: ActionError, state: TestState| async move { Some(state) });

        let outcome = pipeline
            .handle(record("x"), Some(recover), TestState::Count(41))
            .await
            .unwrap();
        assert_eq!(outcome.into_state(), Some(TestState::Count(41)));
    }

    #[tokio::test]
    async fn declined_recovery_escalates_once() {
        let terminal = Arc::new(CountingTerminal::default());
        let (pipeline, stats) = pipeline(terminal.clone());
        let decline = boxed_error_fn(|_: ActionError, _: TestState| async { None });

        let outcome = pipeline
            .handle(record("boom"), Some(decline), TestState::Empty)
            .await
            .unwrap();

        assert_eq!(outcome, Recovery::Escalated(None));
        assert_eq!(*terminal.seen.lock().unwrap(), vec!["boom".to_string()]);
        assert_eq!(stats.snapshot().escalated, 1);
        assert_eq!(stats.snapshot().recovered, 0);
    }

    #[tokio::test]
    async fn missing_recovery_escalates() {
        let terminal = Arc::new(CountingTerminal::default());
        let (pipeline, _) = pipeline(terminal.clone());

        pipeline.handle(record("no handler"), None, TestState::Empty).await.unwrap();
        assert_eq!(terminal.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fail_fast_reraises_with_unit() {
        let (pipeline, _) = pipeline(Arc::new(FailFast));
        let record = record("fatal");
        let unit = record.unit;

        let error = pipeline.handle(record, None, TestState::Empty).await.unwrap_err();
        match error {
            FlowError::Unrecovered { unit: failed, error } => {
                assert_eq!(failed, unit);
                assert_eq!(error.to_string(), "fatal");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fail_into_maps_to_terminal_state() {
        let handler = FailInto::new(|record: &ErrorRecord, _: &TestState| {
            TestState::Failed(format!("Got error {}", record.error))
        });
        let (pipeline, _) = pipeline(Arc::new(handler));

        let outcome = pipeline.handle(record("late"), None, TestState::Empty).await.unwrap();
        assert_eq!(outcome, Recovery::Escalated(Some(TestState::Failed("Got error late".into()))));
    }
}
