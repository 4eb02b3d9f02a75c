//! DataFlow - 単方向データフローの公開ハンドル
//!
//! submit 系 API はすべて non-blocking で、intake に積んだ時点で戻ります。

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use crate::app::builder::DataFlowBuilder;
use crate::app::flow::{Flow, FlowEmitter};
use crate::app::scheduler::{Entry, Scheduler};
use crate::app::store::StateStore;
use crate::domain::{Action, ActionError, ActionId, FlowError, FlowId, UiEvent, UiState};
use crate::observability::{SchedulerStats, StatsCounters};

/// DataFlow は 1 つの現在状態セルと、それを変更する唯一の drain loop を持つ
///
/// # 使用例
/// ```ignore
/// let dataflow = DataFlow::<Screen, Nav>::builder(Screen::Empty).build()?;
/// dataflow.set_state(|_| async { Ok(Screen::Loading) });
/// dataflow.start_flow(|emit, _| async move {
///     let items = api.load().await.map_err(ActionError::from_error)?;
///     emit.set_state(move |_| async move { Ok(Screen::Ready(items)) });
///     Ok(())
/// });
/// ```
///
/// drop すると close されます。
pub struct DataFlow<S: UiState, E: UiEvent> {
    name: Arc<str>,
    store: Arc<StateStore<S>>,
    scheduler: Scheduler<S, E>,
    stats: Arc<StatsCounters>,
}

impl<S: UiState, E: UiEvent> DataFlow<S, E> {
    pub fn builder(initial: S) -> DataFlowBuilder<S, E> {
        DataFlowBuilder::new(initial)
    }

    pub(crate) fn new(
        name: Arc<str>,
        store: Arc<StateStore<S>>,
        scheduler: Scheduler<S, E>,
        stats: Arc<StatsCounters>,
    ) -> Self {
        Self {
            name,
            store,
            scheduler,
            stats,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last applied state (or the initial one).
    pub fn state(&self) -> S {
        self.store.current()
    }

    /// Receiver that starts at the most recently applied state.
    pub fn watch(&self) -> watch::Receiver<S> {
        self.store.subscribe()
    }

    pub fn submit(&self, action: Action<S>) -> ActionId {
        let id = action.id();
        tracing::debug!(flow = %self.name, action = %id, "submit action");
        self.scheduler.submitter().submit(Entry::Action(action));
        id
    }

    /// Compute the next state from the current one.
    pub fn set_state<F, Fut>(&self, update: F) -> ActionId
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<S, ActionError>> + Send + 'static,
    {
        self.submit(Action::set_state(update))
    }

    /// Run a side effect against the current state without changing it.
    pub fn with_state<F, Fut>(&self, effect: F) -> ActionId
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        self.submit(Action::with_state(effect))
    }

    pub fn launch(&self, flow: Flow<S, E>) -> FlowId {
        let id = flow.id();
        tracing::debug!(flow = %self.name, id = %id, "submit flow");
        self.scheduler.submitter().submit(Entry::Flow(flow));
        id
    }

    pub fn start_flow<F, Fut>(&self, body: F) -> FlowId
    where
        F: FnOnce(FlowEmitter<S, E>, S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        self.launch(Flow::new(body))
    }

    pub fn send_event(&self, event: E) {
        self.scheduler.submitter().submit(Entry::Event(event));
    }

    /// Resolves once everything submitted before this call has been processed.
    ///
    /// Flow bodies started by those entries may still be running.
    pub async fn flush(&self) -> Result<(), FlowError> {
        let (tx, rx) = oneshot::channel();
        self.with_state(move |_| async move {
            let _ = tx.send(());
            Ok(())
        });
        rx.await.map_err(|_| FlowError::Closed)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot()
    }

    /// Stop draining. Idempotent and irreversible.
    pub fn close(&self) {
        self.scheduler.close();
    }

    pub fn is_closed(&self) -> bool {
        self.scheduler.is_closed()
    }

    /// Wait for the drain loop to stop and return why it stopped.
    ///
    /// `Ok(())` after `close()`; the escalated failure if the terminal handler re-raised.
    pub async fn wait(&self) -> Result<(), FlowError> {
        self.scheduler.wait().await
    }
}
