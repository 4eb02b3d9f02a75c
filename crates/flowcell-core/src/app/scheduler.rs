//! Scheduler - intake queue + drain loop
//!
//! # フロー
//! 1. `Submitter::submit()` で entry を unbounded mpsc に積む（non-blocking, 複数 producer 可）
//! 2. drain loop が entry を 1 件ずつ FIFO で取り出す
//! 3. current state を読み、body を worker pool で実行して完了まで待つ
//! 4. 新しい state があれば store に apply して publish
//! 5. 失敗したら ErrorPipeline へ
//!
//! 受け付けは並行、実行は逐次。次の entry の body は、前の entry の apply が
//! 終わるまで始まりません。

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{Instrument, debug, debug_span, error, trace, warn};

use crate::app::flow::{Flow, FlowEmitter};
use crate::app::pipeline::ErrorPipeline;
use crate::app::store::StateStore;
use crate::domain::errors::panic_message;
use crate::domain::{Action, ActionError, ErrorFn, ErrorRecord, FlowError, FlowId, UiEvent, UiState};
use crate::observability::StatsCounters;
use crate::ports::{DataPublisher, TerminalHandler};

/// One intake entry. The drain loop has a single dispatch point over this enum.
pub(crate) enum Entry<S: UiState, E: UiEvent> {
    Action(Action<S>),
    Flow(Flow<S, E>),
    Event(E),
    /// A flow body failed; recover on the serialized path.
    FlowFailed {
        flow: FlowId,
        error: ActionError,
        on_error: Option<ErrorFn<S>>,
    },
}

impl<S: UiState, E: UiEvent> Entry<S, E> {
    fn label(&self) -> &'static str {
        match self {
            Entry::Action(_) => "action",
            Entry::Flow(_) => "flow",
            Entry::Event(_) => "event",
            Entry::FlowFailed { .. } => "flow_failed",
        }
    }
}

/// Cloneable intake handle.
pub(crate) struct Submitter<S: UiState, E: UiEvent> {
    intake: mpsc::UnboundedSender<Entry<S, E>>,
    closed: watch::Receiver<bool>,
    stats: Arc<StatsCounters>,
}

impl<S: UiState, E: UiEvent> Submitter<S, E> {
    /// Enqueue an entry. After close the entry is accepted and discarded.
    pub fn submit(&self, entry: Entry<S, E>) -> bool {
        if *self.closed.borrow() {
            debug!(entry = entry.label(), "data flow closed, submission dropped");
            StatsCounters::bump(&self.stats.dropped);
            return false;
        }
        match self.intake.send(entry) {
            Ok(()) => {
                StatsCounters::bump(&self.stats.submitted);
                true
            }
            Err(mpsc::error::SendError(entry)) => {
                // drain loop が既に終了している
                debug!(entry = entry.label(), "drain loop gone, submission dropped");
                StatsCounters::bump(&self.stats.dropped);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.intake.is_closed()
    }
}

impl<S: UiState, E: UiEvent> Clone for Submitter<S, E> {
    fn clone(&self) -> Self {
        Self {
            intake: self.intake.clone(),
            closed: self.closed.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Everything a body execution touches. Borrowed across awaits, so it stays `Sync`.
struct Executor<S: UiState, E: UiEvent> {
    name: Arc<str>,
    submitter: Submitter<S, E>,
    store: Arc<StateStore<S>>,
    publisher: Arc<dyn DataPublisher<S, E>>,
    pipeline: ErrorPipeline<S>,
    stats: Arc<StatsCounters>,
}

impl<S: UiState, E: UiEvent> Executor<S, E> {
    async fn run_action(&self, action: Action<S>) -> Result<(), FlowError> {
        let (id, compute, on_error) = action.into_parts();
        let span = debug_span!("action", flow = %self.name, id = %id);

        async {
            let current = self.store.current();

            // body は worker pool 上で実行。panic は JoinError として戻ってくる
            let body = tokio::spawn(async move { compute(current).await }.in_current_span());
            let result = body.await.unwrap_or_else(|err| Err(ActionError::from_join(err)));

            match result {
                Ok(Some(state)) => {
                    self.apply(state).await;
                    Ok(())
                }
                Ok(None) => {
                    trace!("no state change");
                    Ok(())
                }
                Err(error) => self.recover(ErrorRecord::new(id, error), on_error).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn send_event(&self, event: E) {
        trace!(flow = %self.name, event = ?event, "send event");
        self.publisher.send_event(event).await;
    }

    async fn recover(
        &self,
        record: ErrorRecord,
        on_error: Option<ErrorFn<S>>,
    ) -> Result<(), FlowError> {
        let current = self.store.current();
        let recovery = self.pipeline.handle(record, on_error, current).await?;
        if let Some(state) = recovery.into_state() {
            self.apply(state).await;
        }
        Ok(())
    }

    async fn apply(&self, state: S) {
        if state.is_failed() {
            warn!(state = ?state, "applying failed state");
        } else {
            debug!(state = ?state, "apply state");
        }
        self.store.apply(state.clone());
        StatsCounters::bump(&self.stats.applied);
        self.publisher.publish_state(&state).await;
    }
}

/// The single consumer.
struct Drain<S: UiState, E: UiEvent> {
    intake: mpsc::UnboundedReceiver<Entry<S, E>>,
    shutdown: watch::Receiver<bool>,
    closed: Arc<watch::Sender<bool>>,
    flows: JoinSet<()>,
    exec: Executor<S, E>,
}

impl<S: UiState, E: UiEvent> Drain<S, E> {
    async fn run(mut self) -> Result<(), FlowError> {
        let name = Arc::clone(&self.exec.name);
        debug!(flow = %name, "drain loop started");
        let outcome = self.drain().await;

        // 以降の submit は受け付けるだけで捨てる
        self.closed.send_replace(true);
        self.flows.abort_all();

        match &outcome {
            Ok(()) => debug!(flow = %name, "drain loop stopped"),
            Err(err) => error!(flow = %name, error = %err, "drain loop halted"),
        }
        outcome
    }

    async fn drain(&mut self) -> Result<(), FlowError> {
        loop {
            if *self.shutdown.borrow() {
                return Ok(());
            }
            let entry = tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    continue;
                }
                // idle 中も終わった flow task を回収する
                Some(_) = self.flows.join_next(), if !self.flows.is_empty() => continue,
                entry = self.intake.recv() => entry,
            };
            let Some(entry) = entry else {
                return Ok(());
            };
            self.dispatch(entry).await?;
        }
    }

    async fn dispatch(&mut self, entry: Entry<S, E>) -> Result<(), FlowError> {
        let stats = &self.exec.stats;
        match entry {
            Entry::Action(action) => {
                StatsCounters::bump(&stats.actions);
                self.exec.run_action(action).await
            }
            Entry::Flow(flow) => {
                StatsCounters::bump(&stats.flows);
                self.start_flow(flow);
                Ok(())
            }
            Entry::Event(event) => {
                StatsCounters::bump(&stats.events);
                self.exec.send_event(event).await;
                Ok(())
            }
            Entry::FlowFailed {
                flow,
                error,
                on_error,
            } => {
                let span = debug_span!("flow_error", flow = %self.exec.name, id = %flow);
                self.exec
                    .recover(ErrorRecord::new(flow, error), on_error)
                    .instrument(span)
                    .await
            }
        }
    }

    fn start_flow(&mut self, flow: Flow<S, E>) {
        let (id, body, on_error) = flow.into_parts();
        let current = self.exec.store.current();
        let emitter = FlowEmitter::new(
            id,
            self.exec.submitter.clone(),
            Arc::clone(&self.exec.store),
        );
        let submitter = self.exec.submitter.clone();
        let span = debug_span!("flow", flow = %self.exec.name, id = %id);

        debug!(parent: &span, "flow started");
        self.flows.spawn(
            async move {
                let handle =
                    tokio::spawn(async move { body(emitter, current).await }.in_current_span());
                let _guard = AbortOnDrop(handle.abort_handle());
                let result = handle.await.unwrap_or_else(|err| Err(ActionError::from_join(err)));

                match result {
                    Ok(()) => debug!("flow body completed"),
                    Err(error) => {
                        warn!(error = %error, "flow body failed");
                        submitter.submit(Entry::FlowFailed {
                            flow: id,
                            error,
                            on_error,
                        });
                    }
                }
            }
            .instrument(span),
        );
    }
}

/// Build the intake, the close flag and the (not yet spawned) drain loop.
fn wire<S: UiState, E: UiEvent>(
    name: Arc<str>,
    store: Arc<StateStore<S>>,
    publisher: Arc<dyn DataPublisher<S, E>>,
    terminal: Arc<dyn TerminalHandler<S>>,
    stats: Arc<StatsCounters>,
) -> (Submitter<S, E>, Arc<watch::Sender<bool>>, Drain<S, E>) {
    let (intake_tx, intake_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = watch::channel(false);
    let closed = Arc::new(closed_tx);

    let submitter = Submitter {
        intake: intake_tx,
        closed: closed_rx.clone(),
        stats: Arc::clone(&stats),
    };
    let drain = Drain {
        intake: intake_rx,
        shutdown: closed_rx,
        closed: Arc::clone(&closed),
        flows: JoinSet::new(),
        exec: Executor {
            name,
            submitter: submitter.clone(),
            store,
            publisher,
            pipeline: ErrorPipeline::new(terminal, Arc::clone(&stats)),
            stats,
        },
    };
    (submitter, closed, drain)
}

struct DrainHandle {
    join: Option<JoinHandle<Result<(), FlowError>>>,
    outcome: Option<Result<(), FlowError>>,
}

/// Scheduler owns the drain task and its cancellation token.
pub(crate) struct Scheduler<S: UiState, E: UiEvent> {
    submitter: Submitter<S, E>,
    closed: Arc<watch::Sender<bool>>,
    drain: Mutex<DrainHandle>,
}

impl<S: UiState, E: UiEvent> Scheduler<S, E> {
    /// Spawn the drain loop on the current Tokio runtime.
    pub fn spawn(
        name: Arc<str>,
        store: Arc<StateStore<S>>,
        publisher: Arc<dyn DataPublisher<S, E>>,
        terminal: Arc<dyn TerminalHandler<S>>,
        stats: Arc<StatsCounters>,
    ) -> Self {
        let (submitter, closed, drain) = wire(name, store, publisher, terminal, stats);
        let join = tokio::spawn(drain.run());

        Self {
            submitter,
            closed,
            drain: Mutex::new(DrainHandle {
                join: Some(join),
                outcome: None,
            }),
        }
    }

    pub fn submitter(&self) -> &Submitter<S, E> {
        &self.submitter
    }

    /// Stop draining at the next entry boundary. Idempotent.
    pub fn close(&self) {
        if !self.closed.send_replace(true) {
            debug!("close requested");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.submitter.is_closed()
    }

    /// Wait for the drain loop to end. The outcome is cached for later callers.
    pub async fn wait(&self) -> Result<(), FlowError> {
        let mut drain = self.drain.lock().await;
        if let Some(outcome) = &drain.outcome {
            return outcome.clone();
        }
        let outcome = match drain.join.take() {
            Some(join) => match join.await {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => Err(FlowError::Panicked(panic_message(err.into_panic()))),
                Err(_) => Err(FlowError::Closed),
            },
            None => Err(FlowError::Closed),
        };
        self.closed.send_replace(true);
        drain.outcome = Some(outcome.clone());
        outcome
    }
}

impl<S: UiState, E: UiEvent> Drop for Scheduler<S, E> {
    fn drop(&mut self) {
        // Drain 自身も Submitter を持っているので、明示的に止めないと終わらない
        self.closed.send_replace(true);
    }
}
