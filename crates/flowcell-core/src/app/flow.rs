//! Flow - 複数の状態遷移を発行する unit
//!
//! # 実行モデル
//! 1. Flow entry は他の entry と同じく FIFO で drain される
//! 2. drain 時点の current state を snapshot として body を worker pool で起動
//! 3. body 内の `emit.set_state(...)` は通常の Action として intake に積まれる
//!    （それまでに submit された全 entry の後ろに並ぶ）
//! 4. body が失敗すると `FlowFailed` entry が intake に積まれ、
//!    Flow 自身の `on_error` で処理される（nested Action の `on_error` ではない）

use std::future::Future;
use std::sync::Arc;

use crate::app::scheduler::{Entry, Submitter};
use crate::app::store::StateStore;
use crate::domain::action::boxed_error_fn;
use crate::domain::{
    Action, ActionError, ActionId, BoxFuture, ErrorFn, FlowId, UiEvent, UiState,
};

pub(crate) type FlowBodyFn<S, E> = Box<
    dyn FnOnce(FlowEmitter<S, E>, S) -> BoxFuture<Result<(), ActionError>> + Send + 'static,
>;

/// Flow は 1 つの論理操作（"load then show result" など）
///
/// # 使用例
/// ```ignore
/// let flow = Flow::new(|emit, _state| async move {
///     emit.set_state(|_| async { Ok(Screen::Loading) });
///     let items = fetch_items().await.map_err(ActionError::from_error)?;
///     emit.set_state(move |_| async move { Ok(Screen::Ready(items)) });
///     Ok(())
/// })
/// .on_error(|e, _| async move { Some(Screen::Failed(e.to_string())) });
/// dataflow.launch(flow);
/// ```
pub struct Flow<S: UiState, E: UiEvent> {
    id: FlowId,
    body: FlowBodyFn<S, E>,
    on_error: Option<ErrorFn<S>>,
}

impl<S: UiState, E: UiEvent> Flow<S, E> {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(FlowEmitter<S, E>, S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Self {
            id: FlowId::generate(),
            body: Box::new(move |emit, state| Box::pin(body(emit, state))),
            on_error: None,
        }
    }

    /// Recovery for failures of the body itself (not of the actions it emits).
    pub fn on_error<F, Fut>(mut self, recover: F) -> Self
    where
        F: FnOnce(ActionError, S) -> Fut + Send + 'static,
        Fut: Future<Output = Option<S>> + Send + 'static,
    {
        self.on_error = Some(boxed_error_fn(recover));
        self
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub(crate) fn into_parts(self) -> (FlowId, FlowBodyFn<S, E>, Option<ErrorFn<S>>) {
        (self.id, self.body, self.on_error)
    }
}

impl<S: UiState, E: UiEvent> std::fmt::Debug for Flow<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("id", &format_args!("{}", self.id))
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// FlowEmitter は body に渡される submit 用の capability
///
/// 発行した Action は global FIFO 順に処理されます。
/// close 後の発行は黙って捨てられます。
pub struct FlowEmitter<S: UiState, E: UiEvent> {
    flow: FlowId,
    submitter: Submitter<S, E>,
    store: Arc<StateStore<S>>,
}

impl<S: UiState, E: UiEvent> FlowEmitter<S, E> {
    pub(crate) fn new(flow: FlowId, submitter: Submitter<S, E>, store: Arc<StateStore<S>>) -> Self {
        Self {
            flow,
            submitter,
            store,
        }
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow
    }

    /// Last applied state. Emitted actions may not have been applied yet.
    pub fn state(&self) -> S {
        self.store.current()
    }

    pub fn submit(&self, action: Action<S>) -> ActionId {
        let id = action.id();
        tracing::debug!(flow_id = %self.flow, action = %id, "flow emit");
        self.submitter.submit(Entry::Action(action));
        id
    }

    pub fn set_state<F, Fut>(&self, update: F) -> ActionId
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<S, ActionError>> + Send + 'static,
    {
        self.submit(Action::set_state(update))
    }

    pub fn with_state<F, Fut>(&self, effect: F) -> ActionId
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        self.submit(Action::with_state(effect))
    }

    pub fn send_event(&self, event: E) {
        self.submitter.submit(Entry::Event(event));
    }
}

impl<S: UiState, E: UiEvent> Clone for FlowEmitter<S, E> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow,
            submitter: self.submitter.clone(),
            store: Arc::clone(&self.store),
        }
    }
}
