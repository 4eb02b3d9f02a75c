//! Action - 単一の状態遷移 unit
//!
//! `compute(current) -> Option<new state>` と、任意の recovery 関数
//! `on_error(error, current) -> Option<replacement state>` の組です。
//!
//! # 学習ポイント
//! - `FnOnce` + `Box<dyn ...>` による type erasure
//! - `Pin<Box<dyn Future>>` で async closure を保持する

use std::future::Future;
use std::pin::Pin;

use super::errors::ActionError;
use super::ids::ActionId;
use super::state::UiState;

/// A boxed, sendable future. Bodies are spawned on the worker pool, hence `'static`.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub(crate) type ComputeFn<S> =
    Box<dyn FnOnce(S) -> BoxFuture<Result<Option<S>, ActionError>> + Send + 'static>;

/// Recovery function: receives the error and the pre-failure current state.
pub type ErrorFn<S> = Box<dyn FnOnce(ActionError, S) -> BoxFuture<Option<S>> + Send + 'static>;

pub(crate) fn boxed_error_fn<S, F, Fut>(f: F) -> ErrorFn<S>
where
    S: UiState,
    F: FnOnce(ActionError, S) -> Fut + Send + 'static,
    Fut: Future<Output = Option<S>> + Send + 'static,
{
    Box::new(move |error, state| Box::pin(f(error, state)))
}

/// Action は current state に対して実行される状態遷移
///
/// # 使用例
/// ```ignore
/// let action = Action::set_state(|_| async { Ok(Screen::Loading) })
///     .on_error(|e, _| async move { Some(Screen::Failed(e.to_string())) });
/// dataflow.submit(action);
/// ```
///
/// `compute` は submit 時ではなく drain 時点の current state を受け取ります。
pub struct Action<S: UiState> {
    id: ActionId,
    compute: ComputeFn<S>,
    on_error: Option<ErrorFn<S>>,
}

impl<S: UiState> Action<S> {
    /// General form: `Ok(Some(s))` replaces the state, `Ok(None)` leaves it untouched.
    pub fn new<F, Fut>(compute: F) -> Self
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<S>, ActionError>> + Send + 'static,
    {
        Self {
            id: ActionId::generate(),
            compute: Box::new(move |state| Box::pin(compute(state))),
            on_error: None,
        }
    }

    /// Always produces the next state.
    pub fn set_state<F, Fut>(update: F) -> Self
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<S, ActionError>> + Send + 'static,
    {
        Self::new(move |state| {
            let fut = update(state);
            async move { fut.await.map(Some) }
        })
    }

    /// Side effect only; never mutates state and never publishes.
    pub fn with_state<F, Fut>(effect: F) -> Self
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Self::new(move |state| {
            let fut = effect(state);
            async move { fut.await.map(|()| None) }
        })
    }

    /// Attach a recovery function. Returning `None` escalates to the terminal handler.
    pub fn on_error<F, Fut>(mut self, recover: F) -> Self
    where
        F: FnOnce(ActionError, S) -> Fut + Send + 'static,
        Fut: Future<Output = Option<S>> + Send + 'static,
    {
        self.on_error = Some(boxed_error_fn(recover));
        self
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }

    pub(crate) fn into_parts(self) -> (ActionId, ComputeFn<S>, Option<ErrorFn<S>>) {
        (self.id, self.compute, self.on_error)
    }
}

impl<S: UiState> std::fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("id", &format_args!("{}", self.id))
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::fixtures::TestState;

    #[tokio::test]
    async fn set_state_always_yields_a_state() {
        let action = Action::set_state(|_| async { Ok(TestState::named("ready")) });
        let (_, compute, on_error) = action.into_parts();
        assert!(on_error.is_none());

        let result = compute(TestState::Empty).await.unwrap();
        assert_eq!(result, Some(TestState::named("ready")));
    }

    #[tokio::test]
    async fn with_state_yields_nothing() {
        let action: Action<TestState> = Action::with_state(|state| async move {
            assert_eq!(state, TestState::Count(3));
            Ok(())
        });
        let (_, compute, _) = action.into_parts();
        assert_eq!(compute(TestState::Count(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn on_error_receives_error_and_state() {
        let action = Action::set_state(|_| async { Err(ActionError::msg("boom")) })
            .on_error(|error, state| async move {
                Some(TestState::Failed(format!("{error} @ {state:?}")))
            });
        assert!(action.has_error_handler());

        let (_, compute, on_error) = action.into_parts();
        let error = compute(TestState::Empty).await.unwrap_err();
        let recovered = on_error.unwrap()(error, TestState::Empty).await;
        assert_eq!(recovered, Some(TestState::Failed("boom @ Empty".into())));
    }

    #[test]
    fn debug_does_not_expose_closures() {
        let action: Action<TestState> = Action::with_state(|_| async { Ok(()) });
        let rendered = format!("{action:?}");
        assert!(rendered.contains("action-"));
        assert!(rendered.contains("on_error: false"));
    }
}
