use async_trait::async_trait;

use crate::domain::{UiEvent, UiState};
use crate::ports::DataPublisher;

/// Publisher used when none is configured; the store is still readable and watchable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl<S: UiState, E: UiEvent> DataPublisher<S, E> for NoopPublisher {
    async fn publish_state(&self, _state: &S) {}

    async fn send_event(&self, event: E) {
        tracing::trace!(event = ?event, "no publisher configured, event discarded");
    }
}
