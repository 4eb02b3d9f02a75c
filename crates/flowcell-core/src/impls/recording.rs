//! RecordingPublisher - 受け取った値を順番どおりに記録する
//!
//! state と event を 1 本の列に記録するので、両者の相対順序も検証できます。

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{UiEvent, UiState};
use crate::ports::DataPublisher;

/// One delivered value.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded<S, E> {
    State(S),
    Event(E),
}

pub struct RecordingPublisher<S: UiState, E: UiEvent> {
    values: Mutex<Vec<Recorded<S, E>>>,
}

impl<S: UiState, E: UiEvent> RecordingPublisher<S, E> {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Recorded<S, E>>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything delivered so far, states and events interleaved.
    pub fn values(&self) -> Vec<Recorded<S, E>> {
        self.lock().clone()
    }

    pub fn states(&self) -> Vec<S> {
        self.lock()
            .iter()
            .filter_map(|value| match value {
                Recorded::State(state) => Some(state.clone()),
                Recorded::Event(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<E> {
        self.lock()
            .iter()
            .filter_map(|value| match value {
                Recorded::Event(event) => Some(event.clone()),
                Recorded::State(_) => None,
            })
            .collect()
    }

    pub fn last_state(&self) -> Option<S> {
        self.states().pop()
    }
}

impl<S: UiState, E: UiEvent> Default for RecordingPublisher<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: UiState, E: UiEvent> DataPublisher<S, E> for RecordingPublisher<S, E> {
    async fn publish_state(&self, state: &S) {
        self.lock().push(Recorded::State(state.clone()));
    }

    async fn send_event(&self, event: E) {
        self.lock().push(Recorded::Event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::fixtures::{TestEvent, TestState};

    #[tokio::test]
    async fn keeps_interleaved_order() {
        let recorder = RecordingPublisher::new();
        recorder.publish_state(&TestState::Count(1)).await;
        recorder.send_event(TestEvent::Toast("hi".into())).await;
        recorder.publish_state(&TestState::Count(2)).await;

        assert_eq!(
            recorder.values(),
            vec![
                Recorded::State(TestState::Count(1)),
                Recorded::Event(TestEvent::Toast("hi".into())),
                Recorded::State(TestState::Count(2)),
            ]
        );
        assert_eq!(recorder.states().len(), 2);
        assert_eq!(recorder.events(), vec![TestEvent::Toast("hi".into())]);
        assert_eq!(recorder.last_state(), Some(TestState::Count(2)));
    }
}
