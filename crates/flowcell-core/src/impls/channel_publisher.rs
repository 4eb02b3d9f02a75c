//! ChannelPublisher - tokio channel ベースの配送
//!
//! # 学習ポイント
//! - `watch`: 最新値だけを保持。後から subscribe しても最新 state が見える（replay）
//! - `broadcast`: 各リスナーに 1 回ずつ配送。subscribe 前のイベントは届かない（no replay）

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::domain::{UiEvent, UiState};
use crate::ports::DataPublisher;

/// ChannelPublisher は state と event を別々のチャネルに流す
///
/// # 使用例
/// ```ignore
/// let publisher = Arc::new(ChannelPublisher::new(Screen::Empty, 64));
/// let mut states = publisher.subscribe_states();
/// let mut events = publisher.subscribe_events();
/// let dataflow = DataFlow::builder(Screen::Empty).publisher(publisher.clone()).build()?;
/// ```
///
/// `event_capacity` を超えて遅れたリスナーは `RecvError::Lagged` を受け取ります。
pub struct ChannelPublisher<S: UiState, E: UiEvent> {
    states: watch::Sender<S>,
    events: broadcast::Sender<E>,
}

impl<S: UiState, E: UiEvent> ChannelPublisher<S, E> {
    pub fn new(initial: S, event_capacity: usize) -> Self {
        let (states, _) = watch::channel(initial);
        // broadcast は capacity 0 で panic する
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { states, events }
    }

    pub fn subscribe_states(&self) -> watch::Receiver<S> {
        self.states.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<E> {
        self.events.subscribe()
    }

    pub fn latest(&self) -> S {
        self.states.borrow().clone()
    }
}

#[async_trait]
impl<S: UiState, E: UiEvent> DataPublisher<S, E> for ChannelPublisher<S, E> {
    async fn publish_state(&self, state: &S) {
        self.states.send_replace(state.clone());
    }

    async fn send_event(&self, event: E) {
        if let Err(broadcast::error::SendError(event)) = self.events.send(event) {
            trace!(event = ?event, "no event listeners, event discarded");
        }
    }
}
