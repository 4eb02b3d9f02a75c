//! StateStore - 現在状態セル
//!
//! # 設計
//! - `tokio::sync::watch` を 1 つだけ持つ（last-write-wins, 後から来た購読者に最新値を replay）
//! - 書き込み（`apply`）は crate 内部、つまり drain loop からのみ
//! - 読み込みはいつでも・どこからでも可能

use tokio::sync::watch;

use crate::domain::UiState;

pub struct StateStore<S: UiState> {
    cell: watch::Sender<S>,
}

impl<S: UiState> StateStore<S> {
    pub fn new(initial: S) -> Self {
        let (cell, _) = watch::channel(initial);
        Self { cell }
    }

    /// Last applied state (or the initial one).
    pub fn current(&self) -> S {
        self.cell.borrow().clone()
    }

    /// Receiver that immediately sees the most recently applied state.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.cell.subscribe()
    }

    /// Replace the current state. Only the drain loop calls this.
    pub(crate) fn apply(&self, state: S) {
        // 受信者がいなくても値は保持される
        self.cell.send_replace(state);
    }
}
