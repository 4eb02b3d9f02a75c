//! DataPublisher port - 状態とイベントの配送先
//!
//! drain loop は state を store に反映した後、ここに publish します。
//! 実際にどうやって UI に届けるか（watch, broadcast, FFI など）は実装側の責務です。

use async_trait::async_trait;

use crate::domain::{UiEvent, UiState};

/// DataPublisher は applied state と event を受け取る外部コラボレータ
///
/// # 契約
/// - `publish_state`: apply された順に呼ばれる。後から来たリスナーには最新値を渡すこと
/// - `send_event`: 1 イベントにつき 1 回だけ呼ばれる。リトライはしない
///
/// どちらも drain task 上で await されます。ここでの panic は drain loop を止めます。
#[async_trait]
pub trait DataPublisher<S: UiState, E: UiEvent>: Send + Sync {
    async fn publish_state(&self, state: &S);

    async fn send_event(&self, event: E);
}
