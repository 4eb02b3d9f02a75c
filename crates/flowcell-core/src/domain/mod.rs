//! Domain model (states, events, actions, ids, errors).
//!
//! ここは scheduler や tokio の実行モデルを知らない層です。

pub mod action;
pub mod errors;
pub mod ids;
pub mod state;

pub use self::action::{Action, BoxFuture, ErrorFn};
pub use self::errors::{ActionError, ErrorRecord, FlowError};
pub use self::ids::{ActionId, FlowId, Id, IdMarker, UnitRef};
pub use self::state::{UiEvent, UiState};
