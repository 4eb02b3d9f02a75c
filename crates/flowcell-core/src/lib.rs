//! flowcell-core
//!
//! Unidirectional state management: submissions are accepted concurrently,
//! executed one at a time, and every applied state is published in order.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, action, errors）
//! - **ports**: 抽象化レイヤー（DataPublisher, TerminalHandler）
//! - **app**: アプリケーションロジック（builder, dataflow, flow, scheduler, pipeline, store）
//! - **impls**: 実装（ChannelPublisher, RecordingPublisher, FailFast など）
//! - **observability**: scheduler のカウンタ

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{BuildError, DataFlow, DataFlowBuilder, Flow, FlowConfig, FlowEmitter};
pub use domain::{Action, ActionError, ActionId, ErrorRecord, FlowError, FlowId, UiEvent, UiState, UnitRef};
pub use observability::SchedulerStats;
