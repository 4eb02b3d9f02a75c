//! App - アプリケーション層
//!
//! ports を組み合わせて単方向データフローを実装します。
//!
//! # 主要コンポーネント
//! - **DataFlowBuilder**: 構築とワイヤリング
//! - **DataFlow**: 公開ハンドル（submit / launch / send_event / close / wait）
//! - **Scheduler**: intake queue と drain loop
//! - **ErrorPipeline**: recovery → terminal handler
//! - **StateStore**: 現在状態のセル

pub mod builder;
pub mod dataflow;
pub mod flow;
pub(crate) mod pipeline;
pub(crate) mod scheduler;
pub mod store;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, DataFlowBuilder, FlowConfig};
pub use self::dataflow::DataFlow;
pub use self::flow::{Flow, FlowEmitter};
pub use self::store::StateStore;
