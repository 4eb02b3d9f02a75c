//! DataFlowBuilder - DataFlow の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - serde で読み込める設定（`FlowConfig`）

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::dataflow::DataFlow;
use crate::app::scheduler::Scheduler;
use crate::app::store::StateStore;
use crate::domain::{Action, UiEvent, UiState};
use crate::impls::{FailFast, NoopPublisher};
use crate::observability::StatsCounters;
use crate::ports::{DataPublisher, TerminalHandler};

/// Plain settings of a data flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Shows up in every tracing span of this flow.
    pub name: String,
    /// Push the initial state to the publisher as the first applied state.
    pub publish_initial: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            name: "dataflow".to_string(),
            publish_initial: true,
        }
    }
}

/// BuildError は DataFlow 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("data flow name must not be empty")]
    EmptyName,

    #[error("no Tokio runtime is running; build() must be called from within one")]
    NoRuntime,
}

/// DataFlowBuilder は DataFlow を構築
///
/// # 使用例
/// ```ignore
/// let dataflow = DataFlow::<Screen, Nav>::builder(Screen::Empty)
///     .name("search")
///     .publisher(publisher.clone())
///     .terminal_handler(Arc::new(FailInto::new(|r, _| Screen::Failed(r.error.to_string()))))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - name が空なら BuildError::EmptyName
/// - Tokio runtime の外で build() したら BuildError::NoRuntime
pub struct DataFlowBuilder<S: UiState, E: UiEvent> {
    initial: S,
    config: FlowConfig,
    publisher: Option<Arc<dyn DataPublisher<S, E>>>,
    terminal: Option<Arc<dyn TerminalHandler<S>>>,
}

impl<S: UiState, E: UiEvent> DataFlowBuilder<S, E> {
    pub fn new(initial: S) -> Self {
        Self {
            initial,
            config: FlowConfig::default(),
            publisher: None,
            terminal: None,
        }
    }

    /// Replace all plain settings at once.
    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn publish_initial(mut self, publish: bool) -> Self {
        self.config.publish_initial = publish;
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn DataPublisher<S, E>>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Defaults to [`FailFast`].
    pub fn terminal_handler(mut self, handler: Arc<dyn TerminalHandler<S>>) -> Self {
        self.terminal = Some(handler);
        self
    }

    /// Validate the settings and spawn the drain loop.
    pub fn build(self) -> Result<DataFlow<S, E>, BuildError> {
        if self.config.name.trim().is_empty() {
            return Err(BuildError::EmptyName);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(BuildError::NoRuntime);
        }

        let name: Arc<str> = Arc::from(self.config.name.as_str());
        let store = Arc::new(StateStore::new(self.initial.clone()));
        let stats = Arc::new(StatsCounters::default());
        let publisher: Arc<dyn DataPublisher<S, E>> = match self.publisher {
            Some(publisher) => publisher,
            None => Arc::new(NoopPublisher),
        };
        let terminal: Arc<dyn TerminalHandler<S>> = match self.terminal {
            Some(terminal) => terminal,
            None => Arc::new(FailFast),
        };

        let scheduler = Scheduler::spawn(
            Arc::clone(&name),
            Arc::clone(&store),
            publisher,
            terminal,
            Arc::clone(&stats),
        );
        let dataflow = DataFlow::new(name, store, scheduler, stats);

        if self.config.publish_initial {
            let initial = self.initial;
            dataflow.submit(Action::set_state(move |_| async move { Ok(initial) }));
        }
        Ok(dataflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::fixtures::{TestEvent, TestState};
    use crate::impls::RecordingPublisher;

    #[test]
    fn config_defaults_apply_to_missing_fields() {
        let config: FlowConfig = serde_json::from_str(r#"{ "name": "search" }"#).unwrap();
        assert_eq!(config.name, "search");
        assert!(config.publish_initial);
        assert_eq!(FlowConfig::default().name, "dataflow");
    }

    #[tokio::test]
    async fn rejects_empty_name() {
        let result = DataFlowBuilder::<TestState, TestEvent>::new(TestState::Empty)
            .name("  ")
            .build();
        assert!(matches!(result, Err(BuildError::EmptyName)));
    }

    #[test]
    fn rejects_missing_runtime() {
        let result = DataFlowBuilder::<TestState, TestEvent>::new(TestState::Empty).build();
        assert!(matches!(result, Err(BuildError::NoRuntime)));
    }

    #[tokio::test]
    async fn publishes_initial_state_first() {
        let publisher = Arc::new(RecordingPublisher::<TestState, TestEvent>::new());
        let dataflow = DataFlowBuilder::<TestState, TestEvent>::new(TestState::Count(0))
            .publisher(publisher.clone())
            .build()
            .unwrap();
        dataflow.set_state(|_| async { Ok(TestState::Count(1)) });
        dataflow.flush().await.unwrap();

        assert_eq!(publisher.states(), vec![TestState::Count(0), TestState::Count(1)]);
    }

    #[tokio::test]
    async fn initial_publish_can_be_disabled() {
        let publisher = Arc::new(RecordingPublisher::<TestState, TestEvent>::new());
        let dataflow = DataFlowBuilder::<TestState, TestEvent>::new(TestState::Count(0))
            .config(FlowConfig {
                name: "quiet".into(),
                publish_initial: false,
            })
            .publisher(publisher.clone())
            .build()
            .unwrap();
        dataflow.flush().await.unwrap();

        assert!(publisher.states().is_empty());
        assert_eq!(dataflow.state(), TestState::Count(0));
        assert_eq!(dataflow.name(), "quiet");
    }
}
