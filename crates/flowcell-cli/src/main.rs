use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

use flowcell_core::impls::FailInto;
use flowcell_core::ports::DataPublisher;
use flowcell_core::{Action, ActionError, DataFlow, ErrorRecord, FlowConfig, UiEvent, UiState};

#[derive(Debug, Clone, PartialEq)]
enum Screen {
    Empty,
    Loading,
    Ready(Vec<String>),
    Failed(String),
}

impl UiState for Screen {
    fn is_failed(&self) -> bool {
        matches!(self, Screen::Failed(_))
    }
}

#[derive(Debug, Clone)]
enum Nav {
    Toast(String),
}

impl UiEvent for Nav {}

/// 配送された state / event をそのまま表示する
struct ConsolePublisher;

#[async_trait]
impl DataPublisher<Screen, Nav> for ConsolePublisher {
    async fn publish_state(&self, state: &Screen) {
        println!("state: {state:?}");
    }

    async fn send_event(&self, event: Nav) {
        println!("event: {event:?}");
    }
}

#[derive(Debug, Deserialize)]
struct CatalogItem {
    name: String,
}

/// 遅い API のふり
async fn fetch_catalog(fail: bool) -> Result<Vec<String>, ActionError> {
    sleep(Duration::from_millis(30)).await;
    if fail {
        return Err(ActionError::msg("catalog service unavailable"));
    }
    let items: Vec<CatalogItem> =
        serde_json::from_str(r#"[{ "name": "thread" }, { "name": "loom" }]"#)
            .map_err(ActionError::from_error)?;
    Ok(items.into_iter().map(|item| item.name).collect())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// 第 1 引数に JSON の FlowConfig のパスを渡すと、それを使う
fn load_config() -> Result<FlowConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(FlowConfig {
            name: "catalog".to_string(),
            ..FlowConfig::default()
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = load_config()?;

    // (A) DataFlow を構築。回復されなかったエラーは Failed 画面にする
    let dataflow = DataFlow::<Screen, Nav>::builder(Screen::Empty)
        .config(config)
        .publisher(Arc::new(ConsolePublisher))
        .terminal_handler(Arc::new(FailInto::new(|record: &ErrorRecord, _: &Screen| {
            Screen::Failed(format!("{} failed: {}", record.unit, record.error))
        })))
        .build()?;

    // (B) Flow: loading を出してから取得結果を出す
    dataflow.start_flow(|emit, _| async move {
        emit.set_state(|_| async { Ok(Screen::Loading) });
        let items = fetch_catalog(false).await?;
        let count = items.len();
        emit.set_state(move |_| async move { Ok(Screen::Ready(items)) });
        emit.send_event(Nav::Toast(format!("loaded {count} items")));
        Ok(())
    });
    sleep(Duration::from_millis(100)).await;

    // (C) 自前の recovery を持つ Action
    dataflow.submit(
        Action::set_state(|_| async {
            let items = fetch_catalog(true).await?;
            Ok(Screen::Ready(items))
        })
        .on_error(|error, _| async move { Some(Screen::Failed(format!("retry later: {error}"))) }),
    );

    // (D) recovery なしの Action は terminal handler へ
    dataflow.set_state(|_| async { Err(ActionError::msg("session expired")) });
    dataflow.flush().await?;

    println!("final: {:?}", dataflow.state());
    println!("stats: {}", serde_json::to_string_pretty(&dataflow.stats())?);

    // (E) close して drain loop の終了を待つ
    dataflow.close();
    dataflow.wait().await?;
    Ok(())
}
