//! 测试共用：日志捕获、mock agent、CSV 临时文件

#![allow(dead_code)]

use async_trait::async_trait;
use nf_agent_rust::error::QueryError;
use nf_agent_rust::models::Table;
use nf_agent_rust::service::{TableAgent, TableContext};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    pub fn count_message(&self, message: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message == message)
            .count()
    }

    pub fn has_event(&self, level: Level, message_contains: &str) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.level == level && e.message.contains(message_contains))
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_string();
        }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.logs.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

/// 安装当前线程的日志捕获 (guard 需存活至测试结束)
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer { logs: logs.clone() });
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// 可控的 agent：记录收到的问题，对包含 `fail_marker` 的问题返回错误
pub struct MockAgent {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_marker: Option<String>,
    pub hang_marker: Option<String>,
}

impl MockAgent {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: calls.clone(),
                fail_marker: None,
                hang_marker: None,
            },
            calls,
        )
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn hanging_on(mut self, marker: &str) -> Self {
        self.hang_marker = Some(marker.to_string());
        self
    }
}

#[async_trait]
impl TableAgent for MockAgent {
    fn name(&self) -> &str {
        "mock"
    }

    async fn ask(&self, context: &TableContext, query: &str) -> Result<String, QueryError> {
        self.calls.lock().unwrap().push(query.to_string());
        if self.hang_marker.as_deref().is_some_and(|m| query.contains(m)) {
            std::future::pending::<()>().await;
        }
        if self.fail_marker.as_deref().is_some_and(|m| query.contains(m)) {
            return Err(QueryError::Api {
                provider: "mock",
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(format!("{} linhas: {query}", context.total_rows()))
    }
}

pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

pub fn small_table() -> Table {
    let mut t = Table::with_columns(
        ["CHAVE DE ACESSO", "PRODUTO"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    );
    t.push_row(vec![Some("A1".into()), Some("X".into())]).unwrap();
    t.push_row(vec![Some("A1".into()), Some("Y".into())]).unwrap();
    t
}
