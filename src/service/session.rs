use crate::console::{LineReader, ReadOutcome};
use crate::error::{ConsoleError, QueryError};
use crate::models::{SessionSummary, TerminationReason};
use crate::service::agent::AgentBridge;
use chrono::Local;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;

pub const PROMPT: &str = "Pergunta (ou 'sair' para encerrar): ";

/// 查询失败时展示给用户的固定提示 (不含诊断信息)
pub const FAILURE_MESSAGE: &str = "Ocorreu um erro ao processar sua pergunta. Tente novamente.";

/// 退出指令 (忽略大小写)
pub const EXIT_TOKENS: [&str; 2] = ["sair", "exit"];

pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    EXIT_TOKENS.iter().any(|t| input.eq_ignore_ascii_case(t))
}

/// 单次查询的结果
#[derive(Debug)]
pub enum QueryOutcome {
    Answered(String),
    Failed(QueryError),
    Interrupted,
}

/// 会话结束日志，每个会话只输出一次
///
/// 启动阶段失败 (循环未开始) 时由调用方传入 None。
pub fn log_session_end(summary: Option<&SessionSummary>) {
    match summary {
        Some(s) => {
            let elapsed = Local::now().signed_duration_since(s.started_at);
            tracing::info!(
                reason = %s.reason,
                answered = s.answered,
                failed = s.failed,
                elapsed_secs = elapsed.num_seconds(),
                "application finished"
            );
        }
        None => tracing::info!("application finished"),
    }
}

/// 在 drop 时执行收尾，覆盖提前返回的错误路径
struct SessionGuard {
    summary: SessionSummary,
}

impl SessionGuard {
    fn new() -> Self {
        Self {
            summary: SessionSummary {
                reason: TerminationReason::Aborted,
                answered: 0,
                failed: 0,
                started_at: Local::now(),
            },
        }
    }

    fn finish(&mut self, reason: TerminationReason) -> SessionSummary {
        self.summary.reason = reason;
        self.summary.clone()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        log_session_end(Some(&self.summary));
    }
}

/// 交互式查询循环: Running -> Terminated
pub struct QueryLoop<'a> {
    bridge: &'a AgentBridge,
}

impl<'a> QueryLoop<'a> {
    pub fn new(bridge: &'a AgentBridge) -> Self {
        Self { bridge }
    }

    /// 运行直到退出指令、中断或输入结束
    ///
    /// `interrupt` 完成即视为中断信号；正在进行的 agent 调用会被丢弃。
    pub async fn run<R, W, F>(
        &self,
        reader: &mut R,
        out: &mut W,
        interrupt: F,
    ) -> Result<SessionSummary, ConsoleError>
    where
        R: LineReader,
        W: Write,
        F: Future<Output = ()>,
    {
        let mut guard = SessionGuard::new();
        tokio::pin!(interrupt);

        loop {
            // 首次轮询即注册信号处理；读取前后各检查一次
            if fired(interrupt.as_mut()).await {
                tracing::info!("interaction interrupted by user");
                return Ok(guard.finish(TerminationReason::Interrupted));
            }
            let outcome = reader.read_line(PROMPT)?;
            if fired(interrupt.as_mut()).await {
                tracing::info!("interaction interrupted by user");
                return Ok(guard.finish(TerminationReason::Interrupted));
            }

            let line = match outcome {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => {
                    tracing::info!("interaction interrupted by user");
                    return Ok(guard.finish(TerminationReason::Interrupted));
                }
                ReadOutcome::Eof => {
                    tracing::info!("input closed, ending session");
                    return Ok(guard.finish(TerminationReason::EndOfInput));
                }
            };

            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if is_exit_command(query) {
                tracing::info!("ending session at user request");
                return Ok(guard.finish(TerminationReason::ExitCommand));
            }

            match self.ask(query, interrupt.as_mut()).await {
                QueryOutcome::Answered(answer) => {
                    guard.summary.answered += 1;
                    writeln!(out, "{answer}")?;
                }
                QueryOutcome::Failed(err) => {
                    guard.summary.failed += 1;
                    tracing::error!(query, error = %err, "query execution failed");
                    writeln!(out, "{FAILURE_MESSAGE}")?;
                }
                QueryOutcome::Interrupted => {
                    tracing::info!(query, "interaction interrupted by user during query");
                    return Ok(guard.finish(TerminationReason::Interrupted));
                }
            }
            out.flush()?;
        }
    }

    /// 单次查询；失败以值返回，不会越过本次迭代
    pub async fn ask<F>(&self, query: &str, interrupt: Pin<&mut F>) -> QueryOutcome
    where
        F: Future<Output = ()>,
    {
        tracing::debug!(query, "dispatching query");
        tokio::select! {
            biased;
            _ = interrupt => QueryOutcome::Interrupted,
            result = self.bridge.answer(query) => match result {
                Ok(answer) => QueryOutcome::Answered(answer),
                Err(err) => QueryOutcome::Failed(err),
            },
        }
    }
}

/// 不等待，仅轮询一次中断信号是否已到达
async fn fired<F>(interrupt: Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = interrupt => true,
        _ = std::future::ready(()) => false,
    }
}
