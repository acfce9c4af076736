use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 会话结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// 用户输入了退出指令 (sair / exit)
    ExitCommand,
    /// Ctrl-C
    Interrupted,
    /// 输入流结束 (Ctrl-D / stdin 关闭)
    EndOfInput,
    /// 循环因未处理的错误提前退出
    Aborted,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::ExitCommand => "exit command",
            TerminationReason::Interrupted => "interrupted",
            TerminationReason::EndOfInput => "end of input",
            TerminationReason::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// 会话统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub reason: TerminationReason,
    pub answered: usize,
    pub failed: usize,
    pub started_at: DateTime<Local>,
}
