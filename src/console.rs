use crate::error::ConsoleError;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::collections::VecDeque;

/// 一次读取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D / 输入流关闭
    Eof,
}

/// 交互式输入源
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ConsoleError>;
}

/// 基于 rustyline 的终端输入 (带会话内历史)
pub struct ConsoleReader {
    editor: DefaultEditor,
}

impl ConsoleReader {
    pub fn new() -> Result<Self, ConsoleError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for ConsoleReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ConsoleError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        tracing::debug!(error = %e, "failed to record history entry");
                    }
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }
}

/// 预设输入序列，读完后返回 Eof (非交互场景 / 测试)
#[derive(Debug, Default)]
pub struct ScriptedReader {
    outcomes: VecDeque<ReadOutcome>,
    prompts: usize,
}

impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_outcomes(lines.into_iter().map(|l| ReadOutcome::Line(l.into())))
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            prompts: 0,
        }
    }

    /// 已显示的提示次数
    pub fn prompts(&self) -> usize {
        self.prompts
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome, ConsoleError> {
        self.prompts += 1;
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_reader_ends_with_eof() {
        let mut reader = ScriptedReader::new(["a", "b"]);
        assert_eq!(reader.read_line("> ").unwrap(), ReadOutcome::Line("a".into()));
        assert_eq!(reader.read_line("> ").unwrap(), ReadOutcome::Line("b".into()));
        assert_eq!(reader.read_line("> ").unwrap(), ReadOutcome::Eof);
        assert_eq!(reader.prompts(), 3);
    }
}
