use crate::models::TableKind;
use rustyline::error::ReadlineError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 配置错误 (启动阶段，致命)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("CSV file not found: {}", path.display())]
    MissingFile { path: PathBuf },
}

/// 单表加载错误
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{kind} file not found: {}", path.display())]
    NotFound { kind: TableKind, path: PathBuf },

    #[error("failed to load {kind} file {}: {cause}", path.display())]
    Malformed {
        kind: TableKind,
        path: PathBuf,
        cause: String,
    },
}

/// 合并时缺失的输入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSide {
    Header,
    Items,
    Both,
}

impl fmt::Display for MissingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingSide::Header => f.write_str("header"),
            MissingSide::Items => f.write_str("items"),
            MissingSide::Both => f.write_str("header and items"),
        }
    }
}

/// 表合并错误
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot merge: {side} table absent")]
    MissingInput { side: MissingSide },

    #[error(
        "merge column '{key}' not found in one of the tables \
         (header columns: {header_columns:?}, items columns: {items_columns:?})"
    )]
    MissingKey {
        key: String,
        header_columns: Vec<String>,
        items_columns: Vec<String>,
    },

    #[error("unexpected merge failure: {message}")]
    Structural { message: String },
}

/// Agent 创建失败 (致命，不重试)
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to create {provider} agent: {message}")]
    Construction {
        provider: &'static str,
        message: String,
    },
}

/// 单次查询失败 (在会话循环内恢复)
#[derive(Debug, Error)]
pub enum QueryError {
    /// 不含请求 URL
    #[error("request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} returned no answer: {reason}")]
    EmptyAnswer {
        provider: &'static str,
        reason: String,
    },
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        QueryError::Http(err.without_url())
    }
}

/// 控制台读写错误
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("readline error: {0}")]
    Readline(#[from] ReadlineError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// 进程级致命错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Console(#[from] ConsoleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_message_lists_both_column_sets() {
        let err = MergeError::MissingKey {
            key: "CHAVE DE ACESSO".into(),
            header_columns: vec!["CHAVE".into()],
            items_columns: vec!["CHAVE DE ACESSO".into(), "PRODUTO".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'CHAVE DE ACESSO'"));
        assert!(msg.contains(r#"["CHAVE"]"#));
        assert!(msg.contains(r#"["CHAVE DE ACESSO", "PRODUTO"]"#));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ConfigError::MissingFile {
            path: PathBuf::from("./nope.csv"),
        };
        assert_eq!(err.to_string(), "CSV file not found: ./nope.csv");
    }

    #[test]
    fn app_error_is_transparent() {
        let err: AppError = MergeError::MissingInput {
            side: MissingSide::Both,
        }
        .into();
        assert_eq!(err.to_string(), "cannot merge: header and items table absent");
    }
}
