use crate::error::ConfigError;
use crate::logging;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_HEADER_PATH: &str = "./202401_NFs_Cabecalho.csv";
pub const DEFAULT_ITEMS_PATH: &str = "./202401_NFs_Itens.csv";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_ROWS: usize = 500;

/// 原始环境变量 (全部按字符串读取，校验在 [`AppConfig::from_settings`] 中完成)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvSettings {
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub header_path: Option<String>,
    pub items_path: Option<String>,
    pub verbose: Option<String>,
    pub log_level: Option<String>,
    pub agent_provider: Option<String>,
    pub gemini_model: Option<String>,
    pub openai_model: Option<String>,
    pub agent_max_rows: Option<String>,
    pub csv_delimiter: Option<String>,
}

impl EnvSettings {
    /// 从进程环境变量读取
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// 从指定键值对读取 (None 时使用进程环境变量)
    pub fn from_source(source: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        ::config::Config::builder()
            .add_source(::config::Environment::default().source(source))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Configuration(e.to_string()))
    }
}

/// LLM 提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    OpenAi,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Google => f.write_str("google"),
            Provider::OpenAi => f.write_str("openai"),
        }
    }
}

/// API 密钥 (Debug 输出时脱敏)
#[derive(Clone, Default)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Credentials {
    pub fn has_any(&self) -> bool {
        self.google_api_key.is_some() || self.openai_api_key.is_some()
    }

    pub fn for_provider(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google_api_key.as_deref(),
            Provider::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("google_api_key", &mask(&self.google_api_key))
            .field("openai_api_key", &mask(&self.openai_api_key))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    pub header_path: PathBuf,
    pub items_path: PathBuf,
    pub delimiter: u8,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub provider: Provider,
    pub model: String,
    pub max_rows: usize,
}

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub data: DataConfig,
    pub agent: AgentConfig,
    pub verbose: bool,
    pub log_level: LevelFilter,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_settings(EnvSettings::from_env()?)
    }

    /// 校验顺序: 密钥 -> 表头文件 -> 明细文件 -> 其余设置
    pub fn from_settings(settings: EnvSettings) -> Result<Self, ConfigError> {
        let credentials = Credentials {
            google_api_key: non_empty(settings.google_api_key),
            openai_api_key: non_empty(settings.openai_api_key),
        };
        if !credentials.has_any() {
            return Err(ConfigError::Configuration(
                "GOOGLE_API_KEY or OPENAI_API_KEY must be set".to_string(),
            ));
        }

        let header_path = PathBuf::from(
            non_empty(settings.header_path).unwrap_or_else(|| DEFAULT_HEADER_PATH.to_string()),
        );
        let items_path = PathBuf::from(
            non_empty(settings.items_path).unwrap_or_else(|| DEFAULT_ITEMS_PATH.to_string()),
        );
        for path in [&header_path, &items_path] {
            if !path.exists() {
                return Err(ConfigError::MissingFile { path: path.clone() });
            }
        }

        let provider = resolve_provider(settings.agent_provider.as_deref(), &credentials)?;
        let model = match provider {
            Provider::Google => non_empty(settings.gemini_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            Provider::OpenAi => non_empty(settings.openai_model)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        };
        let max_rows = match non_empty(settings.agent_max_rows) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                ConfigError::Configuration(format!("AGENT_MAX_ROWS must be a number, got '{raw}'"))
            })?,
            None => DEFAULT_MAX_ROWS,
        };
        let delimiter = match settings.csv_delimiter.filter(|v| !v.is_empty()) {
            Some(raw) => parse_delimiter(&raw)?,
            None => b',',
        };

        let verbose = settings
            .verbose
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let log_level = settings
            .log_level
            .as_deref()
            .and_then(logging::parse_level)
            .unwrap_or(logging::DEFAULT_LOG_LEVEL);

        Ok(Self {
            credentials,
            data: DataConfig {
                header_path,
                items_path,
                delimiter,
            },
            agent: AgentConfig {
                provider,
                model,
                max_rows,
            },
            verbose,
            log_level,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 未显式指定时优先 Google
fn resolve_provider(raw: Option<&str>, credentials: &Credentials) -> Result<Provider, ConfigError> {
    let provider = match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => {
            if credentials.google_api_key.is_some() {
                Provider::Google
            } else {
                Provider::OpenAi
            }
        }
        Some("google") | Some("gemini") => Provider::Google,
        Some("openai") => Provider::OpenAi,
        Some(other) => {
            return Err(ConfigError::Configuration(format!(
                "AGENT_PROVIDER must be 'google' or 'openai', got '{other}'"
            )))
        }
    };

    if credentials.for_provider(provider).is_none() {
        return Err(ConfigError::Configuration(format!(
            "AGENT_PROVIDER is '{provider}' but its API key is not set"
        )));
    }
    Ok(provider)
}

fn parse_delimiter(raw: &str) -> Result<u8, ConfigError> {
    if matches!(raw, "\\t" | "tab" | "\t") {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(ConfigError::Configuration(format!(
            "CSV_DELIMITER must be a single ASCII character, got '{raw}'"
        ))),
    }
}
