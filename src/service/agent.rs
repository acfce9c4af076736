use crate::config::{AppConfig, Provider};
use crate::error::{AgentError, QueryError};
use crate::models::Table;
use crate::service::gemini::GeminiAgent;
use crate::service::openai::OpenAiAgent;
use crate::service::prompt::TableContext;
use async_trait::async_trait;
use serde::Deserialize;

/// 外部推理服务：自然语言问题 + 表上下文 -> 文本答案
#[async_trait]
pub trait TableAgent: Send + Sync {
    /// 提供方名称 (日志用)
    fn name(&self) -> &str;

    async fn ask(&self, context: &TableContext, query: &str) -> Result<String, QueryError>;
}

/// 合并表的自然语言查询入口
///
/// 只做委托：单次查询的错误原样返回，由会话循环负责隔离。
pub struct AgentBridge {
    agent: Box<dyn TableAgent>,
    table: Table,
    context: TableContext,
    verbose: bool,
}

impl AgentBridge {
    pub fn new(
        agent: Box<dyn TableAgent>,
        table: Table,
        max_rows: usize,
        verbose: bool,
    ) -> Result<Self, AgentError> {
        let context = TableContext::render(&table, max_rows).map_err(|e| {
            AgentError::Construction {
                provider: "table",
                message: format!("failed to render table context: {e}"),
            }
        })?;

        tracing::info!(
            agent = agent.name(),
            rows = context.total_rows(),
            rows_in_prompt = context.rows_included(),
            "agent created"
        );
        if context.is_truncated() {
            tracing::warn!(
                rows_in_prompt = context.rows_included(),
                total_rows = context.total_rows(),
                "merged table truncated in prompt; raise AGENT_MAX_ROWS to include more rows"
            );
        }

        Ok(Self {
            agent,
            table,
            context,
            verbose,
        })
    }

    /// 按配置创建 Gemini / OpenAI agent
    pub fn from_config(config: &AppConfig, table: Table) -> Result<Self, AgentError> {
        let provider = config.agent.provider;
        let api_key = config
            .credentials
            .for_provider(provider)
            .ok_or_else(|| AgentError::Construction {
                provider: provider_label(provider),
                message: "API key not set".to_string(),
            })?;

        tracing::debug!(%provider, model = %config.agent.model, "creating agent");
        let agent: Box<dyn TableAgent> = match provider {
            Provider::Google => Box::new(GeminiAgent::new(api_key, &config.agent.model)?),
            Provider::OpenAi => Box::new(OpenAiAgent::new(api_key, &config.agent.model)?),
        };

        Self::new(agent, table, config.agent.max_rows, config.verbose)
    }

    pub async fn answer(&self, query: &str) -> Result<String, QueryError> {
        if self.verbose {
            tracing::info!(
                agent = self.agent.name(),
                prompt_chars = self.context.as_str().len(),
                query,
                "sending query to agent"
            );
        }

        let answer = self.agent.ask(&self.context, query).await?;

        if self.verbose {
            tracing::info!(agent = self.agent.name(), answer = %answer, "agent answered");
        }
        Ok(answer)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn context(&self) -> &TableContext {
        &self.context
    }
}

fn provider_label(provider: Provider) -> &'static str {
    match provider {
        Provider::Google => "gemini",
        Provider::OpenAi => "openai",
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// 提取 `{"error": {"message": ...}}` 中的错误信息，解析失败时返回原文
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
