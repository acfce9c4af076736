//! Gemini `generateContent` 客户端 (API key 模式)

use crate::error::{AgentError, QueryError};
use crate::service::agent::{api_error_message, TableAgent};
use crate::service::prompt::TableContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER: &str = "gemini";

/// API key 放在请求头，不进入 URL
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Google Gemini agent
pub struct GeminiAgent {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAgent {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AgentError> {
        Self::with_base_url(api_key, model, DEFAULT_GEMINI_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AgentError> {
        if api_key.trim().is_empty() {
            return Err(construction("GOOGLE_API_KEY is empty"));
        }
        if model.trim().is_empty() {
            return Err(construction("model name is empty"));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| construction(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TableAgent for GeminiAgent {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn ask(&self, context: &TableContext, query: &str) -> Result<String, QueryError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![RequestPart {
                    text: context.as_str(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![RequestPart { text: query }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        tracing::debug!(model = %self.model, "calling Gemini generateContent");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_answer(body)
    }
}

fn extract_answer(body: GenerateContentResponse) -> Result<String, QueryError> {
    let Some(candidate) = body.candidates.into_iter().next() else {
        let reason = body
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked ({r})"))
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(empty(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .map(|r| format!("finish reason {r}"))
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(empty(reason));
    }
    Ok(text.trim().to_string())
}

fn construction(message: impl Into<String>) -> AgentError {
    AgentError::Construction {
        provider: PROVIDER,
        message: message.into(),
    }
}

fn empty(reason: String) -> QueryError {
    QueryError::EmptyAnswer {
        provider: PROVIDER,
        reason,
    }
}
