//! OpenAI Chat Completions 客户端

use crate::error::{AgentError, QueryError};
use crate::service::agent::{api_error_message, TableAgent};
use crate::service::prompt::TableContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// OpenAI agent
pub struct OpenAiAgent {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiAgent {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AgentError> {
        Self::with_base_url(api_key, model, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AgentError> {
        if api_key.trim().is_empty() {
            return Err(construction("OPENAI_API_KEY is empty"));
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
}

#[async_trait]
impl TableAgent for OpenAiAgent {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn ask(&self, context: &TableContext, query: &str) -> Result<String, QueryError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: context.as_str(),
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            temperature: 0.0,
        };

        tracing::debug!(model = %self.model, "calling OpenAI chat completions");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
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

        let body: ChatResponse = response.json().await?;
        let Some(choice) = body.choices.into_iter().next() else {
            return Err(empty("no choices".to_string()));
        };

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => {
                let reason = choice
                    .message
                    .refusal
                    .map(|r| format!("refused: {r}"))
                    .or_else(|| choice.finish_reason.map(|r| format!("finish reason {r}")))
                    .unwrap_or_else(|| "empty message".to_string());
                Err(empty(reason))
            }
        }
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> TableContext {
        let mut t = Table::with_columns(["CHAVE DE ACESSO".to_string()].into_iter().collect());
        t.push_row(vec![Some("A1".into())]).unwrap();
        TableContext::render(&t, 10).unwrap()
    }

    #[tokio::test]
    async fn sends_bearer_token_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "temperature": 0.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": " 1 nota fiscal. "},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let agent = OpenAiAgent::with_base_url("sk-test", "gpt-test", &server.uri()).unwrap();
        let answer = agent.ask(&context(), "quantas notas?").await.unwrap();
        assert_eq!(answer, "1 nota fiscal.");
    }

    #[tokio::test]
    async fn server_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let agent = OpenAiAgent::with_base_url("sk-test", "gpt-test", &server.uri()).unwrap();
        match agent.ask(&context(), "?").await.unwrap_err() {
            QueryError::Api {
                provider,
                status,
                message,
            } => {
                assert_eq!(provider, "openai");
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_content_is_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "length"}]
            })))
            .mount(&server)
            .await;

        let agent = OpenAiAgent::with_base_url("sk-test", "gpt-test", &server.uri()).unwrap();
        let err = agent.ask(&context(), "?").await.unwrap_err();
        assert!(matches!(err, QueryError::EmptyAnswer { .. }));
        assert!(err.to_string().contains("length"));
    }

    #[test]
    fn empty_key_fails_construction() {
        assert!(OpenAiAgent::new("", "gpt-4o-mini").is_err());
    }
}
