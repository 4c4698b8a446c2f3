use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::structured::StructuredOutput;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing API key or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// True when the request was rejected for being too large for the model.
    pub fn is_context_overflow(&self) -> bool {
        match self {
            LlmError::Api { status, message } if *status == 400 || *status == 413 => {
                let message = message.to_lowercase();
                ["token", "length", "context"]
                    .iter()
                    .any(|needle| message.contains(needle))
            }
            _ => false,
        }
    }
}

/// A model that answers a prompt with a JSON object matching a schema.
#[async_trait]
pub trait StructuredLlm: Send + Sync {
    /// `Ok(None)` means the model returned nothing parseable (refusal or
    /// empty content). Callers decide whether that is fatal.
    async fn complete_json(
        &self,
        model: &str,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Option<Value>, LlmError>;
}

/// Request a typed structured response. A response that does not
/// deserialize into `T` is reported as `Ok(None)`.
pub async fn parse_structured<T: StructuredOutput>(
    llm: &dyn StructuredLlm,
    model: &str,
    prompt: &str,
) -> Result<Option<T>, LlmError> {
    let schema_name = T::type_name();
    let schema = T::openai_schema().map_err(|e| {
        LlmError::Config(format!("Failed to build schema for {}: {}", schema_name, e))
    })?;
    let Some(value) = llm
        .complete_json(model, prompt, &schema_name, schema)
        .await?
    else {
        return Ok(None);
    };

    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!(schema = %schema_name, error = %e, "Structured response did not match schema");
            Ok(None)
        }
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build from `OPENAI_API_KEY`, honouring `OPENAI_BASE_URL` when set.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Config("OPENAI_API_KEY not set".into()))?;
        let client = Self::new(api_key);

        Ok(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.is_empty() => client.with_base_url(url),
            _ => client,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StructuredLlm for OpenAiClient {
    async fn complete_json(
        &self,
        model: &str,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Option<Value>, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let start = std::time::Instant::now();

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema_name,
                    strict: true,
                    schema,
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            warn!(status = %status, error = %message, "OpenAI API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        debug!(
            model = model,
            schema = schema_name,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI structured completion"
        );

        let Some(message) = chat.choices.into_iter().next().map(|c| c.message) else {
            return Ok(None);
        };

        if let Some(refusal) = message.refusal {
            warn!(schema = schema_name, refusal = %refusal, "Model refused structured request");
            return Ok(None);
        }

        Ok(message
            .content
            .and_then(|content| serde_json::from_str(&content).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_overflow_detection() {
        let overflow = LlmError::Api {
            status: 400,
            message: "This model's maximum context length is 128000 tokens.".into(),
        };
        assert!(overflow.is_context_overflow());

        let other_bad_request = LlmError::Api {
            status: 400,
            message: "Invalid schema for response_format".into(),
        };
        assert!(!other_bad_request.is_context_overflow());

        let server_error = LlmError::Api {
            status: 500,
            message: "context deadline exceeded".into(),
        };
        assert!(!server_error.is_context_overflow());

        assert!(!LlmError::Network("token bucket empty".into()).is_context_overflow());
    }

    /// Answers with `{"citations": []}` and keeps the schema it was sent.
    struct SchemaRecorder {
        sent: std::sync::Mutex<Option<Value>>,
    }

    #[async_trait]
    impl StructuredLlm for SchemaRecorder {
        async fn complete_json(
            &self,
            _model: &str,
            _prompt: &str,
            _schema_name: &str,
            schema: Value,
        ) -> Result<Option<Value>, LlmError> {
            *self.sent.lock().unwrap() = Some(schema);
            Ok(Some(serde_json::json!({ "citations": [] })))
        }
    }

    #[tokio::test]
    async fn test_parse_structured_sends_object_schema() {
        let llm = SchemaRecorder {
            sent: std::sync::Mutex::new(None),
        };
        let parsed: Option<crate::schema::CitationExtractionResult> =
            parse_structured(&llm, "gpt-5-mini", "prompt").await.unwrap();

        assert!(parsed.unwrap().citations.is_empty());
        let sent = llm.sent.lock().unwrap().take().unwrap();
        assert_eq!(sent["type"], "object");
        assert_eq!(sent["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn test_client_builder() {
        let client = OpenAiClient::new("sk-test").with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }
}
