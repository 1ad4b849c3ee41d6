//! OpenAI-compatible implementation of the LLM client.
//!
//! Talks the chat-completions wire format directly over reqwest: strict
//! json_schema response format for extraction, data-URL image parts for
//! vision requests.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ExtractError, ExtractResult};
use crate::security::SecretString;
use crate::traits::llm::{LlmClient, StructuredRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Chat-completions client with structured output support.
#[derive(Clone)]
pub struct OpenAi {
    client: Client,
    api_key: SecretString,
    model: String,
    vision_model: String,
    base_url: String,
}

impl OpenAi {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::new(api_key),
            model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> ExtractResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ExtractError::Llm("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the text model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the model used when image parts are attached.
    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    /// Set a custom base URL (Azure, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post_chat(&self, body: Value) -> ExtractResult<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractError::Llm(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ExtractError::Llm(
                format!("chat completion failed: {status}: {detail}").into(),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Llm(Box::new(e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ExtractError::Llm("no choices in chat response".into()))
    }

    fn user_content(request: &StructuredRequest) -> Value {
        if request.images.is_empty() {
            return json!(request.user);
        }

        let mut parts: Vec<Value> = request
            .images
            .iter()
            .map(|image| {
                let encoded = base64::engine::general_purpose::STANDARD.encode(image);
                json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:image/png;base64,{encoded}") },
                })
            })
            .collect();
        parts.push(json!({ "type": "text", "text": request.user }));
        json!(parts)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

#[async_trait]
impl LlmClient for OpenAi {
    async fn generate_structured(&self, request: &StructuredRequest) -> ExtractResult<String> {
        let model = if request.images.is_empty() {
            &self.model
        } else {
            &self.vision_model
        };

        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": Self::user_content(request) },
            ],
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                },
            },
        });

        self.post_chat(body).await
    }

    async fn complete(&self, system: &str, user: &str) -> ExtractResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.0,
        });

        self.post_chat(body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_content_is_plain_text_without_images() {
        let request = StructuredRequest::new("sys", "extract this", "assets", json!({}));
        assert_eq!(OpenAi::user_content(&request), json!("extract this"));
    }

    #[test]
    fn user_content_builds_image_parts() {
        let request = StructuredRequest::new("sys", "extract this", "assets", json!({}))
            .with_images(vec![vec![1, 2, 3], vec![4, 5, 6]]);

        let content = OpenAi::user_content(&request);
        let parts = content.as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["type"], "image_url");
        assert!(parts[0]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(parts[2]["type"], "text");
    }

    #[test]
    fn builder_overrides_models() {
        let client = OpenAi::new("sk-test")
            .with_model("gpt-4.1-nano")
            .with_vision_model("gpt-4.1");
        assert_eq!(client.model(), "gpt-4.1-nano");
        assert_eq!(client.vision_model, "gpt-4.1");
    }
}
