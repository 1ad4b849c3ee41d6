//! LLM client abstraction.
//!
//! Implementations wrap a specific provider and its wire format; the
//! extractor owns prompting, schema validation and retry.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ExtractResult;

/// A single structured-output exchange.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub system: String,
    pub user: String,

    /// PNG screenshot tiles to attach as image parts. When non-empty the
    /// provider's vision model handles the request.
    pub images: Vec<Vec<u8>>,

    /// Name the provider reports for the response schema.
    pub schema_name: String,

    /// Strict JSON schema the response must conform to.
    pub schema: Value,
}

impl StructuredRequest {
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        schema_name: impl Into<String>,
        schema: Value,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            images: Vec::new(),
            schema_name: schema_name.into(),
            schema,
        }
    }

    /// Attach screenshot tiles.
    pub fn with_images(mut self, images: Vec<Vec<u8>>) -> Self {
        self.images = images;
        self
    }
}

/// LLM operations needed by extraction and enrichment.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One system/user exchange constrained to a JSON schema. Returns the
    /// raw response text; the caller validates it against the schema.
    async fn generate_structured(&self, request: &StructuredRequest) -> ExtractResult<String>;

    /// Free-form completion for lightweight JSON prompts.
    async fn complete(&self, system: &str, user: &str) -> ExtractResult<String>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn generate_structured(&self, request: &StructuredRequest) -> ExtractResult<String> {
        (**self).generate_structured(request).await
    }

    async fn complete(&self, system: &str, user: &str) -> ExtractResult<String> {
        (**self).complete(system, user).await
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for &T {
    async fn generate_structured(&self, request: &StructuredRequest) -> ExtractResult<String> {
        (**self).generate_structured(request).await
    }

    async fn complete(&self, system: &str, user: &str) -> ExtractResult<String> {
        (**self).complete(system, user).await
    }
}
