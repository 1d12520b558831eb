//! The model boundary: one schema-constrained call per document.
//!
//! [`StructuredModel`] is the capability the extractor depends on: a single
//! async method taking the instructions, the document text and the
//! [`SchemaConstraint`], returning a JSON object. Test doubles implement that
//! one method; [`LlmStructuredModel`] wraps any `edgequake_llm` provider.
//!
//! ## No retries
//!
//! A failed call surfaces immediately as an `ExtractionFailure`-kind error.
//! Because nothing is cached between calls, the caller can re-run the whole
//! extraction safely.

use crate::error::MigrationError;
use crate::pipeline::postprocess::parse_model_json;
use crate::prompts::{document_message, with_schema};
use crate::schema::SchemaConstraint;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Everything the model needs for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// System instructions describing the fields and extraction rules.
    pub instructions: &'a str,
    /// Raw source text.
    pub document_text: &'a str,
    /// Output-schema constraint the reply must satisfy.
    pub schema: &'a SchemaConstraint,
}

/// The parsed reply plus token accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    /// The JSON object returned by the model.
    pub content: Value,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ModelReply {
    /// A reply without token accounting.
    pub fn new(content: Value) -> Self {
        Self {
            content,
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// A language model that can answer with a schema-conformant JSON object.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Perform one extraction call.
    ///
    /// Transport, auth and rate-limit failures must map to
    /// `ExtractionFailure`-kind errors; a reply that is not a JSON object maps
    /// to `SchemaViolation`.
    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<ModelReply, MigrationError>;
}

/// [`StructuredModel`] backed by an `edgequake_llm` chat provider in JSON mode.
pub struct LlmStructuredModel {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl LlmStructuredModel {
    pub fn new(provider: Arc<dyn LLMProvider>, provider_name: impl Into<String>) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            temperature: 0.0,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            response_format: Some("json_object".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl StructuredModel for LlmStructuredModel {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<ModelReply, MigrationError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(with_schema(request.instructions, request.schema)),
            ChatMessage::user(document_message(request.document_text)),
        ];
        let options = self.build_options();

        let call = self.provider.chat(&messages, Some(&options));
        let response = match timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let err = classify_failure(&self.provider_name, &e.to_string());
                warn!("{}: extraction call failed — {}", self.provider_name, err);
                return Err(err);
            }
            Err(_) => {
                return Err(MigrationError::ApiTimeout {
                    provider: self.provider_name.clone(),
                    secs: self.timeout_secs,
                })
            }
        };

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.provider_name,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(ModelReply {
            content: parse_model_json(&response.content)?,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Map a provider error message onto the extraction-failure variants.
///
/// Provider errors arrive as opaque strings; status codes and well-known
/// phrases are the only stable signal across back-ends.
fn classify_failure(provider: &str, detail: &str) -> MigrationError {
    let lower = detail.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit") {
        MigrationError::RateLimitExceeded {
            provider: provider.to_string(),
        }
    } else if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("invalid api key")
        || lower.contains("incorrect api key")
    {
        MigrationError::AuthError {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    } else {
        MigrationError::ModelCallFailed {
            provider: provider.to_string(),
            detail: detail.to_string(),
        }
    }
}
