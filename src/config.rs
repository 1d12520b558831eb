//! Configuration types for SOP migration.
//!
//! All pipeline behaviour is controlled through [`MigrationConfig`], built via
//! its [`MigrationConfigBuilder`]. The builder lets callers set only what they
//! care about and rely on documented defaults for the rest.

use crate::error::MigrationError;
use crate::pipeline::model::StructuredModel;
use crate::progress::ProgressCallback;
use crate::record::{RecordPolicy, DEFAULT_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when only `OPENAI_API_KEY` is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for one migration run.
///
/// # Example
/// ```rust
/// use sop2docx::{MigrationConfig, OutputFormat};
///
/// let config = MigrationConfig::builder()
///     .model("gpt-4o")
///     .output_dir("out")
///     .output_format(OutputFormat::Markdown)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct MigrationConfig {
    /// LLM model identifier, e.g. "gpt-4o-mini", "gpt-4o".
    /// If None, uses [`DEFAULT_MODEL`] or the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed model. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn StructuredModel>>,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Extraction should be faithful to the source, not creative.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Timeout for the single model call, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::extraction_prompt`] with `default_version`.
    /// The schema block is appended either way.
    pub system_prompt: Option<String>,

    /// Caller-assigned document id. Overrides the id the model proposes.
    pub document_id: Option<String>,

    /// Version the default prompt asks for, and the fallback when the model
    /// leaves it blank. Default: "2.0".
    pub default_version: String,

    /// Directory for rendered documents. Default: "output_docs".
    pub output_dir: PathBuf,

    /// Rendered document format. Default: [`OutputFormat::Docx`].
    pub output_format: OutputFormat,

    /// Inserted between the text of consecutive PDF pages. Default: "\n".
    pub page_separator: String,

    /// Optional stage-event callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            api_timeout_secs: 120,
            system_prompt: None,
            document_id: None,
            default_version: DEFAULT_VERSION.to_string(),
            output_dir: PathBuf::from("output_docs"),
            output_format: OutputFormat::default(),
            page_separator: "\n".to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("document_id", &self.document_id)
            .field("default_version", &self.default_version)
            .field("output_dir", &self.output_dir)
            .field("output_format", &self.output_format)
            .finish()
    }
}

impl MigrationConfig {
    /// Create a new builder for `MigrationConfig`.
    pub fn builder() -> MigrationConfigBuilder {
        MigrationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Validation policy derived from this config.
    pub fn record_policy(&self) -> RecordPolicy {
        RecordPolicy {
            default_version: self.default_version.clone(),
            document_id: self.document_id.clone(),
        }
    }
}

/// Builder for [`MigrationConfig`].
pub struct MigrationConfigBuilder {
    config: MigrationConfig,
}

impl fmt::Debug for MigrationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl MigrationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn StructuredModel>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn document_id(mut self, id: impl Into<String>) -> Self {
        self.config.document_id = Some(id.into());
        self
    }

    pub fn default_version(mut self, version: impl Into<String>) -> Self {
        self.config.default_version = version.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn page_separator(mut self, sep: impl Into<String>) -> Self {
        self.config.page_separator = sep.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MigrationConfig, MigrationError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(MigrationError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(MigrationError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.default_version.trim().is_empty() {
            return Err(MigrationError::InvalidConfig(
                "default_version must not be empty".into(),
            ));
        }
        if c.system_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(MigrationError::InvalidConfig(
                "system_prompt must not be empty when set".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// File format of the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Office Open XML word-processing document (default).
    #[default]
    Docx,
    /// Plain Markdown with the same section layout.
    Markdown,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Markdown => "md",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = MigrationConfig::default();
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.default_version, "2.0");
        assert_eq!(c.output_format, OutputFormat::Docx);
        assert_eq!(c.page_separator, "\n");
        assert!(c.provider.is_none());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = MigrationConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        let err = MigrationConfig::builder().max_tokens(0).build().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConfigurationError);
    }

    #[test]
    fn builder_rejects_blank_version() {
        assert!(MigrationConfig::builder()
            .default_version("  ")
            .build()
            .is_err());
    }

    #[test]
    fn record_policy_carries_overrides() {
        let c = MigrationConfig::builder()
            .document_id("SOP-2025-007")
            .default_version("3.0")
            .build()
            .unwrap();
        let p = c.record_policy();
        assert_eq!(p.document_id.as_deref(), Some("SOP-2025-007"));
        assert_eq!(p.default_version, "3.0");
    }

    #[test]
    fn output_extensions() {
        assert_eq!(OutputFormat::Docx.extension(), "docx");
        assert_eq!(OutputFormat::Markdown.extension(), "md");
    }
}
