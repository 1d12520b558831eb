//! Migration entry points: Reader → Extractor → Renderer.
//!
//! Every entry point resolves the model first, so a missing API key fails
//! before any file is touched. The stages then run strictly in order and the
//! first error ends the run: nothing is rendered unless a complete, validated
//! record exists.

use crate::config::{MigrationConfig, OutputFormat, DEFAULT_MODEL};
use crate::error::MigrationError;
use crate::output::{MigrationOutput, MigrationStats};
use crate::pipeline::extract::extract_record;
use crate::pipeline::model::{LlmStructuredModel, StructuredModel};
use crate::pipeline::read::{self, SourceDocument, SourceFormat};
use crate::pipeline::render;
use crate::progress::Stage;
use crate::record::MigrationRecord;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Migrate a source document into the configured output directory.
///
/// The file name is derived from the extracted title and version, see
/// [`render::output_file_name`].
///
/// # Errors
/// Any [`MigrationError`]; use [`MigrationError::kind`] to branch on the stage.
pub async fn migrate(
    input: impl AsRef<Path>,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrationError> {
    let input = input.as_ref();
    run(
        Source::Path(input),
        Destination::Dir(config.output_dir.clone()),
        config,
    )
    .await
}

/// Migrate a source document and write the result to `output_path`.
pub async fn migrate_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrationError> {
    run(
        Source::Path(input.as_ref()),
        Destination::File(output_path.as_ref().to_path_buf()),
        config,
    )
    .await
}

/// Migrate an in-memory document (e.g. an upload) into the output directory.
///
/// `name` identifies the document in logs and error messages.
pub async fn migrate_bytes(
    bytes: Vec<u8>,
    format: SourceFormat,
    name: &str,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrationError> {
    run(
        Source::Bytes {
            bytes,
            format,
            origin: Path::new(name),
        },
        Destination::Dir(config.output_dir.clone()),
        config,
    )
    .await
}

/// Read and extract without rendering; `output_path` is `None` in the result.
pub async fn extract_document(
    input: impl AsRef<Path>,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrationError> {
    run(Source::Path(input.as_ref()), Destination::None, config).await
}

/// Synchronous wrapper around [`migrate`].
///
/// Creates a temporary tokio runtime internally.
pub fn migrate_sync(
    input: impl AsRef<Path>,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrationError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MigrationError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(migrate(input, config))
}

/// Render an already-validated record into `output_dir`.
///
/// Returns the path of the written file.
pub fn render_record(
    record: &MigrationRecord,
    output_dir: impl AsRef<Path>,
    format: OutputFormat,
) -> Result<PathBuf, MigrationError> {
    let path = output_dir
        .as_ref()
        .join(render::output_file_name(record, format));
    render::write_document(record, &path, format)?;
    Ok(path)
}

// ── Model resolution ─────────────────────────────────────────────────────

/// Resolve the extraction model, from most-specific to least-specific.
///
/// 1. **Pre-built model** (`config.provider`), used as-is. Tests inject
///    stubs this way.
/// 2. **Named provider** (`config.provider_name`) with `config.model`
///    (default [`DEFAULT_MODEL`]). The factory reads that provider's API key.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **`OPENAI_API_KEY`** with `config.model`. An empty key or the
///    `your-api-key-here` template value counts as unset.
/// 5. **Auto-detection** via `ProviderFactory::from_env`.
///
/// # Errors
/// `ProviderNotConfigured` (kind `ConfigurationError`) when nothing resolves.
pub fn resolve_model(config: &MigrationConfig) -> Result<Arc<dyn StructuredModel>, MigrationError> {
    if let Some(ref model) = config.provider {
        return Ok(Arc::clone(model));
    }

    let (provider, name) = resolve_llm_provider(config)?;
    debug!("Resolved LLM provider '{}'", name);

    Ok(Arc::new(
        LlmStructuredModel::new(provider, name)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_timeout_secs(config.api_timeout_secs),
    ))
}

fn resolve_llm_provider(
    config: &MigrationConfig,
) -> Result<(Arc<dyn LLMProvider>, String), MigrationError> {
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return Ok((create_provider(name, model)?, name.clone()));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return Ok((create_provider(&prov, &env_model)?, prov));
        }
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if is_real_key(&key) {
            return Ok((create_provider("openai", model)?, "openai".to_string()));
        }
    }

    let not_configured = |detail: String| MigrationError::ProviderNotConfigured {
        provider: "auto".to_string(),
        hint: format!(
            "No LLM provider could be detected from the environment.\n\
            Set OPENAI_API_KEY (e.g. in a .env file) or pass --provider.\n\
            {}",
            detail
        ),
    };

    // Without any API key the run must fail at startup, not at the first call.
    if !API_KEY_VARS
        .iter()
        .any(|var| std::env::var(var).is_ok_and(|k| is_real_key(&k)))
    {
        return Err(not_configured(format!(
            "None of {} is set.",
            API_KEY_VARS.join(", ")
        )));
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| not_configured(format!("Error: {}", e)))?;

    Ok((llm_provider, "auto".to_string()))
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, MigrationError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        MigrationError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Key variables recognised by provider auto-detection.
const API_KEY_VARS: [&str; 6] = [
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "MISTRAL_API_KEY",
    "OPENROUTER_API_KEY",
    "XAI_API_KEY",
];

fn is_real_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != "your-api-key-here"
}

// ── Pipeline ─────────────────────────────────────────────────────────────

enum Source<'a> {
    Path(&'a Path),
    Bytes {
        bytes: Vec<u8>,
        format: SourceFormat,
        origin: &'a Path,
    },
}

enum Destination {
    Dir(PathBuf),
    File(PathBuf),
    None,
}

async fn run(
    source: Source<'_>,
    destination: Destination,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrationError> {
    let total_start = Instant::now();
    let model = resolve_model(config)?;

    // ── Read ─────────────────────────────────────────────────────────────
    let (document, read_ms) = stage(config, Stage::Read, async {
        let document = match source {
            Source::Path(path) => {
                info!("Starting migration: {}", path.display());
                read::read_document(path, None, &config.page_separator).await?
            }
            Source::Bytes {
                bytes,
                format,
                origin,
            } => {
                info!("Starting migration: {} ({} bytes)", origin.display(), bytes.len());
                read::read_bytes(bytes, format, origin, &config.page_separator).await?
            }
        };
        if document.is_blank() {
            return Err(MigrationError::EmptyDocument {
                path: document.origin.clone(),
            });
        }
        Ok::<_, MigrationError>(document)
    })
    .await?;

    // ── Extract ──────────────────────────────────────────────────────────
    let (extraction, extract_ms) = stage(
        config,
        Stage::Extract,
        extract_record(&model, &document.text, config),
    )
    .await?;
    let record = extraction.record;

    // ── Render ───────────────────────────────────────────────────────────
    let target = match destination {
        Destination::Dir(dir) => Some(dir.join(render::output_file_name(
            &record,
            config.output_format,
        ))),
        Destination::File(path) => Some(path),
        Destination::None => None,
    };
    let render_ms = match &target {
        Some(path) => {
            let ((), ms) = stage(config, Stage::Render, async {
                render::write_document(&record, path, config.output_format)
            })
            .await?;
            ms
        }
        None => 0,
    };

    let stats = build_stats(&document, extraction.input_tokens, extraction.output_tokens);
    let stats = MigrationStats {
        read_duration_ms: read_ms,
        extract_duration_ms: extract_ms,
        render_duration_ms: render_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..stats
    };

    info!(
        "Migration complete: '{}' (confidence {}) in {}ms",
        record.title(),
        record.confidence_score(),
        stats.total_duration_ms
    );

    Ok(MigrationOutput {
        record,
        output_path: target,
        stats,
    })
}

/// Run one stage, reporting start/complete/error to the progress callback.
async fn stage<T, F>(
    config: &MigrationConfig,
    stage: Stage,
    fut: F,
) -> Result<(T, u64), MigrationError>
where
    F: Future<Output = Result<T, MigrationError>>,
{
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    match fut.await {
        Ok(value) => {
            let elapsed = start.elapsed();
            if let Some(ref cb) = config.progress_callback {
                cb.on_stage_complete(stage, elapsed);
            }
            debug!("{} finished in {:?}", stage, elapsed);
            Ok((value, elapsed.as_millis() as u64))
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_stage_error(stage, &e.to_string());
            }
            Err(e)
        }
    }
}

fn build_stats(document: &SourceDocument, input_tokens: usize, output_tokens: usize) -> MigrationStats {
    MigrationStats {
        source_format: Some(document.format),
        source_chars: document.text.chars().count(),
        source_lines: document
            .text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count(),
        page_count: document.page_count,
        input_tokens,
        output_tokens,
        ..Default::default()
    }
}
