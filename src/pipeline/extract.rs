//! Structured Extractor: source text → validated [`MigrationRecord`].
//!
//! The extractor owns no state. Each call builds the instructions, sends one
//! request through the [`StructuredModel`] seam and validates the reply, so
//! two calls with the same text are two independent attempts.

use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::pipeline::model::{ExtractionRequest, StructuredModel};
use crate::prompts::extraction_prompt;
use crate::record::{MigrationRecord, RecordDraft};
use crate::schema::SchemaConstraint;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A validated record plus the cost of producing it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: MigrationRecord,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Extract a [`MigrationRecord`] from raw document text.
///
/// # Errors
/// - `ExtractionFailure` kinds when the model call fails
/// - `SchemaViolation` when the reply cannot be coerced into a record
pub async fn extract_record(
    model: &Arc<dyn StructuredModel>,
    document_text: &str,
    config: &MigrationConfig,
) -> Result<Extraction, MigrationError> {
    let start = Instant::now();
    let instructions = match &config.system_prompt {
        Some(prompt) => prompt.clone(),
        None => extraction_prompt(&config.default_version),
    };
    let schema = SchemaConstraint::migration_record();

    debug!(
        "Sending {} chars to '{}' for extraction",
        document_text.len(),
        model.name()
    );

    let reply = model
        .extract(ExtractionRequest {
            instructions: &instructions,
            document_text,
            schema: &schema,
        })
        .await?;

    let record = RecordDraft::from_value(reply.content)?.into_record(&config.record_policy())?;

    info!(
        "Extracted '{}' ({}): {} warnings, {} equipment, {} steps, confidence {}",
        record.title(),
        record.document_id(),
        record.safety_warnings().len(),
        record.equipment().len(),
        record.steps().len(),
        record.confidence_score()
    );

    Ok(Extraction {
        record,
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
