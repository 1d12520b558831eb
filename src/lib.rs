//! # sop2docx
//!
//! Migrate legacy Standard Operating Procedures (SOPs) into a standardized,
//! branded document using a Large Language Model.
//!
//! Legacy procedures arrive as free-form text files or PDFs with inconsistent
//! headings, buried safety notes and steps in prose. This crate pulls the raw
//! text out, asks an LLM for a record that must satisfy a fixed JSON schema,
//! validates it, and renders every procedure with the same template.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .txt / .pdf
//!  │
//!  ├─ 1. Read     plain text verbatim, PDF text via pdfium (spawn_blocking)
//!  ├─ 2. Extract  one schema-constrained LLM call → MigrationRecord
//!  └─ 3. Render   title, metadata table, warnings, equipment, steps → .docx
//! ```
//!
//! Any failure ends the run with a [`MigrationError`] whose [`ErrorKind`]
//! names the failing stage. Nothing is written unless extraction succeeded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sop2docx::{migrate, MigrationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = MigrationConfig::default();
//!     let output = migrate("legacy_sop.txt", &config).await?;
//!     println!("{} → {:?}", output.record.title(), output.output_path);
//!     println!("confidence {}", output.record.confidence_score());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sop2docx` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! ## PDF input
//!
//! PDF text extraction binds to the pdfium shared library at runtime. Set
//! `PDFIUM_LIB_PATH` or install libpdfium system-wide. Scanned PDFs without a
//! text layer are rejected; there is no OCR.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod migrate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MigrationConfig, MigrationConfigBuilder, OutputFormat, DEFAULT_MODEL};
pub use error::{ErrorKind, MigrationError};
pub use migrate::{
    extract_document, migrate, migrate_bytes, migrate_sync, migrate_to_file, render_record,
    resolve_model,
};
pub use output::{MigrationOutput, MigrationStats};
pub use pipeline::model::{ExtractionRequest, LlmStructuredModel, ModelReply, StructuredModel};
pub use pipeline::read::{SourceDocument, SourceFormat};
pub use progress::{MigrationProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use record::{ConfidenceBand, ConfidenceScore, MigrationRecord, RecordDraft, RecordPolicy};
pub use schema::SchemaConstraint;
