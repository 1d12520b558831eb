//! Error types for the sop2docx library.
//!
//! Every failure in the pipeline is fatal for the run: a migration either
//! produces a complete document or nothing at all. All of them are variants of
//! [`MigrationError`], each carrying enough context (path, provider, detail)
//! for an actionable message.
//!
//! Callers that need to branch on *what kind* of failure happened use
//! [`MigrationError::kind`], which collapses the concrete variants into the
//! seven-way [`ErrorKind`] taxonomy:
//!
//! | Stage     | Kinds |
//! |-----------|-------|
//! | Reader    | `NotFound`, `UnsupportedFormat`, `DecodeError` |
//! | Extractor | `ExtractionFailure`, `SchemaViolation` |
//! | Renderer  | `WriteError` |
//! | Startup   | `ConfigurationError` |

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the sop2docx library.
#[derive(Debug, Error)]
pub enum MigrationError {
    // ── Reader errors ─────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Source document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The path exists but could not be read (a directory, an I/O error).
    #[error("Cannot read source document '{path}': {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension (or content) is neither plain text nor PDF.
    #[error("Unsupported source format '{format}' for '{path}'\nSupported formats: .txt, .text, .md, .pdf")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// A plain-text file is not valid UTF-8.
    #[error("'{path}' is not valid UTF-8 text: {detail}")]
    InvalidText { path: PathBuf, detail: String },

    /// The file was declared or detected as PDF but lacks the `%PDF` header.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; encrypted procedures are not supported.
    #[error("PDF '{path}' is encrypted.\nExport an unencrypted copy and retry.")]
    EncryptedPdf { path: PathBuf },

    /// The source yielded no text at all (empty file or scanned PDF).
    #[error("No extractable text in '{path}'\nScanned PDFs must be OCR'd before migration.")]
    EmptyDocument { path: PathBuf },

    // ── Extractor errors ──────────────────────────────────────────────────
    /// The LLM API call failed (network, server error, content filter).
    #[error("LLM call to '{provider}' failed: {detail}")]
    ModelCallFailed { provider: String, detail: String },

    /// LLM API returned HTTP 429 — caller should back off before retrying.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded { provider: String },

    /// LLM API returned an authentication error (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// LLM API call exceeded `api_timeout_secs`.
    #[error("LLM call to '{provider}' timed out after {secs}s")]
    ApiTimeout { provider: String, secs: u64 },

    /// The model response could not be coerced into a `MigrationRecord`.
    #[error("Model response violates the record schema: {detail}")]
    SchemaViolation { detail: String },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output document '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// docx-rs failed to serialise the document package.
    #[error("Failed to build document '{path}': {detail}")]
    DocumentBuildFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF input needs the pdfium shared library. You can:\n\
  • Install libpdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.so (or .dylib / .dll).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MigrationError {
    /// Collapse this error into its pipeline-level kind.
    pub fn kind(&self) -> ErrorKind {
        use MigrationError::*;
        match self {
            FileNotFound { .. } | SourceUnreadable { .. } | PermissionDenied { .. } => {
                ErrorKind::NotFound
            }
            UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            InvalidText { .. }
            | NotAPdf { .. }
            | CorruptPdf { .. }
            | EncryptedPdf { .. }
            | EmptyDocument { .. } => ErrorKind::DecodeError,
            ModelCallFailed { .. }
            | RateLimitExceeded { .. }
            | AuthError { .. }
            | ApiTimeout { .. } => ErrorKind::ExtractionFailure,
            SchemaViolation { .. } => ErrorKind::SchemaViolation,
            OutputWriteFailed { .. } | DocumentBuildFailed { .. } => ErrorKind::WriteError,
            ProviderNotConfigured { .. } | InvalidConfig(_) | PdfiumBindingFailed(_) => {
                ErrorKind::ConfigurationError
            }
            Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn schema(detail: impl Into<String>) -> Self {
        MigrationError::SchemaViolation {
            detail: detail.into(),
        }
    }
}

/// Pipeline-level error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NotFound,
    UnsupportedFormat,
    DecodeError,
    ExtractionFailure,
    SchemaViolation,
    WriteError,
    ConfigurationError,
    Internal,
}

impl ErrorKind {
    /// Process exit status for the CLI, following `sysexits.h`.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::NotFound => 66,
            ErrorKind::UnsupportedFormat | ErrorKind::DecodeError => 65,
            ErrorKind::ExtractionFailure => 69,
            ErrorKind::SchemaViolation => 76,
            ErrorKind::WriteError => 73,
            ErrorKind::ConfigurationError => 78,
            ErrorKind::Internal => 70,
        }
    }

    /// Whether re-running the whole migration can reasonably succeed.
    ///
    /// Only model-call failures qualify: the extractor keeps no state between
    /// attempts, so a retry is a fresh, independent call.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ExtractionFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::ExtractionFailure => "ExtractionFailure",
            ErrorKind::SchemaViolation => "SchemaViolation",
            ErrorKind::WriteError => "WriteError",
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(s)
    }
}
