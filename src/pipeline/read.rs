//! Document Reader: plain-text or PDF file → raw text.
//!
//! Plain text is returned verbatim. PDF text is pulled page by page through
//! pdfium and joined with the configured page separator; no OCR is attempted,
//! so an image-only scan yields empty text and the caller rejects it before
//! any model call.
//!
//! ## spawn_blocking
//!
//! pdfium is a C++ library with thread-local state. Loading and walking the
//! document happens on the blocking pool so Tokio worker threads never stall.

use crate::error::MigrationError;
use pdfium_render::prelude::*;
use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Source-document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    PlainText,
    Pdf,
}

impl SourceFormat {
    /// Infer the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" | "md" => Some(SourceFormat::PlainText),
            "pdf" => Some(SourceFormat::Pdf),
            _ => None,
        }
    }

    /// Infer the format of `path`: extension first, then the `%PDF` header.
    pub fn detect(path: &Path, head: &[u8]) -> Result<Self, MigrationError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::from_extension(ext).ok_or_else(|| {
                MigrationError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format: ext.to_string(),
                }
            }),
            None if head.starts_with(PDF_MAGIC) => Ok(SourceFormat::Pdf),
            None => Err(MigrationError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: "(no extension)".to_string(),
            }),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::PlainText => f.write_str("text"),
            SourceFormat::Pdf => f.write_str("pdf"),
        }
    }
}

/// Raw text pulled from a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub text: String,
    pub format: SourceFormat,
    /// Number of PDF pages; `None` for plain text.
    pub page_count: Option<usize>,
    /// Where the bytes came from (a path, or a caller-supplied name).
    pub origin: PathBuf,
}

impl SourceDocument {
    /// True when the text holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Read a source document from disk.
///
/// `declared` overrides extension-based detection.
///
/// # Errors
/// - `FileNotFound` when nothing exists at `path`
/// - `PermissionDenied` / `SourceUnreadable` when it exists but cannot be read
/// - `UnsupportedFormat` for extensions other than text or PDF
/// - `InvalidText`, `NotAPdf`, `CorruptPdf`, `EncryptedPdf` when decoding fails
pub async fn read_document(
    path: &Path,
    declared: Option<SourceFormat>,
    page_separator: &str,
) -> Result<SourceDocument, MigrationError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        IoErrorKind::NotFound => MigrationError::FileNotFound {
            path: path.to_path_buf(),
        },
        IoErrorKind::PermissionDenied => MigrationError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => MigrationError::SourceUnreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let format = match declared {
        Some(f) => f,
        None => SourceFormat::detect(path, &bytes)?,
    };
    debug!("Reading {} as {} ({} bytes)", path.display(), format, bytes.len());

    read_bytes(bytes, format, path, page_separator).await
}

/// Decode an in-memory source document.
///
/// `origin` is only used in error messages and the returned document.
pub async fn read_bytes(
    bytes: Vec<u8>,
    format: SourceFormat,
    origin: &Path,
    page_separator: &str,
) -> Result<SourceDocument, MigrationError> {
    let origin = origin.to_path_buf();
    match format {
        SourceFormat::PlainText => {
            let text = decode_text(bytes, &origin)?;
            Ok(SourceDocument {
                text,
                format,
                page_count: None,
                origin,
            })
        }
        SourceFormat::Pdf => {
            if !bytes.starts_with(PDF_MAGIC) {
                return Err(MigrationError::NotAPdf {
                    path: origin,
                    magic: bytes.iter().take(4).copied().collect(),
                });
            }
            let sep = page_separator.to_string();
            let path = origin.clone();
            let (text, pages) =
                tokio::task::spawn_blocking(move || pdf_text_blocking(&bytes, &path, &sep))
                    .await
                    .map_err(|e| MigrationError::Internal(format!("PDF task panicked: {}", e)))??;
            info!("PDF text extracted: {} pages, {} chars", pages, text.len());
            Ok(SourceDocument {
                text,
                format,
                page_count: Some(pages),
                origin,
            })
        }
    }
}

fn decode_text(bytes: Vec<u8>, origin: &Path) -> Result<String, MigrationError> {
    // A UTF-8 BOM is an encoding marker, not content.
    let bytes = match bytes.strip_prefix(b"\xEF\xBB\xBF") {
        Some(rest) => rest.to_vec(),
        None => bytes,
    };
    String::from_utf8(bytes).map_err(|e| MigrationError::InvalidText {
        path: origin.to_path_buf(),
        detail: e.utf8_error().to_string(),
    })
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then
/// the system library search path.
fn bind_pdfium() -> Result<Pdfium, MigrationError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.trim().is_empty() => Pdfium::bind_to_library(&p)
            .map_err(|e| MigrationError::PdfiumBindingFailed(format!("{}: {:?}", p, e)))?,
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| MigrationError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };
    Ok(Pdfium::new(bindings))
}

fn pdf_text_blocking(
    bytes: &[u8],
    path: &Path,
    page_separator: &str,
) -> Result<(String, usize), MigrationError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            MigrationError::EncryptedPdf {
                path: path.to_path_buf(),
            }
        } else {
            MigrationError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total = pages.len() as usize;

    let segments = pages.iter().enumerate().map(|(idx, page)| match page.text() {
        Ok(text) => Some(text.all()),
        Err(e) => {
            warn!("Page {}: no text layer ({:?})", idx + 1, e);
            None
        }
    });

    Ok((join_pages(segments, page_separator), total))
}

/// Join per-page text in page order. A page without text still takes its
/// slot as an empty segment.
fn join_pages(
    segments: impl IntoIterator<Item = Option<String>>,
    page_separator: &str,
) -> String {
    segments
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>()
        .join(page_separator)
}
