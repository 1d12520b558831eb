//! Result types returned by the migration entry points.

use crate::pipeline::read::SourceFormat;
use crate::record::MigrationRecord;
use serde::Serialize;
use std::path::PathBuf;

/// The outcome of one successful migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutput {
    /// The validated record the document was rendered from.
    pub record: MigrationRecord,
    /// Where the document was written. `None` for extract-only runs.
    pub output_path: Option<PathBuf>,
    pub stats: MigrationStats,
}

/// Per-run statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationStats {
    pub source_format: Option<SourceFormat>,
    /// Characters of extracted source text.
    pub source_chars: usize,
    /// Non-blank lines of extracted source text.
    pub source_lines: usize,
    /// PDF page count; `None` for plain text.
    pub page_count: Option<usize>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub read_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl MigrationStats {
    pub fn total_tokens(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_total() {
        let s = MigrationStats {
            input_tokens: 900,
            output_tokens: 250,
            ..Default::default()
        };
        assert_eq!(s.total_tokens(), 1150);
    }

    #[test]
    fn stats_serialise_format_in_snake_case() {
        let s = MigrationStats {
            source_format: Some(SourceFormat::PlainText),
            ..Default::default()
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["source_format"], "plain_text");
        assert!(v["page_count"].is_null());
    }
}
