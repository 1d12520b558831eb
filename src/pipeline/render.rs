//! Document Renderer: [`MigrationRecord`] → formatted document.
//!
//! Rendering is split in two. [`layout`] turns a record into a flat list of
//! [`Block`]s (the template, independent of file format), and the DOCX and
//! Markdown back-ends each walk that list. Both back-ends therefore share the
//! same section order and never reorder list entries.
//!
//! Template, top to bottom:
//!
//! 1. title heading (teal) and a centred "Standard Operating Procedure" subtitle
//! 2. metadata table: title, document id, version, department, confidence
//! 3. "Safety Warnings & Precautions": bulleted, bold red
//! 4. "Required Equipment": plain bullets
//! 5. "Procedure Steps": "Step N:" labels in record order
//! 6. an italic grey review notice
//!
//! Files are written to a temp file in the target directory and renamed into
//! place, so a failed run never leaves a partial document behind.

use crate::config::OutputFormat;
use crate::error::MigrationError;
use crate::record::MigrationRecord;
use docx_rs::{
    AbstractNumbering, AlignmentType, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat,
    Numbering, NumberingId, Paragraph, Run, RunFonts, Start, Style, StyleType, Table, TableCell,
    TableRow,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SUBTITLE: &str = "Standard Operating Procedure";

pub const REVIEW_NOTICE: &str = "This document was generated by automated SOP migration. \
Please review and approve before use.";

const MAX_STEM_CHARS: usize = 50;

// Colours (hex RGB) and sizes (half-points) of the branded template.
const TEAL: &str = "008080";
const NAVY: &str = "003366";
const RED: &str = "CC0000";
const GREY: &str = "808080";
const BODY_SIZE: usize = 20;

const BULLET_NUMBERING: usize = 1;

// ── Layout ───────────────────────────────────────────────────────────────

/// The three list sections of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    SafetyWarnings,
    Equipment,
    ProcedureSteps,
}

impl Section {
    pub fn heading(self) -> &'static str {
        match self {
            Section::SafetyWarnings => "Safety Warnings & Precautions",
            Section::Equipment => "Required Equipment",
            Section::ProcedureSteps => "Procedure Steps",
        }
    }

    /// Shown in place of an empty list so reviewers see the gap.
    pub fn empty_notice(self) -> &'static str {
        match self {
            Section::SafetyWarnings => "No safety warnings were identified in the source.",
            Section::Equipment => "No equipment was listed in the source.",
            Section::ProcedureSteps => "No procedure steps were identified in the source.",
        }
    }
}

/// One element of the rendered template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Subtitle(&'static str),
    /// Label/value rows of the metadata table.
    Metadata(Vec<(&'static str, String)>),
    SectionHeading(Section),
    Warning(String),
    EquipmentItem(String),
    Step { number: usize, text: String },
    EmptySection(Section),
    ReviewNotice(&'static str),
}

/// Lay a record out as template blocks.
pub fn layout(record: &MigrationRecord) -> Vec<Block> {
    let confidence = record.confidence_score();
    let mut blocks = vec![
        Block::Title(record.title().to_string()),
        Block::Subtitle(SUBTITLE),
        Block::Metadata(vec![
            ("Document Title", record.title().to_string()),
            ("Document ID", record.document_id().to_string()),
            ("Version", record.version().to_string()),
            ("Department", record.department().to_string()),
            (
                "Extraction Confidence",
                format!("{} ({})", confidence, confidence.band().label()),
            ),
        ]),
    ];

    blocks.push(Block::SectionHeading(Section::SafetyWarnings));
    if record.safety_warnings().is_empty() {
        blocks.push(Block::EmptySection(Section::SafetyWarnings));
    }
    blocks.extend(
        record
            .safety_warnings()
            .iter()
            .map(|w| Block::Warning(w.clone())),
    );

    blocks.push(Block::SectionHeading(Section::Equipment));
    if record.equipment().is_empty() {
        blocks.push(Block::EmptySection(Section::Equipment));
    }
    blocks.extend(
        record
            .equipment()
            .iter()
            .map(|e| Block::EquipmentItem(e.clone())),
    );

    blocks.push(Block::SectionHeading(Section::ProcedureSteps));
    if record.steps().is_empty() {
        blocks.push(Block::EmptySection(Section::ProcedureSteps));
    }
    blocks.extend(record.steps().iter().enumerate().map(|(i, s)| Block::Step {
        number: i + 1,
        text: s.clone(),
    }));

    blocks.push(Block::ReviewNotice(REVIEW_NOTICE));
    blocks
}

// ── File naming ──────────────────────────────────────────────────────────

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static UNSAFE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w.\-]").unwrap());

/// Deterministic output name: `<title stem>_v<version>.<ext>`.
///
/// The stem keeps word characters, whitespace and hyphens, turns spaces into
/// underscores and is cut to 50 characters.
pub fn output_file_name(record: &MigrationRecord, format: OutputFormat) -> String {
    let cleaned = NON_WORD.replace_all(record.title(), "");
    let stem: String = cleaned
        .trim()
        .replace(' ', "_")
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    let stem = if stem.is_empty() { "SOP".to_string() } else { stem };
    let version = UNSAFE_VERSION.replace_all(record.version(), "");
    format!("{}_v{}.{}", stem, version, format.extension())
}

// ── Back-ends ────────────────────────────────────────────────────────────

/// Render a record to bytes in the given format.
pub fn render_to_bytes(
    record: &MigrationRecord,
    format: OutputFormat,
) -> Result<Vec<u8>, MigrationError> {
    let blocks = layout(record);
    match format {
        OutputFormat::Markdown => Ok(render_markdown(&blocks).into_bytes()),
        OutputFormat::Docx => {
            render_docx(&blocks).map_err(|detail| MigrationError::DocumentBuildFailed {
                path: PathBuf::from(output_file_name(record, format)),
                detail,
            })
        }
    }
}

/// Build a DOCX package from template blocks.
pub fn render_docx(blocks: &[Block]) -> Result<Vec<u8>, String> {
    let mut docx = Docx::new()
        .default_fonts(RunFonts::new().ascii("Calibri").hi_ansi("Calibri"))
        .default_size(22)
        .add_style(
            Style::new("Heading1", StyleType::Paragraph)
                .name("Heading 1")
                .bold()
                .size(40)
                .color(TEAL),
        )
        .add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        )))
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING));

    for block in blocks {
        docx = match block {
            Block::Title(title) => docx.add_paragraph(
                Paragraph::new()
                    .style("Heading1")
                    .add_run(Run::new().add_text(title).bold().size(40).color(TEAL)),
            ),
            Block::Subtitle(text) => docx.add_paragraph(
                Paragraph::new()
                    .align(AlignmentType::Center)
                    .add_run(Run::new().add_text(*text).bold().size(32).color(NAVY)),
            ),
            Block::Metadata(rows) => {
                let rows = rows
                    .iter()
                    .map(|(label, value)| {
                        TableRow::new(vec![
                            TableCell::new().add_paragraph(
                                Paragraph::new()
                                    .add_run(Run::new().add_text(*label).bold().size(BODY_SIZE)),
                            ),
                            TableCell::new().add_paragraph(
                                Paragraph::new()
                                    .add_run(Run::new().add_text(value).size(BODY_SIZE)),
                            ),
                        ])
                    })
                    .collect();
                docx.add_table(Table::new(rows)).add_paragraph(Paragraph::new())
            }
            Block::SectionHeading(section) => docx.add_paragraph(
                Paragraph::new().add_run(
                    Run::new()
                        .add_text(section.heading())
                        .bold()
                        .size(26)
                        .color(NAVY),
                ),
            ),
            Block::Warning(text) => docx.add_paragraph(
                bullet().add_run(Run::new().add_text(text).bold().size(BODY_SIZE).color(RED)),
            ),
            Block::EquipmentItem(text) => {
                docx.add_paragraph(bullet().add_run(Run::new().add_text(text).size(BODY_SIZE)))
            }
            Block::Step { number, text } => docx.add_paragraph(
                Paragraph::new()
                    .add_run(
                        Run::new()
                            .add_text(format!("Step {}:  ", number))
                            .bold()
                            .size(BODY_SIZE)
                            .color(NAVY),
                    )
                    .add_run(Run::new().add_text(text).size(BODY_SIZE)),
            ),
            Block::EmptySection(section) => docx.add_paragraph(
                Paragraph::new().add_run(
                    Run::new()
                        .add_text(section.empty_notice())
                        .italic()
                        .size(BODY_SIZE)
                        .color(GREY),
                ),
            ),
            Block::ReviewNotice(text) => docx.add_paragraph(Paragraph::new()).add_paragraph(
                Paragraph::new()
                    .align(AlignmentType::Center)
                    .add_run(Run::new().add_text(*text).italic().size(16).color(GREY)),
            ),
        };
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).map_err(|e| e.to_string())?;
    Ok(buf.into_inner())
}

fn bullet() -> Paragraph {
    Paragraph::new().numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0))
}

/// Render template blocks as Markdown.
pub fn render_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Title(title) => out.push_str(&format!("# {}\n\n", title)),
            Block::Subtitle(text) => out.push_str(&format!("*{}*\n\n", text)),
            Block::Metadata(rows) => {
                out.push_str("| Field | Value |\n|---|---|\n");
                for (label, value) in rows {
                    out.push_str(&format!("| {} | {} |\n", label, escape_cell(value)));
                }
                out.push('\n');
            }
            Block::SectionHeading(section) => {
                if !out.ends_with("\n\n") {
                    out.push('\n');
                }
                out.push_str(&format!("## {}\n\n", section.heading()));
            }
            Block::Warning(text) => out.push_str(&format!("- **{}**\n", text)),
            Block::EquipmentItem(text) => out.push_str(&format!("- {}\n", text)),
            Block::Step { number, text } => out.push_str(&format!("{}. {}\n", number, text)),
            Block::EmptySection(section) => {
                out.push_str(&format!("_{}_\n", section.empty_notice()))
            }
            Block::ReviewNotice(text) => out.push_str(&format!("\n---\n\n*{}*\n", text)),
        }
    }
    out
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

// ── Writing ──────────────────────────────────────────────────────────────

/// Render `record` and write it to `path`, creating parent directories.
///
/// # Errors
/// `OutputWriteFailed` / `DocumentBuildFailed`, both of kind `WriteError`.
pub fn write_document(
    record: &MigrationRecord,
    path: &Path,
    format: OutputFormat,
) -> Result<(), MigrationError> {
    let bytes = render_to_bytes(record, format)?;
    let write_err = |source: std::io::Error| MigrationError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    // Temp file + rename: the target only ever holds a complete document.
    let mut tmp = tempfile::Builder::new()
        .prefix(".sop2docx-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(write_err)?;
    tmp.write_all(&bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    info!("Document written: {}", path.display());
    Ok(())
}
