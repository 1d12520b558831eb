//! Pipeline stages for SOP migration.
//!
//! Each submodule implements exactly one transformation step and can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! read ──▶ extract ──▶ render
//! (text/pdfium) (LLM + schema) (docx-rs / Markdown)
//! ```
//!
//! 1. [`read`]    — plain text verbatim, PDF text via pdfium (`spawn_blocking`)
//! 2. [`extract`] — one schema-constrained call through [`model`], then
//!    validation into a [`crate::record::MigrationRecord`]
//! 3. [`render`]  — fixed template written atomically as DOCX or Markdown
//!
//! [`postprocess`] holds the deterministic cleanup applied to model output
//! (fence stripping, bullet and step-number removal).

pub mod extract;
pub mod model;
pub mod postprocess;
pub mod read;
pub mod render;
