//! Prompts for LLM-based SOP extraction.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the extraction rules requires
//!    editing exactly one place.
//!
//! 2. **Testability** — unit tests can import and inspect prompts directly
//!    without calling a real model, making prompt regressions easy to catch.
//!
//! Callers can override the default via [`crate::config::MigrationConfig::system_prompt`];
//! the schema block is appended to either prompt so the constraint always
//! travels with the request.

use crate::schema::SchemaConstraint;

/// Default system prompt for extracting a [`crate::record::MigrationRecord`].
///
/// `{version}` is replaced by the configured document version, see
/// [`extraction_prompt`].
pub const EXTRACTION_PROMPT: &str = r#"You are a senior Quality Assurance Document Specialist for a manufacturing organisation.

Your task is to read a messy, unstructured Standard Operating Procedure (SOP) and extract ALL relevant information into a clean, standardized JSON object.

Follow these rules precisely:

1. TITLE
   - Create a professional, standardized title for the procedure
   - Infer it from the content when the document has no explicit title

2. DOCUMENT ID
   - Reuse the identifier from the source if there is one
   - Otherwise generate a plausible id in the format "SOP-YYYY-NNN"

3. VERSION
   - Assign version "{version}" (this is the first standardized migration)

4. DEPARTMENT
   - Infer the responsible department or area from context when it is not stated

5. SAFETY WARNINGS
   - Enumerate EVERY safety-relevant sentence: warnings, cautions, danger notices,
     PPE requirements, lockout/tagout and EHS references
   - One entry per warning. Do NOT summarise several warnings into one entry
   - Do NOT miss any. Rewrite each clearly and professionally

6. EQUIPMENT
   - List ALL tools, instruments, materials and equipment mentioned
   - Standardize names; one item per entry

7. STEPS
   - Extract the procedural steps in execution order
   - Write each step as a clear, imperative instruction; remove informal tone
   - Do NOT prefix steps with numbers; ordering is given by the list itself

8. CONFIDENCE SCORE
   - Rate 1-10 how confident you are that you captured ALL information from the
     source, based on how clear and complete the source was
   - Be honest: if the source was very messy, a score of 7-8 is fine

9. OUTPUT FORMAT
   - Output ONLY a single JSON object conforming to the schema below
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary or explanations"#;

/// The default prompt with the version rule filled in.
pub fn extraction_prompt(version: &str) -> String {
    EXTRACTION_PROMPT.replace("{version}", version)
}

/// Append the schema constraint to a system prompt.
pub fn with_schema(prompt: &str, schema: &SchemaConstraint) -> String {
    format!(
        "{prompt}\n\nJSON Schema ({name}):\n{schema}",
        name = schema.name(),
        schema = schema.to_prompt_json()
    )
}

/// Wrap the source document for the user turn.
pub fn document_message(document_text: &str) -> String {
    format!(
        "Source Document:\n---\n{}\n---\n\nExtract the data now. Return ONLY the structured JSON.",
        document_text
    )
}
