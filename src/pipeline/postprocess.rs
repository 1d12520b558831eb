//! Post-processing: deterministic cleanup of model output.
//!
//! Even with JSON mode and a schema in the prompt, models occasionally wrap
//! the object in ` ```json ` fences, prefix it with a sentence, or return list
//! entries that still carry the source document's numbering ("3) Remove the
//! cover"). None of these are schema violations in spirit, so they are fixed
//! here with cheap, pure `&str → String` rules instead of failing the run.
//!
//! Two entry points:
//!
//! * [`parse_model_json`] — raw response text → `serde_json::Value`
//! * [`clean_items`] — per-field list cleanup used by record validation

use crate::error::MigrationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Parse the raw model response into a JSON object.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (BOM, zero-width spaces)
/// 2. Strip outer ` ```json ` fences
/// 3. If the text still isn't a bare object, take the outermost `{…}` span
///
/// Anything that is still not a JSON object afterwards is a schema violation.
pub fn parse_model_json(raw: &str) -> Result<Value, MigrationError> {
    let s = remove_invisible_chars(raw);
    let s = strip_json_fences(&s);
    let candidate = outermost_object(&s).unwrap_or(s.trim());

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| MigrationError::schema(format!("response is not valid JSON: {e}")))?;

    if !value.is_object() {
        return Err(MigrationError::schema(format!(
            "expected a JSON object, got {}",
            json_type_name(&value)
        )));
    }
    Ok(value)
}

/// Which list a set of items belongs to; steps get numbering stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Plain,
    Step,
}

/// Clean a list field in place-order: trim, collapse whitespace, strip
/// bullets (and step numbering for [`ItemKind::Step`]), drop blank entries.
///
/// Order is never changed.
pub fn clean_items(items: Vec<String>, kind: ItemKind) -> Vec<String> {
    let before = items.len();
    let cleaned: Vec<String> = items
        .into_iter()
        .map(|item| {
            let s = remove_invisible_chars(&item);
            let s = collapse_whitespace(&s);
            let s = strip_bullet(&s);
            match kind {
                ItemKind::Step => strip_step_numbering(&s),
                ItemKind::Plain => s,
            }
        })
        .filter(|s| !s.is_empty())
        .collect();
    if cleaned.len() < before {
        debug!("Dropped {} blank {:?} item(s)", before - cleaned.len(), kind);
    }
    cleaned
}

/// Trim and collapse internal whitespace of a scalar field.
pub fn clean_scalar(input: &str) -> String {
    collapse_whitespace(&remove_invisible_chars(input))
}

// ── Rule: Strip outer fences ─────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*)\n```\s*$").unwrap());

fn strip_json_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule: Outermost object span ──────────────────────────────────────────────

fn outermost_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    (end > start).then(|| &input[start..=end])
}

// ── Rule: Invisible characters ───────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

// ── Rule: Whitespace ─────────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input.trim(), " ").to_string()
}

// ── Rule: Bullets ────────────────────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*•·▪]\s+").unwrap());

fn strip_bullet(input: &str) -> String {
    RE_BULLET.replace(input, "").to_string()
}

// ── Rule: Step numbering ─────────────────────────────────────────────────────

// "1. ", "2) ", "3: ", "4 - ", "Step 5: ", "STEP 6 -", "(7) "
static RE_STEP_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:step\s*\d{1,3}\s*[.):\-–]?|\(\d{1,3}\)|\d{1,3}\s*[.):]|\d{1,3}\s+[\-–])\s+")
        .unwrap()
});

fn strip_step_numbering(input: &str) -> String {
    RE_STEP_NUMBER.replace(input, "").to_string()
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
