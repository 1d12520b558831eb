//! The structured SOP record and its validation.
//!
//! A [`MigrationRecord`] can only be obtained through validation: either
//! [`RecordDraft::into_record`] with an explicit [`RecordPolicy`], or the
//! `TryFrom<RecordDraft>` / `Deserialize` impls which use the default policy.
//! Once built, the record is read-only — fields are private and exposed
//! through accessors, so the renderer cannot mutate it.
//!
//! ## Validation rules
//!
//! | Field | Absent / null | Present |
//! |-------|---------------|---------|
//! | `title` | SchemaViolation | cleaned; blank → SchemaViolation |
//! | `document_id` | SchemaViolation | cleaned; blank → placeholder. Caller-assigned id wins |
//! | `version` | policy default | cleaned; blank → policy default |
//! | `department` | SchemaViolation | cleaned (may be blank) |
//! | list fields | empty list | cleaned, blanks dropped, order kept |
//! | `confidence_score` | SchemaViolation | rounded, clamped into 1–10 |

use crate::error::MigrationError;
use crate::pipeline::postprocess::{clean_items, clean_scalar, ItemKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Version assigned to the first standardized migration of a document.
pub const DEFAULT_VERSION: &str = "2.0";

/// Placeholder used when neither the caller nor the model supplies an id.
pub const PLACEHOLDER_DOCUMENT_ID: &str = "SOP-UNASSIGNED";

/// A standardized Standard Operating Procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordDraft")]
pub struct MigrationRecord {
    title: String,
    document_id: String,
    version: String,
    department: String,
    safety_warnings: Vec<String>,
    equipment: Vec<String>,
    steps: Vec<String>,
    confidence_score: ConfidenceScore,
}

impl MigrationRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn safety_warnings(&self) -> &[String] {
        &self.safety_warnings
    }

    pub fn equipment(&self) -> &[String] {
        &self.equipment
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn confidence_score(&self) -> ConfidenceScore {
        self.confidence_score
    }
}

/// Unvalidated record fields, exactly as the model (or a caller) supplied them.
///
/// Every field is optional so that absence can be distinguished from a
/// wrong type: serde rejects wrong types, validation rejects absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub title: Option<String>,
    pub document_id: Option<String>,
    pub version: Option<String>,
    pub department: Option<String>,
    pub safety_warnings: Option<Vec<String>>,
    pub equipment: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub confidence_score: Option<f64>,
}

/// Caller-side inputs to validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPolicy {
    /// Version used when the model leaves `version` blank. Default: "2.0".
    pub default_version: String,
    /// Caller-assigned document id; overrides whatever the model produced.
    pub document_id: Option<String>,
}

impl Default for RecordPolicy {
    fn default() -> Self {
        Self {
            default_version: DEFAULT_VERSION.to_string(),
            document_id: None,
        }
    }
}

impl RecordDraft {
    /// Parse a JSON value into a draft. Wrong primitive types are schema violations.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MigrationError> {
        serde_json::from_value(value).map_err(|e| MigrationError::schema(e.to_string()))
    }

    /// Validate the draft into an immutable [`MigrationRecord`].
    pub fn into_record(self, policy: &RecordPolicy) -> Result<MigrationRecord, MigrationError> {
        let title = clean_scalar(&required(self.title, "title")?);
        if title.is_empty() {
            return Err(MigrationError::schema("field `title` must not be empty"));
        }

        let model_id = clean_scalar(&required(self.document_id, "document_id")?);
        let document_id = match policy.document_id.as_deref().map(clean_scalar) {
            Some(id) if !id.is_empty() => id,
            _ if !model_id.is_empty() => model_id,
            _ => PLACEHOLDER_DOCUMENT_ID.to_string(),
        };

        let version = self
            .version
            .map(|v| clean_scalar(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| policy.default_version.clone());

        let department = clean_scalar(&required(self.department, "department")?);

        let raw_score = required(self.confidence_score, "confidence_score")?;
        let confidence_score = ConfidenceScore::from_model(raw_score)?;

        Ok(MigrationRecord {
            title,
            document_id,
            version,
            department,
            safety_warnings: clean_items(self.safety_warnings.unwrap_or_default(), ItemKind::Plain),
            equipment: clean_items(self.equipment.unwrap_or_default(), ItemKind::Plain),
            steps: clean_items(self.steps.unwrap_or_default(), ItemKind::Step),
            confidence_score,
        })
    }
}

impl TryFrom<RecordDraft> for MigrationRecord {
    type Error = MigrationError;

    fn try_from(draft: RecordDraft) -> Result<Self, Self::Error> {
        draft.into_record(&RecordPolicy::default())
    }
}

impl From<&MigrationRecord> for RecordDraft {
    fn from(r: &MigrationRecord) -> Self {
        Self {
            title: Some(r.title.clone()),
            document_id: Some(r.document_id.clone()),
            version: Some(r.version.clone()),
            department: Some(r.department.clone()),
            safety_warnings: Some(r.safety_warnings.clone()),
            equipment: Some(r.equipment.clone()),
            steps: Some(r.steps.clone()),
            confidence_score: Some(f64::from(r.confidence_score.get())),
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, MigrationError> {
    value.ok_or_else(|| MigrationError::schema(format!("missing required field `{field}`")))
}

// ── Confidence ───────────────────────────────────────────────────────────

/// Self-assessed extraction quality, always within 1–10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct ConfidenceScore(u8);

impl ConfidenceScore {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Clamp any integer into the valid range.
    pub fn clamped(score: i64) -> Self {
        Self(score.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    /// Convert a model-reported number, rounding fractions and clamping.
    ///
    /// Non-finite values cannot be interpreted and are a schema violation.
    pub fn from_model(raw: f64) -> Result<Self, MigrationError> {
        if !raw.is_finite() {
            return Err(MigrationError::schema(format!(
                "confidence_score must be a finite number, got {raw}"
            )));
        }
        let rounded = raw.round();
        let score = Self::clamped(rounded.clamp(i64::MIN as f64, i64::MAX as f64) as i64);
        if rounded != f64::from(score.0) {
            warn!(
                "confidence_score {} outside {}–{}, clamped to {}",
                raw,
                Self::MIN,
                Self::MAX,
                score.0
            );
        }
        Ok(score)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn band(self) -> ConfidenceBand {
        match self.0 {
            8..=10 => ConfidenceBand::High,
            5..=7 => ConfidenceBand::Medium,
            _ => ConfidenceBand::Low,
        }
    }
}

impl TryFrom<i64> for ConfidenceScore {
    type Error = String;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&v) {
            Ok(Self(v as u8))
        } else {
            Err(format!("confidence score {v} outside 1–10"))
        }
    }
}

impl From<ConfidenceScore> for u8 {
    fn from(s: ConfidenceScore) -> Self {
        s.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// Coarse reading of a [`ConfidenceScore`] for reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceBand {
    /// 8–10: extraction is likely complete.
    High,
    /// 5–7: review recommended.
    Medium,
    /// 1–4: significant information likely missing.
    Low,
}

impl ConfidenceBand {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}
