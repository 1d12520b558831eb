//! The output-schema constraint sent with every extraction call.
//!
//! The constraint is pure data: a JSON Schema document describing the
//! [`crate::record::MigrationRecord`] fields. It is embedded in the system
//! prompt and travels with the request to the model layer, which is
//! responsible for enforcing it (JSON mode). Validation of what comes back
//! still happens on our side, in [`crate::record::RecordDraft::into_record`].

use serde_json::{json, Value};

/// A named JSON Schema the model output must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaConstraint {
    name: String,
    schema: Value,
}

impl SchemaConstraint {
    /// Build a constraint from an arbitrary JSON Schema object.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// The standardized SOP schema.
    pub fn migration_record() -> Self {
        let text = |description: &str| json!({ "type": "string", "description": description });
        let list = |description: &str| {
            json!({
                "type": "array",
                "items": { "type": "string" },
                "description": description
            })
        };

        Self::new(
            "migration_record",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "title": "MigrationRecord",
                "description": "Standardized Standard Operating Procedure. Every field must be populated.",
                "type": "object",
                "additionalProperties": false,
                "required": FIELDS,
                "properties": {
                    "title": text("The standardized, professional title of the procedure"),
                    "document_id": text("A unique document identifier, e.g. SOP-2024-001"),
                    "version": text("The new standardized version number, e.g. 2.0"),
                    "department": text("The responsible department or area, e.g. Manufacturing, Quality Control"),
                    "safety_warnings": list("Complete list of ALL safety precautions, warnings, cautions and PPE requirements in the document"),
                    "equipment": list("List of all tools, instruments, and equipment required"),
                    "steps": list("Sequential, clearly written execution steps in imperative form, in procedure order"),
                    "confidence_score": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 10,
                        "description": "Self-assessed score (1-10) of how completely and accurately all information was extracted. 10 = everything captured, 1 = significant data likely missing."
                    }
                }
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Names of the required top-level fields, in declaration order.
    pub fn required_fields(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Pretty-printed schema for inclusion in a prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.schema).unwrap_or_else(|_| self.schema.to_string())
    }
}

impl Default for SchemaConstraint {
    fn default() -> Self {
        Self::migration_record()
    }
}

/// Record fields in template order.
pub const FIELDS: [&str; 8] = [
    "title",
    "document_id",
    "version",
    "department",
    "safety_warnings",
    "equipment",
    "steps",
    "confidence_score",
];
