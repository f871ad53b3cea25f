//! A narrow JSON-Schema-lite validator: enough to catch missing required
//! fields and primitive type mismatches before a tool handler runs. Not a
//! general-purpose `jsonschema` implementation — the registry only needs to
//! validate flat-ish object schemas tools declare for themselves.

use serde_json::Value;

/// A single validation failure: either a missing required property or a
/// type mismatch on a present one.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    MissingRequired(String),
    TypeMismatch { field: String, expected: String, got: String },
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaViolation::MissingRequired(field) => {
                write!(f, "missing required field '{field}'")
            }
            SchemaViolation::TypeMismatch { field, expected, got } => {
                write!(f, "field '{field}' expected type {expected}, got {got}")
            }
        }
    }
}

/// Validate `args` against a JSON Schema object shaped like
/// `{"type": "object", "properties": {...}, "required": [...]}`.
///
/// Schemas lacking `properties`/`required` are treated as permissive (no
/// violations); this is a best-effort guard, not a full schema engine.
pub fn validate(schema: &Value, args: &Value) -> Result<(), SchemaViolation> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return Ok(());
    };

    for field in required {
        let Some(field_name) = field.as_str() else { continue };
        if args.get(field_name).is_none() {
            return Err(SchemaViolation::MissingRequired(field_name.to_string()));
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (field_name, field_schema) in properties {
            let Some(value) = args.get(field_name) else { continue };
            let Some(expected_type) = field_schema.get("type").and_then(Value::as_str) else {
                continue;
            };
            if !matches_json_type(value, expected_type) {
                return Err(SchemaViolation::TypeMismatch {
                    field: field_name.clone(),
                    expected: expected_type.to_string(),
                    got: json_type_name(value).to_string(),
                });
            }
        }
    }

    Ok(())
}

fn matches_json_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
