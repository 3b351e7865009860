//! Input schema: field declarations and the submission gate.

pub mod field;
pub mod validator;

pub use field::{FieldKind, FieldType, InputField, NumberBounds};
pub use validator::{ValidationMode, validate, validate_strict, validate_with};

use std::collections::HashSet;
use std::path::Path;

use crate::error::{ConfigError, SchemaError};

/// Built-in schema: a required task plus optional context, output format and
/// token budget.
pub fn default_schema() -> Vec<InputField> {
    vec![
        InputField::string("task", "The main task or request for the agent to process"),
        InputField::string("context", "Additional context or background information").optional(),
        InputField::option(
            "output_format",
            "Preferred output format",
            ["detailed", "summary", "bullet_points"],
        )
        .optional(),
        InputField::number(
            "max_tokens",
            "Maximum tokens in response (100-4000)",
            NumberBounds {
                min: Some(100.0),
                max: Some(4000.0),
                default: Some(1000.0),
            },
        )
        .optional(),
    ]
}

/// Parse a schema document. Accepts either a bare array of fields or the
/// `{"input": [...]}` shape served by `/input_schema`.
pub fn parse_schema(json: &str) -> Result<Vec<InputField>, SchemaError> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Document {
        Bare(Vec<InputField>),
        Wrapped { input: Vec<InputField> },
    }

    let fields = match serde_json::from_str::<Document>(json)? {
        Document::Bare(fields) | Document::Wrapped { input: fields } => fields,
    };

    let mut seen = HashSet::new();
    for field in &fields {
        if field.name.is_empty() {
            return Err(SchemaError::EmptyFieldName);
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                name: field.name.clone(),
            });
        }
    }
    Ok(fields)
}

/// Load a schema from a JSON file.
pub fn load_schema(path: &Path) -> Result<Vec<InputField>, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    parse_schema(&raw).map_err(|source| ConfigError::Schema {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_requires_only_task() {
        let schema = default_schema();
        let required: Vec<&str> = schema
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(required, vec!["task"]);
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn parse_wrapped_document() {
        let fields = parse_schema(
            r#"{"input": [{"name": "topic", "type": "string", "description": "Topic"}]}"#,
        )
        .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "topic");
    }

    #[test]
    fn parse_bare_array() {
        let fields = parse_schema(
            r#"[{"name": "code", "type": "string", "required": true},
                {"name": "language", "type": "option", "required": false,
                 "data": {"options": ["rust", "python"]}}]"#,
        )
        .unwrap();
        assert_eq!(fields.len(), 2);
        assert!(!fields[1].required);
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = parse_schema(
            r#"[{"name": "a", "type": "string"}, {"name": "a", "type": "number"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { ref name } if name == "a"));
    }

    #[test]
    fn default_schema_survives_wire_round_trip() {
        let schema = default_schema();
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(parse_schema(&json).unwrap(), schema);
    }

    #[test]
    fn malformed_json_is_schema_error() {
        assert!(matches!(
            parse_schema("{not json"),
            Err(SchemaError::Json(_))
        ));
        assert!(matches!(
            parse_schema(r#"[{"name": "", "type": "string"}]"#),
            Err(SchemaError::EmptyFieldName)
        ));
    }

    #[test]
    fn load_invalid_file_names_path() {
        let path = std::env::temp_dir().join(format!("schema-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"[{"name": "a", "type": "string"}, {"name": "a", "type": "string"}]"#)
            .unwrap();

        let err = load_schema(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            err,
            ConfigError::Schema {
                source: SchemaError::DuplicateField { .. },
                ..
            }
        ));
        assert!(err.to_string().contains("Duplicate field name: a"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_schema(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
