//! Input field declarations.
//!
//! On the wire a field is `{name, type, description, required, data?}`
//! where `data` holds kind-specific constraints. In memory the constraints
//! live on the [`FieldKind`] variant they belong to.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Wire name of a field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Option,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Option => "option",
        };
        write!(f, "{s}")
    }
}

/// Declared bounds for a numeric field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<f64>,
}

impl NumberBounds {
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// Field kind together with its constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number(NumberBounds),
    Boolean,
    /// Allowed values.
    Option(Vec<String>),
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::String => FieldType::String,
            Self::Number(_) => FieldType::Number,
            Self::Boolean => FieldType::Boolean,
            Self::Option(_) => FieldType::Option,
        }
    }
}

/// One accepted input of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireInputField", into = "WireInputField")]
pub struct InputField {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    pub required: bool,
}

impl InputField {
    fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub fn number(
        name: impl Into<String>,
        description: impl Into<String>,
        bounds: NumberBounds,
    ) -> Self {
        Self::new(name, FieldKind::Number(bounds), description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    pub fn option<I, S>(name: impl Into<String>, description: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(name, FieldKind::Option(options), description)
    }

    /// Mark the field as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireInputField {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    description: String,
    #[serde(default = "default_required")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Map<String, serde_json::Value>>,
}

fn default_required() -> bool {
    true
}

impl TryFrom<WireInputField> for InputField {
    type Error = SchemaError;

    fn try_from(wire: WireInputField) -> Result<Self, Self::Error> {
        let data = wire.data.unwrap_or_default();
        let kind = match wire.field_type {
            FieldType::String => FieldKind::String,
            FieldType::Boolean => FieldKind::Boolean,
            FieldType::Number => {
                let bound = |key: &str| -> Result<Option<f64>, SchemaError> {
                    match data.get(key) {
                        None | Some(serde_json::Value::Null) => Ok(None),
                        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
                            SchemaError::BoundNotNumber {
                                field: wire.name.clone(),
                                key: key.to_string(),
                            }
                        }),
                    }
                };
                FieldKind::Number(NumberBounds {
                    min: bound("min")?,
                    max: bound("max")?,
                    default: bound("default")?,
                })
            }
            FieldType::Option => {
                let options = match data.get("options") {
                    None => Vec::new(),
                    Some(serde_json::Value::Array(items)) => items
                        .iter()
                        .map(|item| {
                            option_value(item).ok_or_else(|| SchemaError::BadOption {
                                field: wire.name.clone(),
                                entry: item.to_string(),
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(_) => {
                        return Err(SchemaError::OptionsNotArray { field: wire.name });
                    }
                };
                FieldKind::Option(options)
            }
        };

        Ok(Self {
            name: wire.name,
            kind,
            description: wire.description,
            required: wire.required,
        })
    }
}

/// Options are plain strings, or `{value, label}` objects from richer clients.
fn option_value(item: &serde_json::Value) -> Option<String> {
    match item {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => obj.get("value")?.as_str().map(str::to_string),
        _ => None,
    }
}

impl From<InputField> for WireInputField {
    fn from(field: InputField) -> Self {
        let field_type = field.kind.field_type();
        let data = match field.kind {
            FieldKind::String | FieldKind::Boolean => None,
            FieldKind::Number(bounds) => {
                let mut data = serde_json::Map::new();
                for (key, value) in [
                    ("min", bounds.min),
                    ("max", bounds.max),
                    ("default", bounds.default),
                ] {
                    if let Some(value) = value {
                        data.insert(key.to_string(), serde_json::json!(value));
                    }
                }
                (!data.is_empty()).then_some(data)
            }
            FieldKind::Option(options) => {
                let mut data = serde_json::Map::new();
                data.insert("options".to_string(), serde_json::json!(options));
                Some(data)
            }
        };

        Self {
            name: field.name,
            field_type,
            description: field.description,
            required: field.required,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn option_field_wire_shape() {
        let field = InputField::option("fmt", "Output format", ["a", "b"]).optional();
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "fmt",
                "type": "option",
                "description": "Output format",
                "required": false,
                "data": {"options": ["a", "b"]}
            })
        );
    }

    #[test]
    fn string_field_has_no_data() {
        let value = serde_json::to_value(InputField::string("task", "The task")).unwrap();
        assert!(value.get("data").is_none());
        assert_eq!(value["type"], "string");
        assert_eq!(value["required"], true);
    }

    #[test]
    fn number_field_parses_bounds() {
        let field: InputField = serde_json::from_value(json!({
            "name": "word_count",
            "type": "number",
            "description": "Target word count",
            "required": false,
            "data": {"min": 100, "max": 5000, "default": 500}
        }))
        .unwrap();

        match &field.kind {
            FieldKind::Number(bounds) => {
                assert_eq!(bounds.min, Some(100.0));
                assert_eq!(bounds.max, Some(5000.0));
                assert_eq!(bounds.default, Some(500.0));
                assert!(bounds.contains(100.0));
                assert!(!bounds.contains(5001.0));
            }
            other => panic!("expected number, got {other:?}"),
        }
        assert!(!field.required);
    }

    #[test]
    fn required_defaults_to_true() {
        let field: InputField =
            serde_json::from_value(json!({"name": "topic", "type": "string"})).unwrap();
        assert!(field.required);
        assert_eq!(field.description, "");
    }

    #[test]
    fn labelled_options_use_value() {
        let field: InputField = serde_json::from_value(json!({
            "name": "tone",
            "type": "option",
            "data": {"options": [{"value": "casual", "label": "Casual"}, "formal"]}
        }))
        .unwrap();
        assert_eq!(
            field.kind,
            FieldKind::Option(vec!["casual".into(), "formal".into()])
        );
    }

    #[test]
    fn bad_bound_is_rejected() {
        let result: Result<InputField, _> = serde_json::from_value(json!({
            "name": "n",
            "type": "number",
            "data": {"min": "low"}
        }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Field n: data.min must be a number"), "{err}");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<InputField, _> =
            serde_json::from_value(json!({"name": "n", "type": "date"}));
        assert!(result.is_err());
    }
}
