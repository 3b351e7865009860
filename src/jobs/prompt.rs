//! Effective prompt composition from submitted input.

use serde_json::Value;

use super::model::InputData;

/// Render an input value as prompt text. Null and empty strings count as
/// absent; non-string values use their JSON rendering.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build the prompt handed to the executor: the task, then the context if
/// any, then the output-format instruction if any.
pub fn compose_prompt(input: &InputData) -> String {
    let mut prompt = text_of(input.get("task")).unwrap_or_default();

    if let Some(context) = text_of(input.get("context")) {
        prompt.push_str("\n\nContext: ");
        prompt.push_str(&context);
    }

    if let Some(format) = text_of(input.get("output_format")) {
        prompt.push_str(&format!(
            "\n\nPlease provide the response in {format} format."
        ));
    }

    prompt
}
