//! Argument validation: checks a raw JSON argument payload against a
//! [`ToolDefinition`] before the executor invokes the underlying function.

use super::definition::{ToolDefinition, ToolParameterType};
use super::error::ToolError;
use serde_json::Value as JsonValue;

/// Parse `args_json` and check it against `def`. On success, returns the
/// parsed JSON object so the caller doesn't have to parse twice.
///
/// Unknown parameters present in the payload are ignored (forward
/// compatible); every declared parameter is checked for presence (if
/// required), enum membership (if declared), and type compatibility.
pub fn validate_args(def: &ToolDefinition, args_json: &str) -> Result<JsonValue, ToolError> {
    let parsed: JsonValue = serde_json::from_str(args_json).map_err(|e| {
        ToolError::validation(&def.name, format!("arguments are not valid JSON: {}", e))
    })?;

    let object = parsed.as_object().ok_or_else(|| {
        ToolError::validation(&def.name, "arguments must be a JSON object".to_string())
    })?;

    let mut problems = Vec::new();

    for param in &def.parameters {
        let value = object.get(&param.name);

        match value {
            None => {
                if param.required && param.default.is_none() {
                    problems.push(format!("{}: required parameter missing", param.name));
                }
                continue;
            }
            Some(v) => {
                if let Some(allowed) = &param.enum_values {
                    let as_str = v.as_str();
                    let ok = as_str.map(|s| allowed.iter().any(|a| a == s)).unwrap_or(false);
                    if !ok {
                        problems.push(format!(
                            "{}: value {} is not one of the allowed values {:?}",
                            param.name, v, allowed
                        ));
                        continue;
                    }
                }

                if !type_matches(&param.param_type, v) {
                    problems.push(format!(
                        "{}: expected {:?}, got {}",
                        param.name, param.param_type, type_name(v)
                    ));
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(parsed)
    } else {
        Err(ToolError::validation(&def.name, problems.join("; ")))
    }
}

fn type_matches(expected: &ToolParameterType, value: &JsonValue) -> bool {
    match expected {
        ToolParameterType::String => value.is_string(),
        ToolParameterType::Boolean => value.is_boolean(),
        ToolParameterType::Array => value.is_array(),
        ToolParameterType::Object => value.is_object(),
        ToolParameterType::Number => value.is_number(),
        ToolParameterType::Integer => value
            .as_f64()
            .map(|f| f.fract() == 0.0)
            .unwrap_or(false),
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::definition::ToolParameter;

    fn def() -> ToolDefinition {
        ToolDefinition::new("search", "search the web")
            .with_parameter(ToolParameter::new("query", ToolParameterType::String).required())
            .with_parameter(
                ToolParameter::new("limit", ToolParameterType::Integer)
                    .with_default(serde_json::json!(10)),
            )
            .with_parameter(
                ToolParameter::new("scope", ToolParameterType::String)
                    .with_enum(vec!["user", "global"]),
            )
    }

    #[test]
    fn accepts_well_formed_arguments() {
        let result = validate_args(&def(), r#"{"query":"rust","limit":5,"scope":"user"}"#);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_missing_required_parameter() {
        let result = validate_args(&def(), r#"{"limit":5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_wrong_type() {
        let result = validate_args(&def(), r#"{"query":"rust","limit":"lots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_out_of_enum_value() {
        let result = validate_args(&def(), r#"{"query":"rust","scope":"other"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn ignores_unknown_parameters() {
        let result = validate_args(&def(), r#"{"query":"rust","extra":true}"#);
        assert!(result.is_ok());
    }

    #[test]
    fn integer_rejects_fractional_numbers() {
        let result = validate_args(&def(), r#"{"query":"rust","limit":5.5}"#);
        assert!(result.is_err());
    }
}
