mod aggregate;
mod convert;
mod finance;
mod memory;
mod registry;
mod report;

use crate::ToolError;
use serde_json::Value;
use tally_llm::{ToolCall, ToolResult};

pub use convert::{ConversionRecord, convert_single_code};
pub use registry::{RegisteredTool, ToolDispatchOptions, ToolExecutor, ToolFuture, ToolRegistry};

pub const CONVERT_CODES_TOOL: &str = "convert_codes";
pub const AGGREGATE_TOOL: &str = "aggregate_by_standard_code";
pub const MARKDOWN_REPORT_TOOL: &str = "generate_markdown_report";
pub const GET_EXCHANGE_RATE_TOOL: &str = "get_exchange_rate";
pub const SAVE_USER_PREFERENCE_TOOL: &str = "save_user_preference";

/// Registry with the full report-generation tool set.
pub fn build_report_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(convert::convert_codes_tool());
    registry.register(aggregate::aggregate_tool());
    registry.register(report::markdown_report_tool());
    registry.register(finance::exchange_rate_tool());
    registry.register(memory::save_user_preference_tool());
    registry
}

fn required_string_argument(arguments: &Value, key: &str) -> Result<String, ToolError> {
    optional_string_argument(arguments, key)?
        .ok_or_else(|| ToolError::Validation(format!("missing required argument '{}'", key)))
}

fn optional_string_argument(arguments: &Value, key: &str) -> Result<Option<String>, ToolError> {
    let Some(value) = arguments.get(key) else {
        return Ok(None);
    };
    let Some(value) = value.as_str() else {
        return Err(ToolError::Validation(format!(
            "argument '{}' must be a string",
            key
        )));
    };
    Ok(Some(value.to_string()))
}

fn required_string_array_argument(arguments: &Value, key: &str) -> Result<Vec<String>, ToolError> {
    let Some(value) = arguments.get(key) else {
        return Err(ToolError::Validation(format!(
            "missing required argument '{}'",
            key
        )));
    };
    let Some(items) = value.as_array() else {
        return Err(ToolError::Validation(format!(
            "argument '{}' must be an array",
            key
        )));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ToolError::Validation(format!("argument '{}' must contain only strings", key))
            })
        })
        .collect()
}

fn tool_error_result(tool_call_id: String, message: String) -> ToolResult {
    ToolResult {
        tool_call_id,
        content: Value::String(message),
        is_error: true,
    }
}

pub fn parse_tool_arguments(tool_call: &ToolCall) -> Result<Value, ToolError> {
    if let Some(raw_arguments) = &tool_call.raw_arguments {
        let parsed = serde_json::from_str::<Value>(raw_arguments).map_err(|error| {
            ToolError::Validation(format!(
                "invalid JSON arguments for tool '{}': {}",
                tool_call.name, error
            ))
        })?;
        return Ok(parsed);
    }

    Ok(tool_call.arguments.clone())
}

/// Check a JSON argument object against a tool's declared schema.
///
/// Enforces the object root, `required` keys, per-property `type` names, and
/// `additionalProperties: false` where declared. This is the same validator
/// applied to operator-edited arguments before a resumed run executes them.
pub fn validate_tool_arguments(schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    let object = arguments
        .as_object()
        .ok_or_else(|| ToolError::Validation("tool arguments must be a JSON object".to_string()))?;

    let schema_object = schema.as_object().ok_or_else(|| {
        ToolError::Validation("tool schema root must be a JSON object".to_string())
    })?;

    if schema_object
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|schema_type| schema_type != "object")
    {
        return Err(ToolError::Validation(
            "tool schema root type must be 'object'".to_string(),
        ));
    }

    if let Some(required) = schema_object.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(key) {
                return Err(ToolError::Validation(format!(
                    "missing required argument '{}'",
                    key
                )));
            }
        }
    }

    let properties = schema_object
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let additional_allowed = schema_object
        .get("additionalProperties")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    for (key, value) in object {
        let Some(property) = properties.get(key) else {
            if additional_allowed {
                continue;
            }
            return Err(ToolError::Validation(format!(
                "unexpected argument '{}' not allowed by schema",
                key
            )));
        };

        if let Some(type_name) = property.get("type").and_then(Value::as_str) {
            let is_valid = match type_name {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                "null" => value.is_null(),
                _ => true,
            };

            if !is_valid {
                return Err(ToolError::Validation(format!(
                    "argument '{}' expected type '{}' but received '{}'",
                    key,
                    type_name,
                    json_type_name(value)
                )));
            }
        }
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    if value.is_null() {
        "null"
    } else if value.is_boolean() {
        "boolean"
    } else if value.is_string() {
        "string"
    } else if value.is_number() {
        "number"
    } else if value.is_array() {
        "array"
    } else {
        "object"
    }
}
