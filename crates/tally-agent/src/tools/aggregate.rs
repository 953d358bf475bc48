use super::{RegisteredTool, ToolExecutor};
use crate::ToolError;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_llm::ToolDefinition;

/// Sum quantities per standard code. Conversion entries without a
/// `standard_code` field aggregate under `UNKNOWN`; surplus quantities
/// (or conversions) beyond the shorter list are ignored.
fn aggregate(conversions: &[Value], quantities: &[i64]) -> BTreeMap<String, i64> {
    let mut aggregated: BTreeMap<String, i64> = BTreeMap::new();
    for (conversion, quantity) in conversions.iter().zip(quantities.iter()) {
        let standard_code = conversion
            .get("standard_code")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        *aggregated.entry(standard_code.to_string()).or_insert(0) += quantity;
    }
    aggregated
}

pub(super) fn aggregate_tool() -> RegisteredTool {
    let executor: ToolExecutor = Arc::new(|arguments, _context| {
        Box::pin(async move {
            let conversions = arguments
                .get("conversions")
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| {
                    ToolError::Validation("argument 'conversions' must be an array".to_string())
                })?;
            let quantities = arguments
                .get("quantities")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ToolError::Validation("argument 'quantities' must be an array".to_string())
                })?
                .iter()
                .map(|value| {
                    value.as_i64().ok_or_else(|| {
                        ToolError::Validation(
                            "argument 'quantities' must contain only integers".to_string(),
                        )
                    })
                })
                .collect::<Result<Vec<i64>, ToolError>>()?;

            let aggregated = aggregate(&conversions, &quantities);
            let mut output = Map::new();
            for (code, total) in aggregated {
                output.insert(code, Value::from(total));
            }
            Ok(Value::Object(output))
        })
    });

    RegisteredTool {
        definition: ToolDefinition {
            name: super::AGGREGATE_TOOL.to_string(),
            description: "Aggregate item quantities per converted standard code. \
                          Returns a mapping of standard code to total quantity."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["conversions", "quantities"],
                "properties": {
                    "conversions": {
                        "type": "array",
                        "description": "Conversion records from convert_codes"
                    },
                    "quantities": {
                        "type": "array",
                        "items": { "type": "integer" },
                        "description": "Quantity per conversion, same order"
                    }
                },
                "additionalProperties": false
            }),
        },
        executor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_sum_per_standard_code() {
        let conversions = vec![
            json!({"standard_code": "STD-001-A"}),
            json!({"standard_code": "STD-002-B"}),
            json!({"standard_code": "STD-001-A"}),
        ];
        let aggregated = aggregate(&conversions, &[2, 3, 5]);
        assert_eq!(aggregated["STD-001-A"], 7);
        assert_eq!(aggregated["STD-002-B"], 3);
    }

    #[test]
    fn missing_standard_code_aggregates_under_unknown() {
        let conversions = vec![json!({"external_code": "???"})];
        let aggregated = aggregate(&conversions, &[4]);
        assert_eq!(aggregated["UNKNOWN"], 4);
    }

    #[test]
    fn surplus_quantities_are_ignored() {
        let conversions = vec![json!({"standard_code": "STD-001-A"})];
        let aggregated = aggregate(&conversions, &[1, 9, 9]);
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated["STD-001-A"], 1);
    }
}
