use super::{RegisteredTool, ToolExecutor};
use crate::ToolError;
use serde_json::{Value, json};
use std::sync::Arc;
use tally_llm::ToolDefinition;

fn render_markdown_report(aggregated: &Value, details: &[Value]) -> Result<String, ToolError> {
    let aggregated = aggregated.as_object().ok_or_else(|| {
        ToolError::Validation("argument 'aggregated_data' must be an object".to_string())
    })?;

    let mut lines = vec![
        "# Standard Code Aggregation Report".to_string(),
        String::new(),
        "## Totals".to_string(),
        String::new(),
        "| Standard Code | Total Quantity |".to_string(),
        "|---------------|----------------|".to_string(),
    ];

    let mut total_quantity: i64 = 0;
    let mut sorted: Vec<(&String, &Value)> = aggregated.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    for (code, quantity) in sorted {
        let quantity = quantity.as_i64().unwrap_or_default();
        lines.push(format!("| {code} | {quantity} |"));
        total_quantity += quantity;
    }

    lines.extend([
        String::new(),
        format!("**Distinct codes**: {}", aggregated.len()),
        format!("**Total quantity**: {total_quantity}"),
        String::new(),
        "## Conversion Details".to_string(),
        String::new(),
        "| External Code | Standard Code | Category |".to_string(),
        "|---------------|---------------|----------|".to_string(),
    ]);

    for detail in details {
        let field = |key: &str| {
            detail
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string()
        };
        lines.push(format!(
            "| {} | {} | {} |",
            field("external_code"),
            field("standard_code"),
            field("category"),
        ));
    }

    Ok(lines.join("\n"))
}

pub(super) fn markdown_report_tool() -> RegisteredTool {
    let executor: ToolExecutor = Arc::new(|arguments, _context| {
        Box::pin(async move {
            let aggregated = arguments.get("aggregated_data").cloned().ok_or_else(|| {
                ToolError::Validation("missing required argument 'aggregated_data'".to_string())
            })?;
            let details = arguments
                .get("conversion_details")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let report = render_markdown_report(&aggregated, &details)?;
            Ok(Value::String(report))
        })
    });

    RegisteredTool {
        definition: ToolDefinition {
            name: super::MARKDOWN_REPORT_TOOL.to_string(),
            description: "Render the aggregated data as a markdown report with a totals \
                          table and the conversion detail rows."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["aggregated_data"],
                "properties": {
                    "aggregated_data": {
                        "type": "object",
                        "description": "Standard code to total quantity mapping"
                    },
                    "conversion_details": {
                        "type": "array",
                        "description": "Conversion records from convert_codes"
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
    fn report_contains_totals_and_detail_rows() {
        let aggregated = json!({"STD-001-A": 7, "STD-002-B": 3});
        let details = vec![
            json!({"external_code": "EXT-PROD-001", "standard_code": "STD-001-A", "category": "A"}),
            json!({"external_code": "EXT-SVC-002", "standard_code": "STD-002-B", "category": "B"}),
        ];

        let report =
            render_markdown_report(&aggregated, &details).expect("report should render");
        assert!(report.starts_with("# Standard Code Aggregation Report"));
        assert!(report.contains("| STD-001-A | 7 |"));
        assert!(report.contains("**Total quantity**: 10"));
        assert!(report.contains("| EXT-SVC-002 | STD-002-B | B |"));
    }

    #[test]
    fn codes_render_in_sorted_order() {
        let aggregated = json!({"STD-900-X": 1, "STD-001-A": 1});
        let report = render_markdown_report(&aggregated, &[]).expect("report should render");
        let first = report.find("STD-001-A").expect("first code present");
        let second = report.find("STD-900-X").expect("second code present");
        assert!(first < second);
    }

    #[test]
    fn non_object_aggregate_expected_validation_error() {
        let error = render_markdown_report(&json!([1, 2]), &[]).unwrap_err();
        assert!(matches!(error, ToolError::Validation(_)));
    }
}
