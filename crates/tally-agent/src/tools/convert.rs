use super::{RegisteredTool, ToolExecutor, required_string_array_argument};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};
use tally_llm::ToolDefinition;

/// External-code prefix to standard-code category.
const CODE_MAPPING_RULES: &[(&str, char)] = &[
    ("EXT-PROD", 'A'),
    ("EXT-SVC", 'B'),
    ("EXT-MAT", 'C'),
    ("VENDOR", 'V'),
    ("PARTNER", 'P'),
];

const STANDARD_PREFIX: &str = "STD";
const FALLBACK_CATEGORY: char = 'X';

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub external_code: String,
    pub standard_code: String,
    pub category: String,
    pub known_pattern: bool,
}

fn code_number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"(\d+)").expect("code number pattern should compile"))
}

fn extract_code_number(external_code: &str) -> String {
    code_number_regex()
        .find(external_code)
        .map(|found| found.as_str().to_string())
        .unwrap_or_else(|| "000".to_string())
}

/// Map one external code onto the internal standard code scheme.
///
/// Unknown prefixes still convert, under the fallback category, so a report
/// can always be produced.
pub fn convert_single_code(external_code: &str) -> ConversionRecord {
    let normalized = external_code.trim().to_ascii_uppercase();
    let number = extract_code_number(&normalized);

    for (prefix, category) in CODE_MAPPING_RULES {
        if normalized.starts_with(prefix) {
            return ConversionRecord {
                external_code: normalized.clone(),
                standard_code: format!("{STANDARD_PREFIX}-{:0>3}-{category}", number),
                category: category.to_string(),
                known_pattern: true,
            };
        }
    }

    ConversionRecord {
        external_code: normalized,
        standard_code: format!("{STANDARD_PREFIX}-{:0>3}-{FALLBACK_CATEGORY}", number),
        category: FALLBACK_CATEGORY.to_string(),
        known_pattern: false,
    }
}

pub(super) fn convert_codes_tool() -> RegisteredTool {
    let executor: ToolExecutor = Arc::new(|arguments, _context| {
        Box::pin(async move {
            let external_codes = required_string_array_argument(&arguments, "external_codes")?;
            let conversions: Vec<Value> = external_codes
                .iter()
                .map(|code| {
                    serde_json::to_value(convert_single_code(code)).unwrap_or(Value::Null)
                })
                .collect();
            Ok(Value::Array(conversions))
        })
    });

    RegisteredTool {
        definition: ToolDefinition {
            name: super::CONVERT_CODES_TOOL.to_string(),
            description: "Convert external system codes into internal standard codes. \
                          Returns one conversion record per input code."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["external_codes"],
                "properties": {
                    "external_codes": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "External codes, e.g. ['EXT-PROD-001', 'VENDOR-123']"
                    }
                },
                "additionalProperties": false
            }),
        },
        executor,
    }
}
