//! Best-effort instruction parsing.
//!
//! Extracts external codes and quantities from free text. Extraction is a
//! convenience, not a contract: anything unparseable falls back to a default
//! single-item payload with the instruction text intact.

use regex::Regex;
use std::sync::OnceLock;
use tally_controller::RunInstruction;

const DEFAULT_CODE: &str = "EXT-DEMO";

fn code_pattern() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"([A-Z]+-[A-Z]+-\d+)").expect("code pattern should compile"))
}

fn quantity_pattern() -> &'static Regex {
    static QUANTITY: OnceLock<Regex> = OnceLock::new();
    QUANTITY.get_or_init(|| Regex::new(r"(\d+)개").expect("quantity pattern should compile"))
}

pub fn parse_instruction(text: &str) -> RunInstruction {
    let external_codes: Vec<String> = code_pattern()
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect();

    if external_codes.is_empty() {
        return RunInstruction {
            instruction: Some(text.to_string()),
            external_codes: vec![DEFAULT_CODE.to_string()],
            quantities: vec![1],
        };
    }

    let quantities: Vec<i64> = quantity_pattern()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .filter_map(|digits| digits.as_str().parse().ok())
        .collect();

    let quantities = if quantities.len() == external_codes.len() {
        quantities
    } else if quantities.len() == 1 {
        // One count means: that many of each item.
        vec![quantities[0]; external_codes.len()]
    } else {
        vec![1; external_codes.len()]
    };

    RunInstruction {
        instruction: Some(text.to_string()),
        external_codes,
        quantities,
    }
}
