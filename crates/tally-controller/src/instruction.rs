use serde::{Deserialize, Serialize};

/// Structured payload a run starts from. Produced by the instruction
/// construction layer (best effort); the controller only composes it into the
/// opening user message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInstruction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default)]
    pub external_codes: Vec<String>,
    #[serde(default)]
    pub quantities: Vec<i64>,
}

impl RunInstruction {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            instruction: Some(text.into()),
            ..Self::default()
        }
    }

    /// Opening user message for the agent.
    pub fn user_message(&self) -> String {
        let mut message = String::from("Process the following data into a report:\n");

        if !self.external_codes.is_empty() {
            message.push_str(&format!("\nExternal codes: {:?}", self.external_codes));
            message.push_str(&format!("\nQuantities: {:?}\n", self.quantities));
        }

        if let Some(instruction) = self.instruction.as_deref().filter(|text| !text.is_empty()) {
            message.push_str(&format!("\nAdditional instruction: {instruction}\n"));
        }

        message.push_str(
            "\n1. First convert the external codes with the convert_codes tool.\n\
             2. Then aggregate quantities with aggregate_by_standard_code.\n\
             3. Finally produce the report with generate_markdown_report.",
        );
        message
    }

    /// Short label for run events.
    pub fn summary(&self) -> String {
        if let Some(instruction) = self.instruction.as_deref().filter(|text| !text.is_empty()) {
            return instruction.to_string();
        }
        format!("report for {} external codes", self.external_codes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_includes_codes_and_instruction() {
        let instruction = RunInstruction {
            instruction: Some("prefer KRW totals".to_string()),
            external_codes: vec!["EXT-PROD-001".to_string()],
            quantities: vec![2],
        };

        let message = instruction.user_message();
        assert!(message.contains("External codes: [\"EXT-PROD-001\"]"));
        assert!(message.contains("Quantities: [2]"));
        assert!(message.contains("Additional instruction: prefer KRW totals"));
        assert!(message.contains("convert_codes"));
    }

    #[test]
    fn user_message_without_codes_omits_the_lists() {
        let message = RunInstruction::from_text("just a question").user_message();
        assert!(!message.contains("External codes"));
        assert!(message.contains("Additional instruction: just a question"));
    }
}
