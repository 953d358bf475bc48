use std::collections::BTreeSet;

use crate::tools::GET_EXCHANGE_RATE_TOOL;

/// Runtime configuration for a report-agent run.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    pub model: String,
    /// Tool names that require operator sign-off before execution.
    pub approval_required: BTreeSet<String>,
    /// Upper bound on tool rounds per run; exhausting it fails the run.
    pub max_tool_rounds: usize,
    pub system_prompt: String,
    pub parallel_tool_calls: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-5-nano".to_string(),
            approval_required: BTreeSet::from([GET_EXCHANGE_RATE_TOOL.to_string()]),
            max_tool_rounds: 25,
            system_prompt: default_system_prompt(),
            parallel_tool_calls: false,
        }
    }
}

impl AgentConfig {
    pub fn requires_approval(&self, tool_name: &str) -> bool {
        self.approval_required.contains(tool_name)
    }
}

pub fn default_system_prompt() -> String {
    "You are a code aggregation and report generation specialist.\n\
     \n\
     Rules:\n\
     1. Follow the tool order: convert_codes, then aggregate_by_standard_code, \
     then generate_markdown_report.\n\
     2. Pass each step's output verbatim as the next step's input.\n\
     3. Produce a report even when some conversions fail, covering what succeeded.\n\
     4. When the operator states a lasting preference (report format, preferred \
     currency), record it with save_user_preference.\n\
     5. If a tool request is declined by the operator, continue without that \
     tool's output and say so in the report."
        .to_string()
}
