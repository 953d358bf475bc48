use thiserror::Error;

/// Top-level error type for the tally-agent crate.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool validation failed: {0}")]
    ToolValidation(String),
    #[error("tool execution failed: {0}")]
    ToolExecution(String),
    #[error(transparent)]
    Llm(#[from] tally_llm::SdkError),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool validation failed: {0}")]
    Validation(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

impl From<ToolError> for AgentError {
    fn from(error: ToolError) -> Self {
        match error {
            ToolError::Validation(message) => AgentError::ToolValidation(message),
            ToolError::Execution(message) => AgentError::ToolExecution(message),
        }
    }
}
