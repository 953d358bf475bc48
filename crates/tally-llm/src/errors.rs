use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Top-level error type for the tally-llm crate.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Configuration(ConfigurationError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned an error: {0}")]
    Api(String),
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl SdkError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::new(message))
    }
}
