use tally_agent::AgentError;
use tally_threadstore::ThreadStoreError;
use thiserror::Error;

/// Protocol-layer errors. Run-internal failures never surface here; they end
/// the run with a failed outcome instead.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid run state for thread {thread_id}: expected {expected}, found {found}")]
    InvalidState {
        thread_id: String,
        expected: &'static str,
        found: String,
    },
    #[error("malformed decision: {0}")]
    MalformedDecision(String),
    #[error("snapshot codec failure: {0}")]
    Snapshot(String),
    #[error(transparent)]
    Store(#[from] ThreadStoreError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl ControllerError {
    pub fn invalid_state(
        thread_id: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            thread_id: thread_id.into(),
            expected,
            found: found.into(),
        }
    }
}

/// Client-side envelope decoding failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("service error: {0}")]
    Service(String),
    #[error("interrupt envelope has unknown shape: {0}")]
    UnknownShape(String),
}
