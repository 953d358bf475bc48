use crate::types::{ThreadId, ThreadRecord};

#[derive(Debug, thiserror::Error)]
pub enum ThreadStoreError {
    #[error("resource not found: {resource} ({id})")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type ThreadStoreResult<T> = Result<T, ThreadStoreError>;

/// Durable per-thread run state, addressable solely by thread id.
#[async_trait::async_trait]
pub trait ThreadStore: Send + Sync {
    /// Insert a new thread record; fails with `Conflict` when the id exists.
    async fn create(&self, record: ThreadRecord) -> ThreadStoreResult<()>;

    async fn get(&self, thread_id: &ThreadId) -> ThreadStoreResult<ThreadRecord>;

    /// Replace an existing record; fails with `NotFound` for unknown ids.
    async fn update(&self, record: ThreadRecord) -> ThreadStoreResult<()>;

    /// Ids of threads currently suspended awaiting a decision. Used after a
    /// controller restart to report which threads can still be resumed.
    async fn list_interrupted(&self) -> ThreadStoreResult<Vec<ThreadId>>;
}
