use crate::store::{ThreadStore, ThreadStoreError, ThreadStoreResult};
use crate::types::{RunState, ThreadId, ThreadRecord, current_timestamp};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub(crate) struct MemoryState {
    pub threads: BTreeMap<ThreadId, ThreadRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryThreadStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: MemoryState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub(crate) fn snapshot(&self) -> MemoryState {
        self.inner
            .lock()
            .expect("memory thread store mutex poisoned")
            .clone()
    }
}

#[async_trait::async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn create(&self, mut record: ThreadRecord) -> ThreadStoreResult<()> {
        let mut state = self.inner.lock().map_err(|_| {
            ThreadStoreError::Backend("memory thread store mutex poisoned".to_string())
        })?;

        if state.threads.contains_key(&record.thread_id) {
            return Err(ThreadStoreError::Conflict(format!(
                "thread {} already exists",
                record.thread_id
            )));
        }

        record.updated_at = current_timestamp();
        state.threads.insert(record.thread_id.clone(), record);
        Ok(())
    }

    async fn get(&self, thread_id: &ThreadId) -> ThreadStoreResult<ThreadRecord> {
        let state = self.inner.lock().map_err(|_| {
            ThreadStoreError::Backend("memory thread store mutex poisoned".to_string())
        })?;
        state
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| ThreadStoreError::NotFound {
                resource: "thread",
                id: thread_id.clone(),
            })
    }

    async fn update(&self, mut record: ThreadRecord) -> ThreadStoreResult<()> {
        let mut state = self.inner.lock().map_err(|_| {
            ThreadStoreError::Backend("memory thread store mutex poisoned".to_string())
        })?;

        let Some(existing) = state.threads.get(&record.thread_id) else {
            return Err(ThreadStoreError::NotFound {
                resource: "thread",
                id: record.thread_id.clone(),
            });
        };
        if !existing.state.can_transition_to(record.state) {
            return Err(ThreadStoreError::Conflict(format!(
                "illegal state transition {} -> {} for thread {}",
                existing.state, record.state, record.thread_id
            )));
        }

        record.updated_at = current_timestamp();
        state.threads.insert(record.thread_id.clone(), record);
        Ok(())
    }

    async fn list_interrupted(&self) -> ThreadStoreResult<Vec<ThreadId>> {
        let state = self.inner.lock().map_err(|_| {
            ThreadStoreError::Backend("memory thread store mutex poisoned".to_string())
        })?;
        Ok(state
            .threads
            .values()
            .filter(|record| record.state == RunState::Interrupted)
            .map(|record| record.thread_id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn create_duplicate_thread_expected_conflict() {
        let store = MemoryThreadStore::new();
        store
            .create(ThreadRecord::new("t1".to_string(), RunState::Running))
            .await
            .expect("first create should succeed");

        let error = store
            .create(ThreadRecord::new("t1".to_string(), RunState::Running))
            .await
            .unwrap_err();
        assert!(matches!(error, ThreadStoreError::Conflict(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn update_unknown_thread_expected_not_found() {
        let store = MemoryThreadStore::new();
        let error = store
            .update(ThreadRecord::new("ghost".to_string(), RunState::Running))
            .await
            .unwrap_err();
        assert!(matches!(error, ThreadStoreError::NotFound { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn update_with_illegal_transition_expected_conflict() {
        let store = MemoryThreadStore::new();
        store
            .create(ThreadRecord::new("t1".to_string(), RunState::Completed))
            .await
            .expect("create should succeed");

        let error = store
            .update(ThreadRecord::new("t1".to_string(), RunState::Interrupted))
            .await
            .unwrap_err();
        assert!(matches!(error, ThreadStoreError::Conflict(_)));

        // The thread is untouched and still accepts a legal transition.
        let record = store
            .get(&"t1".to_string())
            .await
            .expect("thread should exist");
        assert_eq!(record.state, RunState::Completed);
        store
            .update(ThreadRecord::new("t1".to_string(), RunState::Running))
            .await
            .expect("legal transition should succeed");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn list_interrupted_returns_only_suspended_threads() {
        let store = MemoryThreadStore::new();
        store
            .create(ThreadRecord::new("running".to_string(), RunState::Running))
            .await
            .expect("create should succeed");
        store
            .create(
                ThreadRecord::new("waiting".to_string(), RunState::Interrupted)
                    .with_snapshot(b"{}".to_vec()),
            )
            .await
            .expect("create should succeed");
        store
            .create(ThreadRecord::new("done".to_string(), RunState::Completed))
            .await
            .expect("create should succeed");

        let interrupted = store
            .list_interrupted()
            .await
            .expect("listing should succeed");
        assert_eq!(interrupted, vec!["waiting".to_string()]);
    }
}
