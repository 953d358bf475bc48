use crate::memory::{MemoryState, MemoryThreadStore};
use crate::store::{ThreadStore, ThreadStoreError, ThreadStoreResult};
use crate::types::{ThreadId, ThreadRecord};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_FILE_NAME: &str = "threadstore-state.json";

/// File-backed thread store. Reopening from the same root restores every
/// record, so interrupted threads survive a controller restart.
#[derive(Clone, Debug)]
pub struct FsThreadStore {
    state_file: PathBuf,
    inner: MemoryThreadStore,
}

impl FsThreadStore {
    pub fn new<P: AsRef<Path>>(root: P) -> ThreadStoreResult<Self> {
        fs::create_dir_all(root.as_ref()).map_err(|err| {
            ThreadStoreError::Backend(format!("create fs store root failed: {err}"))
        })?;
        let state_file = root.as_ref().join(STATE_FILE_NAME);
        let state = if state_file.exists() {
            let raw = fs::read(&state_file)
                .map_err(|err| ThreadStoreError::Backend(format!("read state file failed: {err}")))?;
            serde_json::from_slice::<MemoryState>(&raw)
                .map_err(|err| ThreadStoreError::Serialization(err.to_string()))?
        } else {
            MemoryState::default()
        };

        Ok(Self {
            state_file,
            inner: MemoryThreadStore::from_state(state),
        })
    }

    fn persist(&self) -> ThreadStoreResult<()> {
        let snapshot = self.inner.snapshot();
        let raw = serde_json::to_vec_pretty(&snapshot)
            .map_err(|err| ThreadStoreError::Serialization(err.to_string()))?;
        let tmp = self.state_file.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .map_err(|err| ThreadStoreError::Backend(format!("write state file failed: {err}")))?;
        fs::rename(&tmp, &self.state_file)
            .map_err(|err| ThreadStoreError::Backend(format!("rename state file failed: {err}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ThreadStore for FsThreadStore {
    async fn create(&self, record: ThreadRecord) -> ThreadStoreResult<()> {
        self.inner.create(record).await?;
        self.persist()
    }

    async fn get(&self, thread_id: &ThreadId) -> ThreadStoreResult<ThreadRecord> {
        self.inner.get(thread_id).await
    }

    async fn update(&self, record: ThreadRecord) -> ThreadStoreResult<()> {
        self.inner.update(record).await?;
        self.persist()
    }

    async fn list_interrupted(&self) -> ThreadStoreResult<Vec<ThreadId>> {
        self.inner.list_interrupted().await
    }
}
