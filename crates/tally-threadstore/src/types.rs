use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::time::{SystemTime, UNIX_EPOCH};

pub type ThreadId = String;

/// Authoritative run state of one thread. Mutated only by the run controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Interrupted,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Interrupted => "interrupted",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Running => true,
            // Resume continues the run; a deployment may also fail a thread it
            // no longer considers resumable.
            Self::Interrupted => matches!(next, Self::Running | Self::Failed),
            // A new instruction on a terminal thread starts a new logical run.
            Self::Completed | Self::Failed => next == Self::Running,
        }
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted state of one thread: its run state plus, while interrupted, the
/// serialized continuation needed to resume without replaying prior steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: ThreadId,
    pub state: RunState,
    pub snapshot: Option<Vec<u8>>,
    pub snapshot_hash: Option<String>,
    pub updated_at: String,
}

impl ThreadRecord {
    pub fn new(thread_id: ThreadId, state: RunState) -> Self {
        Self {
            thread_id,
            state,
            snapshot: None,
            snapshot_hash: None,
            updated_at: current_timestamp(),
        }
    }

    pub fn with_snapshot(mut self, payload: Vec<u8>) -> Self {
        self.snapshot_hash = Some(content_hash(&payload));
        self.snapshot = Some(payload);
        self
    }

    pub fn without_snapshot(mut self) -> Self {
        self.snapshot = None;
        self.snapshot_hash = None;
        self
    }

    /// True when the stored snapshot bytes still match their recorded hash.
    pub fn snapshot_intact(&self) -> bool {
        match (&self.snapshot, &self.snapshot_hash) {
            (Some(payload), Some(hash)) => content_hash(payload) == *hash,
            (None, None) => true,
            _ => false,
        }
    }
}

pub fn content_hash(payload: &[u8]) -> String {
    blake3::hash(payload).to_hex().to_string()
}

pub(crate) fn current_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs().to_string()
}
