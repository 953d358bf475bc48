use crate::AgentError;
use crate::turn::current_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type EventData = HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStart,
    RunEnd,
    AssistantText,
    ToolCallStart,
    ToolCallEnd,
    RunInterrupted,
    RunResumed,
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub timestamp: String,
    pub thread_id: String,
    pub data: EventData,
}

impl SessionEvent {
    pub fn new(kind: EventKind, thread_id: String, data: EventData) -> Self {
        Self {
            kind,
            timestamp: current_timestamp(),
            thread_id,
            data,
        }
    }

    pub fn run_start(thread_id: String, instruction: String) -> Self {
        Self::new(
            EventKind::RunStart,
            thread_id,
            HashMap::from([("instruction".to_string(), Value::String(instruction))]),
        )
    }

    pub fn run_end(thread_id: String, final_state: String, total_tokens: Option<u64>) -> Self {
        let mut data = HashMap::from([("final_state".to_string(), Value::String(final_state))]);
        if let Some(total_tokens) = total_tokens {
            data.insert("total_tokens".to_string(), Value::from(total_tokens));
        }
        Self::new(EventKind::RunEnd, thread_id, data)
    }

    pub fn assistant_text(thread_id: String, content: String) -> Self {
        Self::new(
            EventKind::AssistantText,
            thread_id,
            HashMap::from([("content".to_string(), Value::String(content))]),
        )
    }

    pub fn tool_call_start(
        thread_id: String,
        tool_name: String,
        call_id: String,
        arguments: Option<Value>,
    ) -> Self {
        let mut data = HashMap::from([
            ("tool_name".to_string(), Value::String(tool_name)),
            ("call_id".to_string(), Value::String(call_id)),
        ]);
        if let Some(arguments) = arguments {
            data.insert("arguments".to_string(), arguments);
        }
        Self::new(EventKind::ToolCallStart, thread_id, data)
    }

    pub fn tool_call_end(
        thread_id: String,
        call_id: String,
        output: Option<Value>,
        error: Option<String>,
        duration_ms: u128,
        is_error: bool,
    ) -> Self {
        let mut data = HashMap::from([
            ("call_id".to_string(), Value::String(call_id)),
            ("duration_ms".to_string(), Value::from(duration_ms as u64)),
            ("is_error".to_string(), Value::Bool(is_error)),
        ]);
        if let Some(output) = output {
            data.insert("output".to_string(), output);
        }
        if let Some(error) = error {
            data.insert("error".to_string(), Value::String(error));
        }
        Self::new(EventKind::ToolCallEnd, thread_id, data)
    }

    pub fn run_interrupted(thread_id: String, tool_name: String, pending: usize) -> Self {
        Self::new(
            EventKind::RunInterrupted,
            thread_id,
            HashMap::from([
                ("tool_name".to_string(), Value::String(tool_name)),
                ("pending".to_string(), Value::from(pending as u64)),
            ]),
        )
    }

    pub fn run_resumed(thread_id: String, decision: String) -> Self {
        Self::new(
            EventKind::RunResumed,
            thread_id,
            HashMap::from([("decision".to_string(), Value::String(decision))]),
        )
    }

    pub fn error(thread_id: String, message: String) -> Self {
        Self::new(
            EventKind::Error,
            thread_id,
            HashMap::from([("message".to_string(), Value::String(message))]),
        )
    }

    pub fn warning(thread_id: String, message: String) -> Self {
        Self::new(
            EventKind::Warning,
            thread_id,
            HashMap::from([("message".to_string(), Value::String(message))]),
        )
    }
}

pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: SessionEvent) -> Result<(), AgentError>;
}

#[derive(Default)]
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: SessionEvent) -> Result<(), AgentError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct BufferedEventEmitter {
    inner: Arc<Mutex<Vec<SessionEvent>>>,
}

impl BufferedEventEmitter {
    pub fn snapshot(&self) -> Vec<SessionEvent> {
        let guard = self.inner.lock().expect("buffered emitter mutex poisoned");
        guard.clone()
    }
}

impl EventEmitter for BufferedEventEmitter {
    fn emit(&self, event: SessionEvent) -> Result<(), AgentError> {
        let mut guard = self.inner.lock().expect("buffered emitter mutex poisoned");
        guard.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_event_emitter_stores_emitted_events() {
        let emitter = BufferedEventEmitter::default();
        emitter
            .emit(SessionEvent::run_interrupted(
                "t1".to_string(),
                "get_exchange_rate".to_string(),
                1,
            ))
            .expect("emit should succeed");

        let events = emitter.snapshot();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::RunInterrupted);
        assert_eq!(events[0].data["pending"], Value::from(1u64));
    }
}
