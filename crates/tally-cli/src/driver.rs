//! Conversation driver: one session object per conversation.
//!
//! Holds the remembered thread id and talks to the run controller. Multiple
//! concurrent conversations are just multiple `Conversation` values over the
//! same controller.

use crate::parse::parse_instruction;
use std::sync::Arc;
use tally_controller::{ControllerError, Decision, RunController, RunOutcome};

pub struct Conversation {
    controller: Arc<RunController>,
    thread_id: Option<String>,
}

impl Conversation {
    pub fn new(controller: Arc<RunController>) -> Self {
        Self {
            controller,
            thread_id: None,
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Start a new logical run from free text. The remembered thread id is
    /// reused so one conversation keeps one thread identity across runs; the
    /// controller rejects the call if that thread is still mid-run.
    pub async fn send(&mut self, text: &str) -> Result<RunOutcome, ControllerError> {
        let instruction = parse_instruction(text);
        let outcome = self
            .controller
            .start(instruction, self.thread_id.clone())
            .await?;
        self.thread_id = Some(outcome.thread_id().to_string());
        Ok(outcome)
    }

    /// Apply a decision to the pending action. No-op (returns `None`) when no
    /// thread is remembered yet.
    pub async fn decide(
        &mut self,
        decision: Decision,
    ) -> Option<Result<RunOutcome, ControllerError>> {
        let thread_id = self.thread_id.clone()?;
        let result = self.controller.resume(&thread_id, decision).await;
        if let Ok(outcome) = &result {
            self.thread_id = Some(outcome.thread_id().to_string());
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tally_agent::{AgentConfig, StaticRateSource, ToolContext, build_report_tool_registry};
    use tally_llm::{
        Client, FinishReason, Message, ProviderAdapter, Request, Response, SdkError, ToolCall,
        Usage,
    };
    use tally_threadstore::MemoryThreadStore;

    struct ScriptedAdapter {
        responses: Mutex<VecDeque<Response>>,
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: Request) -> Result<Response, SdkError> {
            self.responses
                .lock()
                .expect("responses mutex")
                .pop_front()
                .ok_or_else(|| SdkError::configuration("no scripted response queued"))
        }
    }

    fn response(text: &str, tool_calls: Vec<ToolCall>) -> Response {
        Response {
            id: "resp".to_string(),
            model: "test".to_string(),
            provider: "scripted".to_string(),
            message: Message::assistant_with_tool_calls(text, tool_calls),
            finish_reason: FinishReason {
                reason: "stop".to_string(),
                raw: None,
            },
            usage: Usage::default(),
            raw: None,
        }
    }

    fn conversation(responses: Vec<Response>, data_dir: &std::path::Path) -> Conversation {
        let mut client = Client::default();
        client.register_provider(Arc::new(ScriptedAdapter {
            responses: Mutex::new(VecDeque::from(responses)),
        }));
        let controller = RunController::new(
            Arc::new(client),
            Arc::new(build_report_tool_registry()),
            Arc::new(ToolContext::new(
                Box::new(StaticRateSource::default().with_rate("USD", "KRW", 1390.5)),
                data_dir,
            )),
            AgentConfig::default(),
            Arc::new(MemoryThreadStore::new()),
        );
        Conversation::new(Arc::new(controller))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn decide_without_a_thread_is_a_no_op() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut conversation = conversation(vec![], dir.path());
        assert!(conversation.decide(Decision::Approve).await.is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn send_then_decide_keeps_one_thread_identity() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut conversation = conversation(
            vec![
                response(
                    "",
                    vec![ToolCall {
                        id: "call-1".to_string(),
                        name: "get_exchange_rate".to_string(),
                        arguments: json!({"target_currency": "KRW"}),
                        raw_arguments: None,
                    }],
                ),
                response("final report", Vec::new()),
            ],
            dir.path(),
        );

        let outcome = conversation
            .send("quote KRW please")
            .await
            .expect("send should succeed");
        assert!(matches!(outcome, RunOutcome::Interrupted { .. }));
        let remembered = conversation
            .thread_id()
            .expect("thread id should be remembered")
            .to_string();

        let resumed = conversation
            .decide(Decision::Approve)
            .await
            .expect("a thread is remembered")
            .expect("resume should succeed");
        assert!(matches!(resumed, RunOutcome::Completed { .. }));
        assert_eq!(conversation.thread_id(), Some(remembered.as_str()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn a_completed_conversation_accepts_the_next_instruction() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut conversation = conversation(
            vec![
                response("first", Vec::new()),
                response("second", Vec::new()),
            ],
            dir.path(),
        );

        let first = conversation.send("one").await.expect("send should succeed");
        let first_id = first.thread_id().to_string();
        let second = conversation.send("two").await.expect("send should succeed");
        assert_eq!(second.thread_id(), first_id);
    }
}
