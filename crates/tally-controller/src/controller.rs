use crate::errors::ControllerError;
use crate::instruction::RunInstruction;
use crate::outcome::{ActionRequest, Decision, RunOutcome};
use crate::snapshot::RunSnapshot;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tally_agent::{
    AgentConfig, AssistantTurn, EventEmitter, NoopEventEmitter, SessionEvent, ToolContext,
    ToolDispatchOptions, ToolRegistry, Turn, current_timestamp, history_to_messages,
    parse_tool_arguments, validate_tool_arguments,
};
use tally_llm::{Client, Message, Request, ToolCall, ToolChoice, ToolResult};
use tally_threadstore::{RunState, ThreadRecord, ThreadStore, ThreadStoreError};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

const REJECTION_NOTICE: &str =
    "Tool call rejected by the operator. Continue without this tool's result.";

/// Server-side owner of per-thread run state.
///
/// Each call (`start` or `resume`) is processed to the next suspension point,
/// completion, or failure before returning. Calls on the same thread are
/// serialized by a per-thread lock; distinct threads run independently.
pub struct RunController {
    llm: Arc<Client>,
    registry: Arc<ToolRegistry>,
    tool_context: Arc<ToolContext>,
    config: AgentConfig,
    store: Arc<dyn ThreadStore>,
    event_emitter: Arc<dyn EventEmitter>,
    thread_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RunController {
    pub fn new(
        llm: Arc<Client>,
        registry: Arc<ToolRegistry>,
        tool_context: Arc<ToolContext>,
        config: AgentConfig,
        store: Arc<dyn ThreadStore>,
    ) -> Self {
        Self {
            llm,
            registry,
            tool_context,
            config,
            store,
            event_emitter: Arc::new(NoopEventEmitter),
            thread_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_event_emitter(mut self, event_emitter: Arc<dyn EventEmitter>) -> Self {
        self.event_emitter = event_emitter;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Begin a run. Without a thread id a fresh thread is allocated; with one,
    /// the thread must be terminal (a new logical run under the same id).
    pub async fn start(
        &self,
        instruction: RunInstruction,
        thread_id: Option<String>,
    ) -> Result<RunOutcome, ControllerError> {
        let (thread_id, reuse) = match thread_id {
            Some(id) => (id, true),
            None => (Uuid::new_v4().to_string(), false),
        };
        let lock = self.thread_lock(&thread_id);
        let _guard = lock.lock().await;

        if reuse {
            match self.store.get(&thread_id).await {
                Ok(record) => {
                    if !record.state.is_terminal() {
                        return Err(ControllerError::invalid_state(
                            &thread_id,
                            "completed or failed",
                            record.state.as_str(),
                        ));
                    }
                    self.store
                        .update(ThreadRecord::new(thread_id.clone(), RunState::Running))
                        .await?;
                }
                Err(ThreadStoreError::NotFound { .. }) => {
                    self.store
                        .create(ThreadRecord::new(thread_id.clone(), RunState::Running))
                        .await?;
                }
                Err(error) => return Err(error.into()),
            }
        } else {
            self.store
                .create(ThreadRecord::new(thread_id.clone(), RunState::Running))
                .await?;
        }

        self.event_emitter.emit(SessionEvent::run_start(
            thread_id.clone(),
            instruction.summary(),
        ))?;
        let snapshot = RunSnapshot::new(instruction);
        self.drive(thread_id, snapshot).await
    }

    /// Apply an operator decision to the pending action of an interrupted
    /// thread, then continue stepping.
    pub async fn resume(
        &self,
        thread_id: &str,
        decision: Decision,
    ) -> Result<RunOutcome, ControllerError> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let record = match self.store.get(&thread_id.to_string()).await {
            Ok(record) => record,
            Err(ThreadStoreError::NotFound { .. }) => {
                return Err(ControllerError::invalid_state(
                    thread_id,
                    "interrupted",
                    "unknown thread",
                ));
            }
            Err(error) => return Err(error.into()),
        };
        if record.state != RunState::Interrupted {
            return Err(ControllerError::invalid_state(
                thread_id,
                "interrupted",
                record.state.as_str(),
            ));
        }

        if !record.snapshot_intact() {
            return self
                .fail(
                    thread_id.to_string(),
                    "suspended run snapshot failed its integrity check".to_string(),
                )
                .await;
        }
        let Some(payload) = record.snapshot else {
            return self
                .fail(
                    thread_id.to_string(),
                    "interrupted thread carries no snapshot".to_string(),
                )
                .await;
        };
        let mut snapshot = match RunSnapshot::decode(&payload) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                return self
                    .fail(
                        thread_id.to_string(),
                        format!("suspended run snapshot failed to decode: {error}"),
                    )
                    .await;
            }
        };
        let Some(pending) = snapshot.pending_calls.first().cloned() else {
            return self
                .fail(
                    thread_id.to_string(),
                    "interrupted thread has no pending action".to_string(),
                )
                .await;
        };

        // Validate edits before consuming anything, so a malformed decision
        // leaves the same interrupt pending for retry.
        let approved_call = match &decision {
            Decision::Approve => Some(pending.clone()),
            Decision::Reject => None,
            Decision::Edit { args } => {
                let registered = self.registry.get(&pending.name).ok_or_else(|| {
                    ControllerError::MalformedDecision(format!(
                        "no tool registered under '{}'",
                        pending.name
                    ))
                })?;
                validate_tool_arguments(&registered.definition.parameters, args)
                    .map_err(|error| ControllerError::MalformedDecision(error.to_string()))?;
                Some(ToolCall {
                    arguments: args.clone(),
                    raw_arguments: None,
                    ..pending.clone()
                })
            }
        };

        snapshot.pending_calls.remove(0);
        self.store
            .update(ThreadRecord::new(thread_id.to_string(), RunState::Running))
            .await?;
        self.event_emitter.emit(SessionEvent::run_resumed(
            thread_id.to_string(),
            decision.kind().to_string(),
        ))?;

        match approved_call {
            Some(call) => {
                let results = self
                    .registry
                    .dispatch(
                        vec![call],
                        self.tool_context.clone(),
                        self.event_emitter.clone(),
                        self.dispatch_options(thread_id),
                    )
                    .await?;
                snapshot.push_results(results);
            }
            None => {
                snapshot.push_results(vec![ToolResult {
                    tool_call_id: pending.id.clone(),
                    content: Value::String(REJECTION_NOTICE.to_string()),
                    is_error: true,
                }]);
            }
        }

        // Further gated calls from the same agent step re-interrupt before any
        // new stepping happens.
        if !snapshot.pending_calls.is_empty() {
            return self.suspend(thread_id.to_string(), snapshot).await;
        }

        self.drive(thread_id.to_string(), snapshot).await
    }

    async fn drive(
        &self,
        thread_id: String,
        mut snapshot: RunSnapshot,
    ) -> Result<RunOutcome, ControllerError> {
        loop {
            if snapshot.round_count >= self.config.max_tool_rounds {
                return self
                    .fail(
                        thread_id,
                        format!(
                            "tool round budget of {} exhausted",
                            self.config.max_tool_rounds
                        ),
                    )
                    .await;
            }

            let request = self.build_request(&snapshot);
            let response = match self.llm.complete(request).await {
                Ok(response) => response,
                Err(error) => return self.fail(thread_id, error.to_string()).await,
            };

            let text = response.text();
            let tool_calls = response.tool_calls();
            snapshot.usage = snapshot.usage.clone() + response.usage.clone();
            snapshot.history.push(Turn::Assistant(AssistantTurn::new(
                text.clone(),
                tool_calls.clone(),
                response.usage.clone(),
                Some(response.id),
                current_timestamp(),
            )));
            if !text.is_empty() {
                self.event_emitter
                    .emit(SessionEvent::assistant_text(thread_id.clone(), text.clone()))?;
            }

            if tool_calls.is_empty() {
                self.store
                    .update(
                        ThreadRecord::new(thread_id.clone(), RunState::Completed)
                            .without_snapshot(),
                    )
                    .await?;
                self.event_emitter.emit(SessionEvent::run_end(
                    thread_id.clone(),
                    RunState::Completed.to_string(),
                    Some(snapshot.usage.total_tokens),
                ))?;
                return Ok(RunOutcome::Completed {
                    thread_id,
                    report: text,
                });
            }

            let mut gated = Vec::new();
            let mut executable = Vec::new();
            for call in tool_calls {
                if self.config.requires_approval(&call.name) {
                    match parse_tool_arguments(&call) {
                        Ok(arguments) => gated.push(ToolCall {
                            arguments,
                            raw_arguments: None,
                            ..call
                        }),
                        // Unparseable arguments are not worth gating; dispatch
                        // surfaces the parse error to the agent instead.
                        Err(error) => {
                            self.event_emitter.emit(SessionEvent::warning(
                                thread_id.clone(),
                                format!(
                                    "gated call '{}' skipped approval: {error}",
                                    call.name
                                ),
                            ))?;
                            executable.push(call);
                        }
                    }
                } else {
                    executable.push(call);
                }
            }

            if !executable.is_empty() {
                let results = self
                    .registry
                    .dispatch(
                        executable,
                        self.tool_context.clone(),
                        self.event_emitter.clone(),
                        self.dispatch_options(&thread_id),
                    )
                    .await?;
                snapshot.push_results(results);
            }
            snapshot.round_count += 1;

            if !gated.is_empty() {
                snapshot.pending_calls = gated;
                return self.suspend(thread_id, snapshot).await;
            }
        }
    }

    async fn suspend(
        &self,
        thread_id: String,
        snapshot: RunSnapshot,
    ) -> Result<RunOutcome, ControllerError> {
        let payload = snapshot
            .encode()
            .map_err(|error| ControllerError::Snapshot(error.to_string()))?;
        self.store
            .update(
                ThreadRecord::new(thread_id.clone(), RunState::Interrupted).with_snapshot(payload),
            )
            .await?;

        let action_requests: Vec<ActionRequest> =
            snapshot.pending_calls.iter().map(ActionRequest::from).collect();
        self.event_emitter.emit(SessionEvent::run_interrupted(
            thread_id.clone(),
            snapshot
                .pending_calls
                .first()
                .map(|call| call.name.clone())
                .unwrap_or_default(),
            action_requests.len(),
        ))?;

        Ok(RunOutcome::Interrupted {
            thread_id,
            action_requests,
        })
    }

    async fn fail(
        &self,
        thread_id: String,
        error: String,
    ) -> Result<RunOutcome, ControllerError> {
        self.store
            .update(ThreadRecord::new(thread_id.clone(), RunState::Failed).without_snapshot())
            .await?;
        self.event_emitter
            .emit(SessionEvent::error(thread_id.clone(), error.clone()))?;
        self.event_emitter.emit(SessionEvent::run_end(
            thread_id.clone(),
            RunState::Failed.to_string(),
            None,
        ))?;
        Ok(RunOutcome::Failed { thread_id, error })
    }

    fn build_request(&self, snapshot: &RunSnapshot) -> Request {
        let mut messages = vec![Message::system(self.config.system_prompt.clone())];
        messages.extend(history_to_messages(&snapshot.history));

        let tools = self.registry.definitions();
        let tools = if tools.is_empty() { None } else { Some(tools) };
        let tool_choice = tools.as_ref().map(|_| ToolChoice {
            mode: "auto".to_string(),
            tool_name: None,
        });

        Request {
            model: self.config.model.clone(),
            messages,
            provider: None,
            tools,
            tool_choice,
            temperature: None,
            max_tokens: None,
            metadata: None,
        }
    }

    fn dispatch_options(&self, thread_id: &str) -> ToolDispatchOptions {
        ToolDispatchOptions {
            thread_id: thread_id.to_string(),
            parallel_tool_calls: self.config.parallel_tool_calls,
        }
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .thread_locks
            .lock()
            .expect("thread lock registry mutex poisoned");
        locks.entry(thread_id.to_string()).or_default().clone()
    }
}
