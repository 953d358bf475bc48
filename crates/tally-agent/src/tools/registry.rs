use crate::{AgentError, EventEmitter, SessionEvent, ToolContext};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tally_llm::{ToolCall, ToolDefinition, ToolResult};

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, AgentError>> + Send>>;
pub type ToolExecutor = Arc<dyn Fn(Value, Arc<ToolContext>) -> ToolFuture + Send + Sync>;

#[derive(Clone)]
pub struct ToolDispatchOptions {
    pub thread_id: String,
    pub parallel_tool_calls: bool,
}

#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub executor: ToolExecutor,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn register(&mut self, tool: RegisteredTool) {
        self.tools.insert(tool.definition.name.clone(), tool);
    }

    pub fn unregister(&mut self, name: &str) -> Option<RegisteredTool> {
        self.tools.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| tool.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Execute a batch of tool calls, preserving input order in the results.
    ///
    /// Unknown tools, argument parse failures, schema violations, and executor
    /// errors all come back as error results rather than failing the run.
    pub async fn dispatch(
        &self,
        tool_calls: Vec<ToolCall>,
        context: Arc<ToolContext>,
        event_emitter: Arc<dyn EventEmitter>,
        options: ToolDispatchOptions,
    ) -> Result<Vec<ToolResult>, AgentError> {
        if options.parallel_tool_calls && tool_calls.len() > 1 {
            let futures = tool_calls.into_iter().map(|tool_call| {
                self.dispatch_single(tool_call, context.clone(), event_emitter.clone(), &options)
            });
            return Ok(join_all(futures)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?);
        }

        let mut results = Vec::with_capacity(tool_calls.len());
        for tool_call in tool_calls {
            results.push(
                self.dispatch_single(tool_call, context.clone(), event_emitter.clone(), &options)
                    .await?,
            );
        }
        Ok(results)
    }

    async fn dispatch_single(
        &self,
        tool_call: ToolCall,
        context: Arc<ToolContext>,
        event_emitter: Arc<dyn EventEmitter>,
        options: &ToolDispatchOptions,
    ) -> Result<ToolResult, AgentError> {
        let thread_id = &options.thread_id;
        let start_time = std::time::Instant::now();
        let parsed_arguments = match super::parse_tool_arguments(&tool_call) {
            Ok(arguments) => arguments,
            Err(error) => {
                let duration_ms = start_time.elapsed().as_millis();
                event_emitter.emit(SessionEvent::tool_call_end(
                    thread_id.to_string(),
                    tool_call.id.clone(),
                    None,
                    Some(error.to_string()),
                    duration_ms,
                    true,
                ))?;
                return Ok(super::tool_error_result(tool_call.id, error.to_string()));
            }
        };

        event_emitter.emit(SessionEvent::tool_call_start(
            thread_id.to_string(),
            tool_call.name.clone(),
            tool_call.id.clone(),
            Some(parsed_arguments.clone()),
        ))?;

        let Some(registered) = self.get(&tool_call.name) else {
            let message = format!("Unknown tool: {}", tool_call.name);
            let duration_ms = start_time.elapsed().as_millis();
            event_emitter.emit(SessionEvent::tool_call_end(
                thread_id.to_string(),
                tool_call.id.clone(),
                None,
                Some(message.clone()),
                duration_ms,
                true,
            ))?;
            return Ok(super::tool_error_result(tool_call.id, message));
        };

        if let Err(error) =
            super::validate_tool_arguments(&registered.definition.parameters, &parsed_arguments)
        {
            let duration_ms = start_time.elapsed().as_millis();
            event_emitter.emit(SessionEvent::tool_call_end(
                thread_id.to_string(),
                tool_call.id.clone(),
                None,
                Some(error.to_string()),
                duration_ms,
                true,
            ))?;
            return Ok(super::tool_error_result(tool_call.id, error.to_string()));
        }

        let output = match (registered.executor)(parsed_arguments, context).await {
            Ok(output) => output,
            Err(error) => {
                let error_text = error.to_string();
                let duration_ms = start_time.elapsed().as_millis();
                event_emitter.emit(SessionEvent::tool_call_end(
                    thread_id.to_string(),
                    tool_call.id.clone(),
                    None,
                    Some(error_text.clone()),
                    duration_ms,
                    true,
                ))?;
                return Ok(super::tool_error_result(tool_call.id, error_text));
            }
        };

        let duration_ms = start_time.elapsed().as_millis();
        event_emitter.emit(SessionEvent::tool_call_end(
            thread_id.to_string(),
            tool_call.id.clone(),
            Some(output.clone()),
            None,
            duration_ms,
            false,
        ))?;

        Ok(ToolResult {
            tool_call_id: tool_call.id,
            content: output,
            is_error: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferedEventEmitter, EventKind, NoopEventEmitter, StaticRateSource};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_context() -> Arc<ToolContext> {
        Arc::new(ToolContext::new(
            Box::new(StaticRateSource::default()),
            std::env::temp_dir(),
        ))
    }

    fn echo_tool(executor: ToolExecutor) -> RegisteredTool {
        RegisteredTool {
            definition: ToolDefinition {
                name: "echo".to_string(),
                description: "echo the value back".to_string(),
                parameters: json!({
                    "type": "object",
                    "required": ["value"],
                    "properties": {
                        "value": { "type": "string" }
                    },
                    "additionalProperties": false
                }),
            },
            executor,
        }
    }

    #[test]
    fn tool_registry_latest_registration_wins() {
        let mut registry = ToolRegistry::default();
        let executor: ToolExecutor =
            Arc::new(|_args, _ctx| Box::pin(async move { Ok(Value::Null) }));

        let mut first = echo_tool(executor.clone());
        first.definition.description = "first".to_string();
        registry.register(first);

        let mut second = echo_tool(executor);
        second.definition.description = "second".to_string();
        registry.register(second);

        let registered = registry
            .get("echo")
            .expect("tool should be present after replacement");
        assert_eq!(registered.definition.description, "second");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispatch_unknown_tool_returns_error_result_instead_of_failing_run() {
        let registry = ToolRegistry::default();
        let results = registry
            .dispatch(
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "unknown".to_string(),
                    arguments: json!({}),
                    raw_arguments: None,
                }],
                test_context(),
                Arc::new(NoopEventEmitter),
                ToolDispatchOptions {
                    thread_id: "t1".to_string(),
                    parallel_tool_calls: false,
                },
            )
            .await
            .expect("dispatch should not fail");

        assert_eq!(results.len(), 1);
        assert!(results[0].is_error);
        assert!(
            results[0]
                .content
                .as_str()
                .unwrap_or_default()
                .contains("Unknown tool")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispatch_validation_error_skips_execution() {
        let execution_count = Arc::new(AtomicUsize::new(0));
        let count = execution_count.clone();
        let executor: ToolExecutor = Arc::new(move |_args, _ctx| {
            let count = count.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(Value::String("should not run".to_string()))
            })
        });

        let mut registry = ToolRegistry::default();
        registry.register(echo_tool(executor));

        let results = registry
            .dispatch(
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "echo".to_string(),
                    arguments: json!({ "not_value": 1 }),
                    raw_arguments: None,
                }],
                test_context(),
                Arc::new(NoopEventEmitter),
                ToolDispatchOptions {
                    thread_id: "t1".to_string(),
                    parallel_tool_calls: false,
                },
            )
            .await
            .expect("dispatch should not fail");

        assert!(results[0].is_error);
        assert_eq!(execution_count.load(Ordering::SeqCst), 0);
        assert!(
            results[0]
                .content
                .as_str()
                .unwrap_or_default()
                .contains("missing required argument 'value'")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispatch_emits_start_and_end_events_with_call_id() {
        let mut registry = ToolRegistry::default();
        registry.register(echo_tool(Arc::new(|args, _ctx| {
            Box::pin(async move { Ok(args["value"].clone()) })
        })));

        let emitter = Arc::new(BufferedEventEmitter::default());
        let results = registry
            .dispatch(
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "echo".to_string(),
                    arguments: json!({ "value": "hi" }),
                    raw_arguments: None,
                }],
                test_context(),
                emitter.clone(),
                ToolDispatchOptions {
                    thread_id: "t1".to_string(),
                    parallel_tool_calls: false,
                },
            )
            .await
            .expect("dispatch should succeed");

        assert!(!results[0].is_error);
        assert_eq!(results[0].content, json!("hi"));

        let events = emitter.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::ToolCallStart);
        assert_eq!(events[1].kind, EventKind::ToolCallEnd);
        assert_eq!(events[0].data["call_id"], json!("call-1"));
        assert_eq!(events[1].data["is_error"], json!(false));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispatch_parses_raw_json_arguments_before_validation() {
        let mut registry = ToolRegistry::default();
        registry.register(echo_tool(Arc::new(|args, _ctx| {
            Box::pin(async move { Ok(args["value"].clone()) })
        })));

        let results = registry
            .dispatch(
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "echo".to_string(),
                    arguments: Value::Null,
                    raw_arguments: Some("{\"value\":\"from raw\"}".to_string()),
                }],
                test_context(),
                Arc::new(NoopEventEmitter),
                ToolDispatchOptions {
                    thread_id: "t1".to_string(),
                    parallel_tool_calls: false,
                },
            )
            .await
            .expect("dispatch should succeed");

        assert_eq!(results[0].content, json!("from raw"));
    }
}
