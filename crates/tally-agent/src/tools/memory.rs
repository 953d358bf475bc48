use super::{RegisteredTool, ToolExecutor, required_string_argument};
use crate::ToolError;
use serde_json::{Value, json};
use std::sync::Arc;
use tally_llm::ToolDefinition;

const MEMORIES_DIR: &str = "memories";
const PREFERENCES_FILE: &str = "user_preferences.md";

pub(super) fn save_user_preference_tool() -> RegisteredTool {
    let executor: ToolExecutor = Arc::new(|arguments, context| {
        Box::pin(async move {
            let content = required_string_argument(&arguments, "content")?;
            let memories_dir = context.data_dir().join(MEMORIES_DIR);
            tokio::fs::create_dir_all(&memories_dir)
                .await
                .map_err(|error| ToolError::Execution(error.to_string()))?;

            let file_path = memories_dir.join(PREFERENCES_FILE);
            tokio::fs::write(&file_path, format!("# User Preferences\n\n{content}\n"))
                .await
                .map_err(|error| ToolError::Execution(error.to_string()))?;

            Ok(Value::String(format!(
                "Preference saved to {}",
                file_path.display()
            )))
        })
    });

    RegisteredTool {
        definition: ToolDefinition {
            name: super::SAVE_USER_PREFERENCE_TOOL.to_string(),
            description: "Record a lasting operator preference (report format, preferred \
                          currency) in the preference memory file."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["content"],
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Preference text, markdown recommended"
                    }
                },
                "additionalProperties": false
            }),
        },
        executor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoopEventEmitter, StaticRateSource, ToolContext, ToolDispatchOptions};
    use tally_llm::ToolCall;
    use tempfile::tempdir;

    #[tokio::test(flavor = "current_thread")]
    async fn preference_file_is_written_under_data_dir() {
        let dir = tempdir().expect("temp dir should be created");
        let context = Arc::new(ToolContext::new(
            Box::new(StaticRateSource::default()),
            dir.path(),
        ));
        let mut registry = crate::ToolRegistry::default();
        registry.register(save_user_preference_tool());

        let results = registry
            .dispatch(
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: super::super::SAVE_USER_PREFERENCE_TOOL.to_string(),
                    arguments: json!({"content": "Always report totals in EUR."}),
                    raw_arguments: None,
                }],
                context,
                Arc::new(NoopEventEmitter),
                ToolDispatchOptions {
                    thread_id: "t1".to_string(),
                    parallel_tool_calls: false,
                },
            )
            .await
            .expect("dispatch should succeed");

        assert!(!results[0].is_error);
        let written = std::fs::read_to_string(
            dir.path().join(MEMORIES_DIR).join(PREFERENCES_FILE),
        )
        .expect("preference file should exist");
        assert!(written.starts_with("# User Preferences"));
        assert!(written.contains("Always report totals in EUR."));
    }
}
