use super::{RegisteredTool, ToolExecutor, optional_string_argument, required_string_argument};
use serde_json::json;
use std::sync::Arc;
use tally_llm::ToolDefinition;

pub(super) fn exchange_rate_tool() -> RegisteredTool {
    let executor: ToolExecutor = Arc::new(|arguments, context| {
        Box::pin(async move {
            let target_currency =
                required_string_argument(&arguments, "target_currency")?.to_ascii_uppercase();
            let base_currency = optional_string_argument(&arguments, "base_currency")?
                .unwrap_or_else(|| "USD".to_string())
                .to_ascii_uppercase();

            match context
                .rate_source()
                .quote(&base_currency, &target_currency)
                .await
            {
                Ok(rate) => Ok(json!({
                    "base_currency": base_currency,
                    "target_currency": target_currency,
                    "rate": rate,
                    "success": true,
                })),
                Err(error) => Ok(json!({
                    "error": error.to_string(),
                    "success": false,
                })),
            }
        })
    });

    RegisteredTool {
        definition: ToolDefinition {
            name: super::GET_EXCHANGE_RATE_TOOL.to_string(),
            description: "Get the current exchange rate between two currencies."
                .to_string(),
            parameters: json!({
                "type": "object",
                "required": ["target_currency"],
                "properties": {
                    "target_currency": {
                        "type": "string",
                        "description": "Currency to convert TO, e.g. 'KRW' or 'EUR'"
                    },
                    "base_currency": {
                        "type": "string",
                        "description": "Currency to convert FROM (default 'USD')"
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

    #[tokio::test(flavor = "current_thread")]
    async fn quote_defaults_base_currency_to_usd() {
        let context = Arc::new(ToolContext::new(
            Box::new(StaticRateSource::default().with_rate("USD", "KRW", 1390.5)),
            std::env::temp_dir(),
        ));
        let mut registry = crate::ToolRegistry::default();
        registry.register(exchange_rate_tool());

        let results = registry
            .dispatch(
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: super::super::GET_EXCHANGE_RATE_TOOL.to_string(),
                    arguments: json!({"target_currency": "krw"}),
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
        assert_eq!(results[0].content["base_currency"], "USD");
        assert_eq!(results[0].content["rate"], 1390.5);
        assert_eq!(results[0].content["success"], true);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unavailable_pair_reports_failure_payload_not_dispatch_error() {
        let context = Arc::new(ToolContext::new(
            Box::new(StaticRateSource::default()),
            std::env::temp_dir(),
        ));
        let mut registry = crate::ToolRegistry::default();
        registry.register(exchange_rate_tool());

        let results = registry
            .dispatch(
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: super::super::GET_EXCHANGE_RATE_TOOL.to_string(),
                    arguments: json!({"target_currency": "JPY"}),
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
        assert_eq!(results[0].content["success"], false);
    }
}
