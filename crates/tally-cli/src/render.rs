//! Pending-action rendering, pluggable per tool name.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tally_agent::GET_EXCHANGE_RATE_TOOL;
use tally_controller::ActionRequest;

pub trait ActionRenderer: Send + Sync {
    /// Human-readable card for the pending tool invocation.
    fn render(&self, request: &ActionRequest) -> String;

    /// Prompt shown when the operator chooses to edit.
    fn edit_prompt(&self) -> &'static str;

    /// Build replacement arguments from the operator's raw edit input.
    fn build_edit(&self, request: &ActionRequest, raw: &str) -> Option<Value>;
}

pub struct GenericRenderer;

impl ActionRenderer for GenericRenderer {
    fn render(&self, request: &ActionRequest) -> String {
        let args = serde_json::to_string_pretty(&request.args)
            .unwrap_or_else(|_| request.args.to_string());
        format!(
            "The agent wants to call '{}' with arguments:\n{}",
            request.name, args
        )
    }

    fn edit_prompt(&self) -> &'static str {
        "Replacement arguments (JSON): "
    }

    fn build_edit(&self, _request: &ActionRequest, raw: &str) -> Option<Value> {
        serde_json::from_str(raw).ok()
    }
}

/// Currency-pair card for exchange-rate requests: shows the pair and accepts
/// a bare replacement target currency instead of raw JSON.
pub struct CurrencyPairRenderer;

impl CurrencyPairRenderer {
    fn base_currency(request: &ActionRequest) -> String {
        request
            .args
            .get("base_currency")
            .and_then(Value::as_str)
            .unwrap_or("USD")
            .to_string()
    }
}

impl ActionRenderer for CurrencyPairRenderer {
    fn render(&self, request: &ActionRequest) -> String {
        let base = Self::base_currency(request);
        let target = request
            .args
            .get("target_currency")
            .and_then(Value::as_str)
            .unwrap_or("KRW");
        format!(
            "The agent wants to look up an exchange rate:\n  base currency:   {base}\n  target currency: {target}"
        )
    }

    fn edit_prompt(&self) -> &'static str {
        "Replacement target currency (e.g. JPY): "
    }

    fn build_edit(&self, request: &ActionRequest, raw: &str) -> Option<Value> {
        let target = raw.trim();
        if target.is_empty() {
            return None;
        }
        Some(json!({
            "base_currency": Self::base_currency(request),
            "target_currency": target.to_ascii_uppercase(),
        }))
    }
}

pub struct RendererSet {
    by_tool: HashMap<String, Arc<dyn ActionRenderer>>,
    fallback: Arc<dyn ActionRenderer>,
}

impl Default for RendererSet {
    fn default() -> Self {
        let mut set = Self {
            by_tool: HashMap::new(),
            fallback: Arc::new(GenericRenderer),
        };
        set.register(GET_EXCHANGE_RATE_TOOL, Arc::new(CurrencyPairRenderer));
        set
    }
}

impl RendererSet {
    pub fn register(&mut self, tool_name: impl Into<String>, renderer: Arc<dyn ActionRenderer>) {
        self.by_tool.insert(tool_name.into(), renderer);
    }

    pub fn for_tool(&self, tool_name: &str) -> Arc<dyn ActionRenderer> {
        self.by_tool
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_request() -> ActionRequest {
        ActionRequest {
            name: GET_EXCHANGE_RATE_TOOL.to_string(),
            args: json!({"base_currency": "USD", "target_currency": "KRW"}),
        }
    }

    #[test]
    fn currency_renderer_shows_the_pair() {
        let rendered = CurrencyPairRenderer.render(&rate_request());
        assert!(rendered.contains("base currency:   USD"));
        assert!(rendered.contains("target currency: KRW"));
    }

    #[test]
    fn currency_edit_keeps_base_and_uppercases_target() {
        let args = CurrencyPairRenderer
            .build_edit(&rate_request(), " jpy ")
            .expect("edit should build");
        assert_eq!(args["base_currency"], "USD");
        assert_eq!(args["target_currency"], "JPY");
    }

    #[test]
    fn renderer_set_falls_back_to_generic_for_unknown_tools() {
        let set = RendererSet::default();
        let renderer = set.for_tool("save_user_preference");
        let rendered = renderer.render(&ActionRequest {
            name: "save_user_preference".to_string(),
            args: json!({"content": "prefer EUR"}),
        });
        assert!(rendered.contains("save_user_preference"));
        assert!(rendered.contains("prefer EUR"));
    }

    #[test]
    fn generic_edit_rejects_invalid_json() {
        let request = ActionRequest {
            name: "x".to_string(),
            args: json!({}),
        };
        assert!(GenericRenderer.build_edit(&request, "not json").is_none());
        assert!(GenericRenderer.build_edit(&request, "{\"a\":1}").is_some());
    }
}
