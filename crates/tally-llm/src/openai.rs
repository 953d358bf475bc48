//! OpenAI-compatible chat-completions adapter.
//!
//! Works against any endpoint that speaks the `/chat/completions` wire shape;
//! the default factory targets OpenRouter via `OPENROUTER_API_KEY` and
//! `OPENROUTER_BASE_URL`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::errors::SdkError;
use crate::provider::{ProviderAdapter, ProviderFactory};
use crate::types::{
    FinishReason, Message, Request, Response, Role, ToolCall, Usage,
};

pub const OPENROUTER_PROVIDER_ID: &str = "openrouter";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub struct OpenAiCompatibleAdapter {
    name: String,
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiCompatibleAdapter {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    fn encode_message(message: &Message) -> Value {
        let mut encoded = json!({
            "role": match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            },
            "content": message.content,
        });
        if !message.tool_calls.is_empty() {
            encoded["tool_calls"] = Value::Array(
                message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call
                                    .raw_arguments
                                    .clone()
                                    .unwrap_or_else(|| call.arguments.to_string()),
                            }
                        })
                    })
                    .collect(),
            );
        }
        if let Some(tool_call_id) = &message.tool_call_id {
            encoded["tool_call_id"] = Value::String(tool_call_id.clone());
        }
        encoded
    }

    fn encode_request(request: &Request) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request
                .messages
                .iter()
                .map(Self::encode_message)
                .collect::<Vec<_>>(),
        });
        if let Some(tools) = &request.tools {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect(),
            );
        }
        if let Some(choice) = &request.tool_choice {
            body["tool_choice"] = match choice.tool_name.as_deref() {
                Some(name) => json!({"type": "function", "function": {"name": name}}),
                None => Value::String(choice.mode.clone()),
            };
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    fn decode_response(&self, raw: Value) -> Result<Response, SdkError> {
        let choice = raw
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .ok_or_else(|| SdkError::Decode("response carries no choices".to_string()))?;
        let message = choice
            .get("message")
            .ok_or_else(|| SdkError::Decode("choice carries no message".to_string()))?;

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let tool_calls = message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| {
                        let function = call.get("function")?;
                        Some(ToolCall {
                            id: call.get("id").and_then(Value::as_str)?.to_string(),
                            name: function.get("name").and_then(Value::as_str)?.to_string(),
                            arguments: Value::Null,
                            raw_arguments: function
                                .get("arguments")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .unwrap_or("stop")
            .to_string();
        let usage = raw.get("usage").map(decode_usage).unwrap_or_default();

        Ok(Response {
            id: raw
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            model: raw
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            provider: self.name.clone(),
            message: Message {
                role: Role::Assistant,
                content,
                tool_calls,
                tool_call_id: None,
            },
            finish_reason: FinishReason {
                raw: Some(finish_reason.clone()),
                reason: finish_reason,
            },
            usage,
            raw: Some(raw),
        })
    }
}

fn decode_usage(raw: &Value) -> Usage {
    let read = |key: &str| raw.get(key).and_then(Value::as_u64).unwrap_or_default();
    Usage {
        input_tokens: read("prompt_tokens"),
        output_tokens: read("completion_tokens"),
        total_tokens: read("total_tokens"),
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: Request) -> Result<Response, SdkError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&Self::encode_request(&request))
            .send()
            .await
            .map_err(|error| SdkError::Transport(error.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|error| SdkError::Decode(error.to_string()))?;

        if !status.is_success() {
            let detail = body
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown provider failure");
            return Err(SdkError::Api(format!("{status}: {detail}")));
        }

        self.decode_response(body)
    }
}

pub struct OpenRouterFactory;

impl ProviderFactory for OpenRouterFactory {
    fn provider_id(&self) -> &'static str {
        OPENROUTER_PROVIDER_ID
    }

    fn from_env(&self) -> Option<Arc<dyn ProviderAdapter>> {
        let api_key = std::env::var("OPENROUTER_API_KEY").ok()?;
        let base_url = std::env::var("OPENROUTER_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENROUTER_BASE_URL.to_string());
        Some(Arc::new(OpenAiCompatibleAdapter::new(
            OPENROUTER_PROVIDER_ID,
            base_url,
            api_key,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToolChoice, ToolDefinition};
    use serde_json::json;

    fn adapter() -> OpenAiCompatibleAdapter {
        OpenAiCompatibleAdapter::new("openrouter", DEFAULT_OPENROUTER_BASE_URL, "key")
    }

    #[test]
    fn encode_request_wraps_tools_in_function_envelopes() {
        let request = Request {
            model: "openai/gpt-5-nano".to_string(),
            messages: vec![Message::user("hello")],
            provider: None,
            tools: Some(vec![ToolDefinition {
                name: "get_exchange_rate".to_string(),
                description: "quote a currency pair".to_string(),
                parameters: json!({"type": "object"}),
            }]),
            tool_choice: Some(ToolChoice {
                mode: "auto".to_string(),
                tool_name: None,
            }),
            temperature: None,
            max_tokens: None,
            metadata: None,
        };

        let body = OpenAiCompatibleAdapter::encode_request(&request);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_exchange_rate");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn decode_response_extracts_tool_calls_with_raw_arguments() {
        let raw = json!({
            "id": "resp-1",
            "model": "openai/gpt-5-nano",
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call-1",
                        "type": "function",
                        "function": {
                            "name": "get_exchange_rate",
                            "arguments": "{\"target_currency\":\"KRW\"}"
                        }
                    }]
                }
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        });

        let response = adapter().decode_response(raw).expect("decode should succeed");
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_exchange_rate");
        assert_eq!(
            calls[0].raw_arguments.as_deref(),
            Some("{\"target_currency\":\"KRW\"}")
        );
        assert_eq!(response.usage.total_tokens, 16);
        assert_eq!(response.finish_reason.reason, "tool_calls");
    }

    #[test]
    fn decode_response_without_choices_expected_decode_error() {
        let error = adapter().decode_response(json!({})).unwrap_err();
        assert!(matches!(error, SdkError::Decode(_)));
    }
}
