use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::{ChatRequest, ModelResponse, ToolCallRequest};
use crate::core::errors::ApiError;

/// Client for OpenAI-compatible chat-completion endpoints (Groq, LM Studio,
/// vLLM and friends all speak this protocol).
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: String, api_key: String, request_timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout.min(Duration::from_secs(30)))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object, per the wire protocol.
    arguments: String,
}

fn parse_tool_call(call: WireToolCall) -> ToolCallRequest {
    let arguments = serde_json::from_str::<Value>(&call.function.arguments)
        .unwrap_or_else(|_| json!({ "input": call.function.arguments }));
    ToolCallRequest {
        name: call.function.name,
        arguments,
    }
}

fn tool_payload(request: &ChatRequest) -> Option<Value> {
    if request.tools.is_empty() {
        return None;
    }
    let tools: Vec<Value> = request
        .tools
        .iter()
        .map(|spec| {
            json!({
                "type": "function",
                "function": {
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.parameters,
                }
            })
        })
        .collect();
    Some(Value::Array(tools))
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self.auth(self.client.get(&url)).send().await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ModelResponse, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let tools = tool_payload(&request);
        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if let Some(tools) = tools {
                obj.insert("tools".to_string(), tools);
            }
        }

        let res = self
            .auth(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::UpstreamUnavailable(format!("{}: {}", status, text)));
        }

        let payload: ChatCompletionResponse = res.json().await.map_err(ApiError::upstream)?;
        let choice = payload
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::UpstreamUnavailable("response carried no choices".to_string()))?;

        Ok(ModelResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(parse_tool_call)
                .collect(),
        })
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .auth(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::UpstreamUnavailable(format!("{}: {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_call_arguments_from_wire_string() {
        let call = WireToolCall {
            function: WireFunction {
                name: "search_tool".to_string(),
                arguments: r#"{"query": "capital of England"}"#.to_string(),
            },
        };
        let parsed = parse_tool_call(call);
        assert_eq!(parsed.name, "search_tool");
        assert_eq!(parsed.arguments["query"], "capital of England");
    }

    #[test]
    fn wraps_malformed_argument_strings() {
        let call = WireToolCall {
            function: WireFunction {
                name: "save_tool".to_string(),
                arguments: "not json".to_string(),
            },
        };
        let parsed = parse_tool_call(call);
        assert_eq!(parsed.arguments["input"], "not json");
    }

    #[test]
    fn response_with_tool_calls_and_null_content_deserializes() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "c1", "type": "function",
                         "function": {"name": "wiki_tool", "arguments": "{\"title\": \"London\"}"}}
                    ]
                }
            }]
        }"#;
        let payload: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let choice = payload.choices.into_iter().next().unwrap();
        assert!(choice.message.content.is_none());
        assert_eq!(choice.message.tool_calls.len(), 1);
    }

    #[test]
    fn omits_tools_field_when_no_tools_given() {
        let request = ChatRequest::new(vec![]);
        assert!(tool_payload(&request).is_none());
    }
}
