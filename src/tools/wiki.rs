use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{string_arg, Tool};
use crate::core::errors::ApiError;
use crate::llm::ToolSpec;

/// Encyclopedia lookup against the Wikipedia REST summary endpoint.
pub struct WikiTool {
    client: Client,
}

impl WikiTool {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { client })
    }

    async fn summary(&self, title: &str) -> Result<String, ApiError> {
        let url = format!(
            "https://en.wikipedia.org/api/rest_v1/page/summary/{}",
            urlencoding::encode(&title.replace(' ', "_"))
        );

        let response = self.client.get(url).send().await.map_err(ApiError::internal)?;

        if response.status().as_u16() == 404 {
            return Ok(format!("No Wikipedia article found for '{}'.", title));
        }
        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Wikipedia lookup failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        let extract = payload
            .get("extract")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let page_url = payload
            .get("content_urls")
            .and_then(|v| v.get("desktop"))
            .and_then(|v| v.get("page"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if extract.is_empty() {
            return Ok(format!("Wikipedia article '{}' has no summary.", title));
        }

        Ok(format!("{}\nSource: {}", extract, page_url))
    }
}

#[async_trait]
impl Tool for WikiTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "wiki_tool".to_string(),
            description: "Look up a topic summary on Wikipedia.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Article title to look up" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn run(&self, args: &Value) -> Result<String, ApiError> {
        let title = string_arg(args, &["query", "title", "input"])
            .ok_or_else(|| ApiError::BadRequest("wiki lookup title missing".to_string()))?;
        self.summary(title).await
    }
}
