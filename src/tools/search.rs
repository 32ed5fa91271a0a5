use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use super::{string_arg, Tool};
use crate::core::errors::ApiError;
use crate::llm::ToolSpec;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search via the DuckDuckGo instant-answer API. Keyless, which keeps
/// the research agent usable without extra credentials.
pub struct SearchTool {
    client: Client,
}

impl SearchTool {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { client })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_redirect=1&no_html=1",
            urlencoding::encode(query)
        );

        let response = self.client.get(url).send().await.map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "DuckDuckGo search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        let mut results = Vec::new();

        if let Some(abstract_text) = payload.get("AbstractText").and_then(|v| v.as_str()) {
            if let Some(url) = payload.get("AbstractURL").and_then(|v| v.as_str()) {
                if !abstract_text.is_empty() && !url.is_empty() {
                    results.push(SearchResult {
                        title: abstract_text
                            .split(" - ")
                            .next()
                            .unwrap_or(abstract_text)
                            .to_string(),
                        url: url.to_string(),
                        snippet: abstract_text.to_string(),
                    });
                }
            }
        }

        if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
            extract_topics(items, &mut results);
        }
        if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
            extract_topics(items, &mut results);
        }

        Ok(results)
    }
}

fn extract_topics(items: &[Value], results: &mut Vec<SearchResult>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(SearchResult {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            url: url.to_string(),
            snippet: text.to_string(),
        });
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "search_tool".to_string(),
            description: "Search the web for current information on a topic.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn run(&self, args: &Value) -> Result<String, ApiError> {
        let query = string_arg(args, &["query", "q", "input"])
            .ok_or_else(|| ApiError::BadRequest("search query missing".to_string()))?;

        let results = self.search(query).await?;
        if results.is_empty() {
            return Ok(format!("No search results for '{}'.", query));
        }

        let lines: Vec<String> = results
            .iter()
            .take(5)
            .map(|r| format!("{} — {}\n{}", r.title, r.url, r.snippet))
            .collect();
        Ok(lines.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_related_topics() {
        let items = vec![json!({
            "Topics": [
                { "Text": "London - Capital of England", "FirstURL": "https://duckduckgo.com/London" }
            ]
        })];

        let mut results = Vec::new();
        extract_topics(&items, &mut results);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "London");
        assert_eq!(results[0].url, "https://duckduckgo.com/London");
    }

    #[test]
    fn skips_entries_without_url() {
        let items = vec![json!({ "Text": "orphan text" })];
        let mut results = Vec::new();
        extract_topics(&items, &mut results);
        assert!(results.is_empty());
    }
}
