pub mod save;
pub mod search;
pub mod wiki;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::ApiError;
use crate::llm::ToolSpec;

pub use save::SaveTool;
pub use search::SearchTool;
pub use wiki::WikiTool;

/// A named callable the model may request during an agent run.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Runs the tool. The returned text is fed back into the conversation.
    async fn run(&self, args: &Value) -> Result<String, ApiError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.spec().name;
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Tool specifications in registration order, for the model request.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    /// Looks up and runs a requested tool.
    pub async fn execute(&self, name: &str, args: &Value) -> Result<String, ApiError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ApiError::UnknownTool(name.to_string()))?;

        tracing::debug!(tool = name, "executing tool");
        tool.run(args).await
    }
}

pub(crate) fn string_arg<'a>(args: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| args.get(key))
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
