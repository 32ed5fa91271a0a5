use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::settings::{AgentSettings, LlmSettings};
use crate::core::errors::ApiError;
use crate::interpret::{self, ResearchReport};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::prompt::{render, PromptTemplate};
use crate::tools::ToolRegistry;

const AGENT_TEMPLATE: &str = "\
You are a research assistant that will help generate a research paper.
Answer the user query and use the necessary tools.
{format_instructions}";

/// Tool-dispatching research loop.
///
/// Each cycle sends the conversation to the model: a response with no tool
/// calls finalizes into a `ResearchReport`; a response with tool calls runs
/// each requested tool in emitted order, appends the results to the
/// conversation, and re-invokes the model. The cycle count is hard-bounded.
pub struct AgentRuntime {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    template: PromptTemplate,
    chat_model: String,
    max_tool_cycles: usize,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        agent: &AgentSettings,
        llm_settings: &LlmSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            template: PromptTemplate::new(AGENT_TEMPLATE),
            chat_model: llm_settings.chat_model.clone(),
            max_tool_cycles: agent.max_tool_cycles,
        }
    }

    pub async fn run(&self, question: &str) -> Result<ResearchReport, ApiError> {
        let bindings: HashMap<&str, String> =
            HashMap::from([("format_instructions", interpret::format_instructions())]);
        let mut messages = render(&self.template, &bindings, &[], question)?;
        let mut tools_used: Vec<String> = Vec::new();

        for cycle in 0..self.max_tool_cycles {
            let request = ChatRequest::new(messages.clone()).with_tools(self.tools.specs());
            let response = self.llm.chat(request, &self.chat_model).await?;

            if response.tool_calls.is_empty() {
                let mut report = interpret::parse_report(&response.text)?;
                if report.tools_used.is_empty() {
                    report.tools_used = std::mem::take(&mut tools_used);
                }
                return Ok(report);
            }

            for call in &response.tool_calls {
                tracing::info!(cycle, tool = %call.name, "agent requested tool");
                let output = self.tools.execute(&call.name, &call.arguments).await?;

                if !tools_used.contains(&call.name) {
                    tools_used.push(call.name.clone());
                }

                messages.push(ChatMessage::assistant(
                    serde_json::to_string(call).unwrap_or_else(|_| call.name.clone()),
                ));
                messages.push(ChatMessage::user(format!(
                    "Result of {}:\n{}",
                    call.name, output
                )));
            }
        }

        Err(ApiError::Internal(format!(
            "agent did not reach a final answer within {} tool cycles (tools used: {})",
            self.max_tool_cycles,
            if tools_used.is_empty() {
                "none".to_string()
            } else {
                tools_used.join(", ")
            }
        )))
    }
}
