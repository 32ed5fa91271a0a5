use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{string_arg, Tool};
use crate::core::errors::ApiError;
use crate::llm::ToolSpec;

/// Appends research output to a local text file.
pub struct SaveTool {
    output_path: PathBuf,
}

impl SaveTool {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }
}

#[async_trait]
impl Tool for SaveTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "save_tool".to_string(),
            description: "Save research output to a local text file.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to save" }
                },
                "required": ["text"]
            }),
        }
    }

    async fn run(&self, args: &Value) -> Result<String, ApiError> {
        let text = string_arg(args, &["text", "data", "input"])
            .ok_or_else(|| ApiError::BadRequest("text to save missing".to_string()))?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        let entry = format!("--- Research Output ---\nTimestamp: {}\n\n{}\n\n", timestamp, text);

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .map_err(ApiError::internal)?;
        file.write_all(entry.as_bytes()).map_err(ApiError::internal)?;

        Ok(format!("Data saved to {}", self.output_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_timestamped_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("research_output.txt");
        let tool = SaveTool::new(path.clone());

        tool.run(&json!({ "text": "first" })).await.unwrap();
        tool.run(&json!({ "text": "second" })).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("--- Research Output ---").count(), 2);
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));
    }

    #[tokio::test]
    async fn missing_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveTool::new(dir.path().join("out.txt"));
        let err = tool.run(&json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
