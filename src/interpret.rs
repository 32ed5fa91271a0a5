use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

/// Structured record the research agent must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResearchReport {
    pub topic: String,
    pub summary: String,
    pub sources: Vec<String>,
    pub tools_used: Vec<String>,
}

/// Machine-readable format hint bound into the agent's system prompt,
/// derived from the report schema.
pub fn format_instructions() -> String {
    let schema = schemars::schema_for!(ResearchReport);
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "The output must be a single JSON object conforming to the schema below. \
         Provide no other text.\n{}",
        schema_json
    )
}

fn fence_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").expect("valid regex"))
}

/// Removes wrapping code fences and the optional language tag on the opening
/// fence. Idempotent: stripped output passes through unchanged.
///
/// The upstream model is not contractually guaranteed to honor formatting
/// instructions, so interpretation stays permissive about this noise.
pub fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(found) = fence_open_re().find(text) {
        text = &text[found.end()..];
    }
    if let Some(stripped) = text.trim_end().strip_suffix("```") {
        text = stripped;
    }

    text.trim().to_string()
}

/// Interprets raw model text as a candidate SQL statement: fences and a bare
/// leading `sql` tag are stripped, a blank result is rejected. No further
/// syntactic validation happens here; the executor is the source of truth.
pub fn parse_sql(raw: &str) -> Result<String, ApiError> {
    let stripped = strip_fences(raw);

    let stripped = match stripped.split_once(char::is_whitespace) {
        Some((first, rest)) if first.eq_ignore_ascii_case("sql") => rest.trim().to_string(),
        _ => stripped,
    };

    if stripped.is_empty() {
        return Err(ApiError::EmptyQuery);
    }
    Ok(stripped)
}

fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

/// Deserializes raw model text into a `ResearchReport`, field by field.
/// A missing or wrongly typed field fails the whole parse; a partially
/// populated record is never returned.
pub fn parse_report(raw: &str) -> Result<ResearchReport, ApiError> {
    let stripped = strip_fences(raw);

    let value = extract_json_object(&stripped).ok_or_else(|| ApiError::SchemaMismatch {
        reason: "no JSON object found in model output".to_string(),
        raw: raw.to_string(),
    })?;

    serde_json::from_value::<ResearchReport>(value).map_err(|err| ApiError::SchemaMismatch {
        reason: err.to_string(),
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        let fenced = "```sql\nSELECT COUNT(*) FROM MOVIE;\n```";
        assert_eq!(parse_sql(fenced).unwrap(), "SELECT COUNT(*) FROM MOVIE;");
    }

    #[test]
    fn strips_fence_without_language_tag() {
        let fenced = "```\nSELECT * FROM MOVIE WHERE Universe=\"Marvel\";\n```";
        assert_eq!(
            parse_sql(fenced).unwrap(),
            "SELECT * FROM MOVIE WHERE Universe=\"Marvel\";"
        );
    }

    #[test]
    fn strips_bare_leading_language_tag() {
        assert_eq!(
            parse_sql("sql SELECT Name FROM MOVIE;").unwrap(),
            "SELECT Name FROM MOVIE;"
        );
    }

    #[test]
    fn fenced_and_unfenced_parse_identically() {
        let plain = "SELECT COUNT(*) FROM MOVIE;";
        let fenced = format!("```sql\n{}\n```", plain);
        assert_eq!(parse_sql(plain).unwrap(), parse_sql(&fenced).unwrap());
    }

    #[test]
    fn fence_stripping_is_idempotent() {
        let fenced = "```sql\nSELECT Revenue FROM MOVIE WHERE Year > 2010;\n```";
        let once = strip_fences(fenced);
        assert_eq!(strip_fences(&once), once);
    }

    #[test]
    fn blank_output_is_an_empty_query() {
        assert!(matches!(parse_sql("```sql\n```"), Err(ApiError::EmptyQuery)));
        assert!(matches!(parse_sql("   "), Err(ApiError::EmptyQuery)));
    }

    #[test]
    fn multi_line_statements_survive() {
        let raw = "```sql\nSELECT Name, Revenue\nFROM MOVIE\nWHERE Universe=\"Marvel\";\n```";
        let sql = parse_sql(raw).unwrap();
        assert!(sql.starts_with("SELECT Name, Revenue"));
        assert!(sql.ends_with("WHERE Universe=\"Marvel\";"));
    }

    #[test]
    fn parses_complete_report() {
        let raw = r#"```json
        {"topic": "London", "summary": "Capital of England.",
         "sources": ["https://en.wikipedia.org/wiki/London"],
         "tools_used": ["search_tool"]}
        ```"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.topic, "London");
        assert_eq!(report.sources.len(), 1);
    }

    #[test]
    fn parses_report_embedded_in_prose() {
        let raw = "Here is the report you asked for: {\"topic\": \"t\", \"summary\": \"s\", \"sources\": [], \"tools_used\": []} hope that helps";
        let report = parse_report(raw).unwrap();
        assert_eq!(report.topic, "t");
    }

    #[test]
    fn missing_sources_is_a_schema_mismatch() {
        let raw = r#"{"topic": "t", "summary": "s", "tools_used": []}"#;
        match parse_report(raw) {
            Err(ApiError::SchemaMismatch { raw: echoed, .. }) => assert_eq!(echoed, raw),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn wrongly_typed_sources_is_a_schema_mismatch() {
        let raw = r#"{"topic": "t", "summary": "s", "sources": "just one", "tools_used": []}"#;
        assert!(matches!(
            parse_report(raw),
            Err(ApiError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn format_instructions_name_every_field() {
        let instructions = format_instructions();
        for field in ["topic", "summary", "sources", "tools_used"] {
            assert!(instructions.contains(field), "missing {field}");
        }
    }
}
