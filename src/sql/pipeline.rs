use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::executor::{QueryOutput, SqlExecutor};
use crate::core::config::settings::{DatabaseSettings, LlmSettings};
use crate::core::errors::ApiError;
use crate::interpret;
use crate::llm::{ChatRequest, LlmProvider};
use crate::prompt::{render, PromptTemplate};

const NL2SQL_TEMPLATE: &str = "\
You are an expert in converting English questions to SQL queries.
The SQL database has the name {table} and has the following columns: {columns}.

For example:
Example 1 - How many entries of records are present?
The SQL command will be something like this: SELECT COUNT(*) FROM {table};
Example 2 - Tell me everything in a given category.
The SQL command will be something like this: SELECT * FROM {table} WHERE {first_column}=\"value\";

Reply with a single SQL statement only: no code fences, no leading 'sql' tag,
no explanation before or after the statement.";

#[derive(Debug, Clone, Serialize)]
pub struct Nl2SqlOutcome {
    pub query: String,
    pub output: QueryOutput,
}

/// English question → generated SQL → executed rows.
///
/// The generated statement is executed as produced by the model; the
/// injection posture of that choice is recorded in DESIGN.md.
pub struct Nl2SqlService {
    llm: Arc<dyn LlmProvider>,
    executor: SqlExecutor,
    template: PromptTemplate,
    database: DatabaseSettings,
    chat_model: String,
    temperature: f64,
}

impl Nl2SqlService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        executor: SqlExecutor,
        database: DatabaseSettings,
        llm_settings: &LlmSettings,
    ) -> Self {
        Self {
            llm,
            executor,
            template: PromptTemplate::new(NL2SQL_TEMPLATE),
            database,
            chat_model: llm_settings.chat_model.clone(),
            temperature: llm_settings.temperature,
        }
    }

    pub async fn ask(&self, question: &str) -> Result<Nl2SqlOutcome, ApiError> {
        let first_column = self
            .database
            .columns
            .first()
            .cloned()
            .unwrap_or_else(|| "Name".to_string());
        let bindings: HashMap<&str, String> = HashMap::from([
            ("table", self.database.table.clone()),
            ("columns", self.database.columns.join(", ")),
            ("first_column", first_column),
        ]);

        let messages = render(&self.template, &bindings, &[], question)?;
        let response = self
            .llm
            .chat(
                ChatRequest::new(messages).with_temperature(self.temperature),
                &self.chat_model,
            )
            .await?;

        let query = interpret::parse_sql(&response.text)?;
        tracing::debug!(%query, "generated SQL");

        let output = self.executor.execute(&query).await?;
        Ok(Nl2SqlOutcome { query, output })
    }
}
