use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::AgentRuntime;
use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::core::errors::ApiError;
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::rag::{CsvIngestor, RagEngine, SqliteVectorStore, VectorStore};
use crate::sql::{Nl2SqlService, SqlExecutor};
use crate::tools::{SaveTool, SearchTool, ToolRegistry, WikiTool};

/// Shared application state: configuration plus the three request pipelines.
/// Everything here is immutable after startup.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Settings,
    pub llm: Arc<dyn LlmProvider>,
    pub nl2sql: Nl2SqlService,
    pub rag_engine: RagEngine,
    pub ingestor: CsvIngestor,
    pub agent: AgentRuntime,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, ApiError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config.load_settings()?;

        let timeout = Duration::from_secs(settings.llm.request_timeout_secs);
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatProvider::new(
            settings.llm.base_url.clone(),
            settings.llm.api_key.clone(),
            timeout,
        )?);

        let executor = SqlExecutor::open(resolve_path(&paths, &settings.database.path)).await?;
        let nl2sql = Nl2SqlService::new(
            llm.clone(),
            executor,
            settings.database.clone(),
            &settings.llm,
        );

        let store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::open(resolve_path(&paths, &settings.rag.index_path)).await?,
        );
        let rag_engine = RagEngine::new(store.clone(), llm.clone(), settings.rag.clone(), &settings.llm);
        let ingestor = CsvIngestor::new(
            store,
            llm.clone(),
            settings.llm.embedding_model.clone(),
            settings.rag.source_column.clone(),
        );

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(SearchTool::new(timeout)?));
        tools.register(Arc::new(WikiTool::new(timeout)?));
        tools.register(Arc::new(SaveTool::new(resolve_path(
            &paths,
            &settings.agent.output_path,
        ))));
        let agent = AgentRuntime::new(llm.clone(), Arc::new(tools), &settings.agent, &settings.llm);

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            llm,
            nl2sql,
            rag_engine,
            ingestor,
            agent,
        }))
    }
}

fn resolve_path(paths: &AppPaths, configured: &str) -> PathBuf {
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        path
    } else {
        paths.user_data_dir.join(path)
    }
}
