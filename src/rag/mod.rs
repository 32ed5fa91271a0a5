pub mod engine;
pub mod ingest;
pub mod sqlite;
pub mod store;

pub use engine::{RagAnswer, RagEngine};
pub use ingest::CsvIngestor;
pub use sqlite::SqliteVectorStore;
pub use store::{DocSearchResult, StoredDoc, VectorStore};
