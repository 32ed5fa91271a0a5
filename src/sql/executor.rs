use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo};

use crate::core::errors::ApiError;

/// Ordered result rows from a single executed statement.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Runs generated SQL against the backing store. The statement is executed
/// as-is: no sanitization or rewriting happens here.
#[derive(Clone)]
pub struct SqlExecutor {
    pool: SqlitePool,
}

impl SqlExecutor {
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        Ok(Self { pool })
    }

    /// Executes exactly one statement and fetches all rows. The pooled
    /// connection is returned on every exit path, including failure.
    pub async fn execute(&self, sql: &str) -> Result<QueryOutput, ApiError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| ApiError::QueryExecutionError(err.to_string()))?;

        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|idx| value_at(row, idx))
                    .collect()
            })
            .collect();

        Ok(QueryOutput { columns, rows })
    }
}

fn value_at(row: &SqliteRow, idx: usize) -> Value {
    match row.column(idx).type_info().name() {
        "INTEGER" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|bytes| Value::String(format!("<{} bytes>", bytes.len())))
            .unwrap_or(Value::Null),
        "NULL" => Value::Null,
        _ => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn movie_executor() -> (tempfile::TempDir, SqlExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let executor = SqlExecutor::open(dir.path().join("movie.db")).await.unwrap();

        executor
            .execute(
                "CREATE TABLE MOVIE (Name TEXT, Revenue REAL, Year INTEGER, Universe TEXT)",
            )
            .await
            .unwrap();
        executor
            .execute(
                "INSERT INTO MOVIE VALUES
                 ('Iron Man', 585.8, 2008, 'Marvel'),
                 ('Man of Steel', 668.0, 2013, 'DC'),
                 ('Avengers: Endgame', 2797.5, 2019, 'Marvel')",
            )
            .await
            .unwrap();

        (dir, executor)
    }

    #[tokio::test]
    async fn count_query_yields_single_row_single_column() {
        let (_dir, executor) = movie_executor().await;

        let output = executor
            .execute("SELECT COUNT(*) FROM MOVIE;")
            .await
            .unwrap();

        assert_eq!(output.rows.len(), 1);
        assert_eq!(output.rows[0].len(), 1);
        assert_eq!(output.rows[0][0], Value::from(3));
    }

    #[tokio::test]
    async fn rows_keep_column_order_and_types() {
        let (_dir, executor) = movie_executor().await;

        let output = executor
            .execute("SELECT Name, Revenue, Year FROM MOVIE WHERE Universe='Marvel' ORDER BY Year")
            .await
            .unwrap();

        assert_eq!(output.columns, vec!["Name", "Revenue", "Year"]);
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.rows[0][0], Value::from("Iron Man"));
        assert_eq!(output.rows[0][1], Value::from(585.8));
        assert_eq!(output.rows[0][2], Value::from(2008));
    }

    #[tokio::test]
    async fn malformed_sql_surfaces_store_message() {
        let (_dir, executor) = movie_executor().await;

        let err = executor.execute("SELEC * FROM MOVIE").await.unwrap_err();
        match err {
            ApiError::QueryExecutionError(msg) => assert!(msg.contains("syntax error")),
            other => panic!("expected QueryExecutionError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_statements_do_not_leak_connections() {
        let (_dir, executor) = movie_executor().await;

        // More failures than the pool holds connections; a leaked connection
        // would make the final acquire time out.
        for _ in 0..8 {
            let _ = executor.execute("SELECT nope FROM MOVIE").await.unwrap_err();
        }

        let output = executor
            .execute("SELECT COUNT(*) FROM MOVIE;")
            .await
            .unwrap();
        assert_eq!(output.rows[0][0], Value::from(3));
    }

    #[tokio::test]
    async fn empty_result_set_is_not_an_error() {
        let (_dir, executor) = movie_executor().await;

        let output = executor
            .execute("SELECT * FROM MOVIE WHERE Universe='Ghibli'")
            .await
            .unwrap();
        assert!(output.rows.is_empty());
    }
}
