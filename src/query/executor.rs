use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::sql::{ensure_row_limit, is_select, split_statements};

#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// Caller asserts the script has already passed `is_read_only`. The
    /// executor trusts this gate; it does not re-classify.
    pub enforce_read_only: bool,
    /// When set, a `LIMIT` clause is appended to statements that carry no
    /// `limit` token of their own.
    pub row_cap: Option<u32>,
}

impl ExecuteOptions {
    /// Operator path: any statement kind, no cap.
    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            enforce_read_only: false,
            row_cap: None,
        }
    }

    /// Public path: read-only scripts, rows capped.
    #[must_use]
    pub fn read_only_capped(row_cap: u32) -> Self {
        Self {
            enforce_read_only: true,
            row_cap: Some(row_cap),
        }
    }
}

/// One SELECT statement's outcome. Non-select statements produce no entry in
/// the result sequence at all.
#[derive(Debug, Serialize)]
pub struct StatementResult {
    pub statement: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// Runs statement scripts against a project's backend database.
///
/// One scoped connection per call, statements in script order, all-or-nothing:
/// the first failure aborts the remainder and discards earlier results.
pub struct QueryExecutor {
    backend: Arc<dyn Backend>,
    statement_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn Backend>, statement_timeout: Duration) -> Self {
        Self {
            backend,
            statement_timeout,
        }
    }

    pub async fn execute(
        &self,
        database: &str,
        script: &str,
        options: ExecuteOptions,
    ) -> Result<Vec<StatementResult>> {
        debug_assert!(
            !options.enforce_read_only || crate::sql::is_read_only(script),
            "read-only gating must happen before execute"
        );

        let statements = split_statements(script);
        let mut conn = self.backend.connect(database).await?;
        let mut results = Vec::new();

        for statement in statements {
            let statement = match options.row_cap {
                Some(cap) => ensure_row_limit(&statement, cap),
                None => statement,
            };

            if is_select(&statement) {
                let fetched = self.bounded(conn.query(&statement)).await?;
                results.push(StatementResult {
                    statement,
                    columns: fetched.columns,
                    rows: fetched.rows,
                });
            } else {
                self.bounded(conn.execute(&statement)).await?;
            }
        }

        Ok(results)
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        tokio::time::timeout(self.statement_timeout, fut)
            .await
            .map_err(|_| Error::QueryTimeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use tempfile::TempDir;

    const DB: &str = "proj_exec";

    async fn test_executor() -> (TempDir, QueryExecutor) {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(SqliteBackend::new(tmp.path()));
        backend.ensure_database(DB).await.unwrap();
        let executor = QueryExecutor::new(backend, Duration::from_secs(30));
        (tmp, executor)
    }

    #[tokio::test]
    async fn test_multi_statement_script_in_order() {
        let (_tmp, executor) = test_executor().await;

        let results = executor
            .execute(
                DB,
                "CREATE TABLE t (n INTEGER); INSERT INTO t VALUES (1), (2); select n from t order by n",
                ExecuteOptions::unrestricted(),
            )
            .await
            .unwrap();

        // Only the select contributes a result entry.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].columns, vec!["n"]);
        assert_eq!(results[0].rows.len(), 2);
        assert_eq!(results[0].rows[1]["n"], 2);
    }

    #[tokio::test]
    async fn test_script_with_no_selects_returns_empty() {
        let (_tmp, executor) = test_executor().await;

        let results = executor
            .execute(
                DB,
                "CREATE TABLE t (n INTEGER); INSERT INTO t VALUES (1)",
                ExecuteOptions::unrestricted(),
            )
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_row_cap_appended_to_uncapped_select() {
        let (_tmp, executor) = test_executor().await;
        executor
            .execute(DB, "CREATE TABLE t (n INTEGER)", ExecuteOptions::unrestricted())
            .await
            .unwrap();

        let results = executor
            .execute(DB, "select n from t", ExecuteOptions::read_only_capped(500))
            .await
            .unwrap();
        assert_eq!(results[0].statement, "select n from t LIMIT 500");
    }

    #[tokio::test]
    async fn test_row_cap_enforced() {
        let (_tmp, executor) = test_executor().await;
        executor
            .execute(
                DB,
                "CREATE TABLE t (n INTEGER);
                 INSERT INTO t WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 600) SELECT x FROM c",
                ExecuteOptions::unrestricted(),
            )
            .await
            .unwrap();

        let results = executor
            .execute(DB, "select n from t", ExecuteOptions::read_only_capped(500))
            .await
            .unwrap();
        assert_eq!(results[0].rows.len(), 500);
    }

    #[tokio::test]
    async fn test_existing_limit_left_unmodified() {
        let (_tmp, executor) = test_executor().await;
        executor
            .execute(
                DB,
                "CREATE TABLE t (n INTEGER); INSERT INTO t VALUES (1), (2), (3)",
                ExecuteOptions::unrestricted(),
            )
            .await
            .unwrap();

        let results = executor
            .execute(
                DB,
                "select n from t limit 2",
                ExecuteOptions::read_only_capped(500),
            )
            .await
            .unwrap();
        assert_eq!(results[0].statement, "select n from t limit 2");
        assert_eq!(results[0].rows.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_statements() {
        let (_tmp, executor) = test_executor().await;

        let err = executor
            .execute(
                DB,
                "CREATE TABLE t (n INTEGER); INSERT INTO missing VALUES (1); INSERT INTO t VALUES (1)",
                ExecuteOptions::unrestricted(),
            )
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Execution(_)));

        // The statement after the failing one never ran.
        let results = executor
            .execute(DB, "select count(*) AS c from t", ExecuteOptions::unrestricted())
            .await
            .unwrap();
        assert_eq!(results[0].rows[0]["c"], 0);
    }

    #[tokio::test]
    async fn test_statement_timeout() {
        use crate::backend::{Backend, BackendConnection, QueryRows};
        use async_trait::async_trait;

        // Backend whose statements never finish.
        struct StallingBackend;
        struct StallingConn;

        #[async_trait]
        impl Backend for StallingBackend {
            async fn ensure_database(&self, _name: &str) -> crate::error::Result<()> {
                Ok(())
            }
            async fn drop_database(&self, _name: &str) -> crate::error::Result<()> {
                Ok(())
            }
            async fn list_tables(&self, _database: &str) -> crate::error::Result<Vec<String>> {
                Ok(Vec::new())
            }
            async fn connect(
                &self,
                _database: &str,
            ) -> crate::error::Result<Box<dyn BackendConnection>> {
                Ok(Box::new(StallingConn))
            }
        }

        #[async_trait]
        impl BackendConnection for StallingConn {
            async fn query(&mut self, _statement: &str) -> crate::error::Result<QueryRows> {
                std::future::pending().await
            }
            async fn execute(&mut self, _statement: &str) -> crate::error::Result<u64> {
                std::future::pending().await
            }
        }

        let executor = QueryExecutor::new(Arc::new(StallingBackend), Duration::from_millis(10));
        let err = executor
            .execute("proj_t", "select 1", ExecuteOptions::unrestricted())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::QueryTimeout));
    }

    #[tokio::test]
    async fn test_missing_database() {
        let (_tmp, executor) = test_executor().await;
        let err = executor
            .execute("proj_absent", "select 1", ExecuteOptions::unrestricted())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::DatabaseNotFound(_)));
    }
}
