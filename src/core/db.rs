use crate::domain::model::HealthStatus;
use crate::domain::ports::{HealthCheck, Metrics};
use crate::utils::error::{AdapterError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, Postgres};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_secs(1);
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Relational database client over a pooled sqlx Postgres engine.
///
/// Callers build queries with `sqlx::query`/`sqlx::query_as` and hand them
/// here; the client owns pooling, timing, metrics labels and slow-query
/// logging. The `table` argument is a metrics/log label only and never
/// enters the SQL.
pub struct DbClient {
    pool: PgPool,
    metrics: Arc<dyn Metrics>,
    slow_query_threshold: Duration,
}

impl DbClient {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        metrics: Arc<dyn Metrics>,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool, metrics))
    }

    pub fn from_pool(pool: PgPool, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            pool,
            metrics,
            slow_query_threshold: DEFAULT_SLOW_QUERY_THRESHOLD,
        }
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn fetch_all<'q, T>(
        &self,
        table: &str,
        query: QueryAs<'q, Postgres, T, PgArguments>,
    ) -> Result<Vec<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        self.observe("fetch_all", table, query.fetch_all(&self.pool))
            .await
    }

    pub async fn fetch_optional<'q, T>(
        &self,
        table: &str,
        query: QueryAs<'q, Postgres, T, PgArguments>,
    ) -> Result<Option<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        self.observe("fetch_optional", table, query.fetch_optional(&self.pool))
            .await
    }

    /// Run a statement and return the affected row count.
    pub async fn execute<'q>(
        &self,
        table: &str,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<u64> {
        let result = self
            .observe("execute", table, query.execute(&self.pool))
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn execute_sql(&self, table: &str, sql: &str) -> Result<u64> {
        self.execute(table, sqlx::query(sql)).await
    }

    pub async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("[DB HEALTH CHECK FAILED] {}", e);
                false
            }
        }
    }

    async fn observe<T, F>(&self, operation: &str, table: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed = start.elapsed();

        match result {
            Ok(value) => {
                self.metrics
                    .observe_operation(operation, table, elapsed.as_secs_f64(), true);
                if elapsed > self.slow_query_threshold {
                    tracing::warn!(
                        "[SLOW QUERY] {} on '{}' took {:.2}s",
                        operation,
                        table,
                        elapsed.as_secs_f64()
                    );
                }
                Ok(value)
            }
            Err(e) => {
                self.metrics
                    .observe_operation(operation, table, elapsed.as_secs_f64(), false);
                self.metrics.record_error(operation, table, error_label(&e));
                tracing::warn!("[DB ERROR] {} on '{}': {}", operation, table, e);
                Err(AdapterError::DatabaseError(e))
            }
        }
    }
}

fn error_label(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Database(_) => "database",
        sqlx::Error::RowNotFound => "row_not_found",
        sqlx::Error::PoolTimedOut => "pool_timeout",
        sqlx::Error::PoolClosed => "pool_closed",
        sqlx::Error::Io(_) => "io",
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => "decode",
        _ => "other",
    }
}

#[async_trait]
impl HealthCheck for DbClient {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> HealthStatus {
        if self.health_check().await {
            HealthStatus::healthy("database")
        } else {
            HealthStatus::unhealthy("database", "SELECT 1 failed")
        }
    }
}

/// Generate an `INSERT ... ON CONFLICT` statement with `$n` placeholders.
///
/// Update columns are the insert columns minus the conflict columns; when
/// none remain the statement degrades to `DO NOTHING`.
pub fn build_upsert(
    table: &str,
    columns: &[&str],
    conflict_columns: &[&str],
    do_nothing: bool,
) -> Result<String> {
    build_upsert_many(table, columns, conflict_columns, do_nothing, 1)
}

/// Multi-row variant of [`build_upsert`]: one placeholder group per row.
pub fn build_upsert_many(
    table: &str,
    columns: &[&str],
    conflict_columns: &[&str],
    do_nothing: bool,
    rows: usize,
) -> Result<String> {
    if columns.is_empty() {
        return Err(AdapterError::ConfigError {
            message: format!("Upsert into '{}' requires at least one column", table),
        });
    }
    if conflict_columns.is_empty() {
        return Err(AdapterError::ConfigError {
            message: format!("Upsert into '{}' requires conflict columns", table),
        });
    }
    if rows == 0 {
        return Err(AdapterError::ConfigError {
            message: format!("Upsert into '{}' requires at least one row", table),
        });
    }
    for conflict in conflict_columns {
        if !columns.contains(conflict) {
            return Err(AdapterError::ConfigError {
                message: format!(
                    "Conflict column '{}' is not an insert column of '{}'",
                    conflict, table
                ),
            });
        }
    }

    let mut groups = Vec::with_capacity(rows);
    let mut index = 1;
    for _ in 0..rows {
        let placeholders: Vec<String> = (0..columns.len())
            .map(|offset| format!("${}", index + offset))
            .collect();
        index += columns.len();
        groups.push(format!("({})", placeholders.join(", ")));
    }

    let update_columns: Vec<&&str> = columns
        .iter()
        .filter(|c| !conflict_columns.contains(c))
        .collect();

    let conflict_action = if do_nothing || update_columns.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let assignments: Vec<String> = update_columns
            .iter()
            .map(|c| format!("{} = EXCLUDED.{}", c, c))
            .collect();
        format!("DO UPDATE SET {}", assignments.join(", "))
    };

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) {}",
        table,
        columns.join(", "),
        groups.join(", "),
        conflict_columns.join(", "),
        conflict_action
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_upsert_single_row() {
        let sql = build_upsert(
            "entity",
            &["id", "name", "value"],
            &["id"],
            false,
        )
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO entity (id, name, value) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, value = EXCLUDED.value"
        );
    }

    #[test]
    fn test_build_upsert_do_nothing() {
        let sql = build_upsert("entity", &["id", "name"], &["id"], true).unwrap();
        assert!(sql.ends_with("ON CONFLICT (id) DO NOTHING"));
    }

    #[test]
    fn test_build_upsert_degrades_when_all_columns_conflict() {
        let sql = build_upsert("link", &["a", "b"], &["a", "b"], false).unwrap();
        assert!(sql.ends_with("ON CONFLICT (a, b) DO NOTHING"));
    }

    #[test]
    fn test_build_upsert_many_numbers_placeholders_per_row() {
        let sql = build_upsert_many("entity", &["id", "name"], &["id"], false, 3).unwrap();
        assert!(sql.contains("VALUES ($1, $2), ($3, $4), ($5, $6)"));
    }

    #[test]
    fn test_build_upsert_rejects_bad_input() {
        assert!(build_upsert("t", &[], &["id"], false).is_err());
        assert!(build_upsert("t", &["id"], &[], false).is_err());
        assert!(build_upsert("t", &["name"], &["id"], false).is_err());
        assert!(build_upsert_many("t", &["id"], &["id"], false, 0).is_err());
    }
}
