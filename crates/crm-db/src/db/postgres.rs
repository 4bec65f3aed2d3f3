use std::time::Duration;

use crm_core::AppError;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};

use super::{Document, Filter, KeyValueBackend, RecordKey};

/// Records stored as JSONB rows in a single `crm_records` table, keyed by
/// `(collection, partition_key, id)`.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        timeout_seconds: u64,
    ) -> Result<Self, AppError> {
        tracing::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(timeout_seconds))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to database");
                AppError::StoreUnavailable(format!("Failed to connect to database: {}", e))
            })?;

        tracing::info!(max_connections, "Database connected successfully");
        Ok(Self { pool })
    }

    /// Apply pending migrations from the workspace `migrations/` directory
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to run database migrations");
                AppError::Internal(format!("Failed to run database migrations: {}", e))
            })?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connectivity failures become `StoreUnavailable`; everything else is a database error.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AppError {
    tracing::error!(error = %err, operation, "PostgreSQL record store error");
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::StoreUnavailable(format!("{} failed: {}", operation, err))
        }
        other => AppError::Database(other),
    }
}

#[async_trait::async_trait]
impl KeyValueBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[tracing::instrument(skip(self, document), fields(
        db.system = "postgresql",
        db.table = "crm_records",
        db.collection = %key.collection,
        db.operation = "upsert",
        db.record_id = %key.id
    ))]
    async fn put(&self, key: &RecordKey<'_>, document: Document) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO crm_records (collection, partition_key, id, data, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (collection, partition_key, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(key.collection)
        .bind(key.partition)
        .bind(key.id)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put", e))?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "crm_records",
        db.collection = %key.collection,
        db.operation = "select",
        db.record_id = %key.id
    ))]
    async fn get(&self, key: &RecordKey<'_>) -> Result<Option<Document>, AppError> {
        sqlx::query_scalar::<Postgres, Value>(
            "SELECT data FROM crm_records WHERE collection = $1 AND partition_key = $2 AND id = $3",
        )
        .bind(key.collection)
        .bind(key.partition)
        .bind(key.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))
    }

    #[tracing::instrument(skip(self, filter), fields(
        db.system = "postgresql",
        db.table = "crm_records",
        db.collection = %collection,
        db.operation = "select"
    ))]
    async fn query(
        &self,
        collection: &str,
        partition: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, AppError> {
        sqlx::query_scalar::<Postgres, Value>(
            r#"
            SELECT data FROM crm_records
            WHERE collection = $1 AND partition_key = $2 AND data @> $3
            ORDER BY id
            "#,
        )
        .bind(collection)
        .bind(partition)
        .bind(filter.as_json())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("query", e))
    }

    #[tracing::instrument(skip(self, filter), fields(
        db.system = "postgresql",
        db.table = "crm_records",
        db.collection = %collection,
        db.operation = "scan"
    ))]
    async fn scan(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError> {
        sqlx::query_scalar::<Postgres, Value>(
            "SELECT data FROM crm_records WHERE collection = $1 AND data @> $2 ORDER BY partition_key, id",
        )
        .bind(collection)
        .bind(filter.as_json())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("scan", e))
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "crm_records",
        db.collection = %key.collection,
        db.operation = "delete",
        db.record_id = %key.id
    ))]
    async fn remove(&self, key: &RecordKey<'_>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM crm_records WHERE collection = $1 AND partition_key = $2 AND id = $3",
        )
        .bind(key.collection)
        .bind(key.partition)
        .bind(key.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }
}
