use std::sync::Arc;

use crm_core::{AppError, Config, StoreBackend};
use serde_json::{Map, Value};

use super::{InMemoryBackend, PostgresBackend};

/// Stored representation of a record
pub type Document = Value;

/// Full address of a record inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey<'a> {
    pub collection: &'a str,
    pub partition: &'a str,
    pub id: &'a str,
}

impl<'a> RecordKey<'a> {
    pub fn new(collection: &'a str, partition: &'a str, id: &'a str) -> Self {
        Self {
            collection,
            partition,
            id,
        }
    }
}

/// Conjunction of equality constraints on top-level document fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field == value`. A later constraint on the same field replaces the earlier one.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.conditions.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = value,
            None => self.conditions.push((field, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// Containment object for JSONB `@>` queries
    pub fn as_json(&self) -> Value {
        let map: Map<String, Value> = self.conditions.iter().cloned().collect();
        Value::Object(map)
    }
}

/// Persistence target of the tenant-scoped store.
///
/// Implementations store opaque JSON documents. Every read and write names its
/// partition explicitly except [`KeyValueBackend::scan`], which is reserved for
/// top-level administrative listings.
#[async_trait::async_trait]
pub trait KeyValueBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or replace the record at `key`
    async fn put(&self, key: &RecordKey<'_>, document: Document) -> Result<(), AppError>;

    async fn get(&self, key: &RecordKey<'_>) -> Result<Option<Document>, AppError>;

    /// All records in one partition that satisfy `filter`
    async fn query(
        &self,
        collection: &str,
        partition: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, AppError>;

    /// All records in a collection, across partitions, that satisfy `filter`
    async fn scan(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError>;

    /// Physically remove a record. Returns whether it existed.
    ///
    /// Domain deletes are soft; this exists for rolling back partially
    /// completed multi-step operations.
    async fn remove(&self, key: &RecordKey<'_>) -> Result<bool, AppError>;

    /// Cheap connectivity check
    async fn ping(&self) -> Result<(), AppError>;
}

/// Build the backend selected by `STORE_BACKEND`.
pub async fn create_backend(config: &Config) -> Result<Arc<dyn KeyValueBackend>, AppError> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Initializing in-memory record store");
            Ok(Arc::new(InMemoryBackend::new()))
        }
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                AppError::Internal("DATABASE_URL is required when STORE_BACKEND=postgres".into())
            })?;
            tracing::info!("Initializing PostgreSQL record store");
            let backend =
                PostgresBackend::connect(url, config.db_max_connections, config.db_timeout_seconds)
                    .await?;
            backend.migrate().await?;
            Ok(Arc::new(backend))
        }
    }
}
