//! Typed, tenant-scoped view over a [`KeyValueBackend`].
//!
//! Every operation names the partition it touches. Tenant-owned entities are
//! partitioned by `tenant_id`, which callers take from the resolved
//! authorization context and never from request payloads, so one tenant cannot
//! address another tenant's records.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use crm_core::models::{Entity, Managed, Patch};
use crm_core::AppError;

use super::{Document, Filter, KeyValueBackend, RecordKey};

pub struct TenantScopedStore<E: Entity> {
    backend: Arc<dyn KeyValueBackend>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for TenantScopedStore<E> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> TenantScopedStore<E> {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            _entity: PhantomData,
        }
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueBackend> {
        &self.backend
    }

    fn decode(document: Document) -> Result<E, AppError> {
        serde_json::from_value(document).map_err(|e| {
            tracing::error!(error = %e, collection = E::COLLECTION, "Failed to decode stored record");
            AppError::Internal(format!("Corrupt {} record: {}", E::LABEL, e))
        })
    }

    fn decode_sorted(documents: Vec<Document>) -> Result<Vec<E>, AppError> {
        let mut entities = documents
            .into_iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()?;
        entities.sort_by_key(|e| e.created_at());
        Ok(entities)
    }

    /// Upsert by primary key, refreshing `updated_at`.
    #[tracing::instrument(skip(self, entity), fields(db.collection = E::COLLECTION, db.operation = "put", db.record_id = %entity.id()))]
    pub async fn put(&self, mut entity: E) -> Result<E, AppError> {
        entity.touch(Utc::now());
        let document = serde_json::to_value(&entity).map_err(|e| {
            AppError::Internal(format!("Failed to encode {} record: {}", E::LABEL, e))
        })?;
        let key = RecordKey::new(E::COLLECTION, entity.partition_key(), entity.id());
        self.backend.put(&key, document).await?;
        Ok(entity)
    }

    /// Point lookup. Soft-deleted records are returned with `is_active = false`.
    pub async fn find(&self, id: &str, partition: &str) -> Result<Option<E>, AppError> {
        let key = RecordKey::new(E::COLLECTION, partition, id);
        self.backend.get(&key).await?.map(Self::decode).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.collection = E::COLLECTION, db.operation = "get"))]
    pub async fn get(&self, id: &str, partition: &str) -> Result<E, AppError> {
        self.find(id, partition)
            .await?
            .ok_or_else(|| AppError::not_found(E::LABEL))
    }

    /// Active records in `partition` matching `filter`, oldest first.
    #[tracing::instrument(skip(self, filter), fields(db.collection = E::COLLECTION, db.operation = "query"))]
    pub async fn query(&self, partition: &str, filter: Filter) -> Result<Vec<E>, AppError> {
        self.query_all(partition, filter.eq("is_active", true)).await
    }

    /// Like [`Self::query`] but includes soft-deleted records.
    pub async fn query_all(&self, partition: &str, filter: Filter) -> Result<Vec<E>, AppError> {
        let documents = self.backend.query(E::COLLECTION, partition, &filter).await?;
        Self::decode_sorted(documents)
    }

    /// Active records across every partition. Administrative listings only.
    #[tracing::instrument(skip(self, filter), fields(db.collection = E::COLLECTION, db.operation = "scan"))]
    pub async fn scan(&self, filter: Filter) -> Result<Vec<E>, AppError> {
        let documents = self
            .backend
            .scan(E::COLLECTION, &filter.eq("is_active", true))
            .await?;
        Self::decode_sorted(documents)
    }

    /// Merge-patch update: fields absent from `patch` keep their values.
    #[tracing::instrument(skip(self, patch), fields(db.collection = E::COLLECTION, db.operation = "update"))]
    pub async fn update<P: Patch<E>>(
        &self,
        id: &str,
        partition: &str,
        patch: P,
    ) -> Result<E, AppError> {
        let mut entity = self.get(id, partition).await?;
        patch.apply(&mut entity);
        let entity = self.put(entity).await?;
        tracing::info!(record_id = %id, "{} updated", E::LABEL);
        Ok(entity)
    }

    /// Flip `is_active` to false. Deleting an already inactive record succeeds unchanged.
    #[tracing::instrument(skip(self), fields(db.collection = E::COLLECTION, db.operation = "soft_delete"))]
    pub async fn soft_delete(&self, id: &str, partition: &str) -> Result<E, AppError> {
        let mut entity = self.get(id, partition).await?;
        if !entity.is_active() {
            return Ok(entity);
        }
        entity.set_active(false);
        let entity = self.put(entity).await?;
        tracing::info!(record_id = %id, "{} soft-deleted", E::LABEL);
        Ok(entity)
    }

    /// Physically remove a record. Used only to undo partially completed operations.
    pub async fn remove(&self, id: &str, partition: &str) -> Result<bool, AppError> {
        self.backend
            .remove(&RecordKey::new(E::COLLECTION, partition, id))
            .await
    }
}

impl<E: Entity + Managed> TenantScopedStore<E> {
    /// Overwrite only the manager (and `updated_at`). Returns the previous manager and the record.
    #[tracing::instrument(skip(self), fields(db.collection = E::COLLECTION, db.operation = "change_manager"))]
    pub async fn change_manager(
        &self,
        id: &str,
        partition: &str,
        manager_id: &str,
    ) -> Result<(String, E), AppError> {
        let mut entity = self.get(id, partition).await?;
        let previous = entity.manager_id().to_string();
        entity.set_manager(manager_id.to_string());
        let entity = self.put(entity).await?;
        Ok((previous, entity))
    }
}
