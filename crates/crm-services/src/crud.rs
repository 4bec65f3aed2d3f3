//! Generic tenant-scoped CRUD shared by every entity service.

use crm_core::models::{Entity, Patch};
use crm_core::AppError;
use crm_db::{Filter, TenantScopedStore};

pub struct CrudService<E: Entity> {
    store: TenantScopedStore<E>,
}

impl<E: Entity> Clone for CrudService<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<E: Entity> CrudService<E> {
    pub fn new(store: TenantScopedStore<E>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TenantScopedStore<E> {
        &self.store
    }

    #[tracing::instrument(skip(self, entity), fields(entity = E::LABEL))]
    pub async fn create(&self, entity: E) -> Result<E, AppError> {
        let created = self.store.put(entity).await?;
        tracing::info!(
            record_id = %created.id(),
            partition = %created.partition_key(),
            "{} created",
            E::LABEL
        );
        Ok(created)
    }

    pub async fn get(&self, id: &str, partition: &str) -> Result<E, AppError> {
        self.store.get(id, partition).await
    }

    pub async fn update<P: Patch<E>>(
        &self,
        id: &str,
        partition: &str,
        patch: P,
    ) -> Result<E, AppError> {
        self.store.update(id, partition, patch).await
    }

    pub async fn delete(&self, id: &str, partition: &str) -> Result<E, AppError> {
        self.store.soft_delete(id, partition).await
    }

    /// Active records in the partition
    pub async fn list(&self, partition: &str, filter: Filter) -> Result<Vec<E>, AppError> {
        self.store.query(partition, filter).await
    }
}
