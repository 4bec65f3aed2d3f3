use crm_core::models::{Tenant, TenantCreate, TenantUpdate, TENANT_PARTITION};
use crm_core::AppError;
use crm_db::{Filter, TenantScopedStore};

use crate::CrudService;

/// Tenants are top-level records keyed by id alone.
#[derive(Clone)]
pub struct TenantService {
    crud: CrudService<Tenant>,
}

impl TenantService {
    pub fn new(store: TenantScopedStore<Tenant>) -> Self {
        Self {
            crud: CrudService::new(store),
        }
    }

    pub async fn create(&self, request: TenantCreate) -> Result<Tenant, AppError> {
        self.crud.create(Tenant::new(request.name)).await
    }

    pub async fn get(&self, tenant_id: &str) -> Result<Tenant, AppError> {
        self.crud.get(tenant_id, TENANT_PARTITION).await
    }

    pub async fn update(&self, tenant_id: &str, update: TenantUpdate) -> Result<Tenant, AppError> {
        self.crud.update(tenant_id, TENANT_PARTITION, update).await
    }

    pub async fn delete(&self, tenant_id: &str) -> Result<Tenant, AppError> {
        self.crud.delete(tenant_id, TENANT_PARTITION).await
    }

    /// Every active tenant
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Tenant>, AppError> {
        self.crud.store().scan(Filter::new()).await
    }

    /// The tenant, provided it exists and is active
    pub async fn require_active(&self, tenant_id: &str) -> Result<Tenant, AppError> {
        let tenant = self.get(tenant_id).await?;
        if !tenant.is_active {
            return Err(AppError::BadRequest("Tenant is inactive".to_string()));
        }
        Ok(tenant)
    }

    /// Physically remove a tenant record. Rollback of a failed onboarding only.
    pub async fn remove(&self, tenant_id: &str) -> Result<(), AppError> {
        self.crud.store().remove(tenant_id, TENANT_PARTITION).await?;
        Ok(())
    }
}
