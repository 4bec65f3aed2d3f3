use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{new_id, Entity, Patch};

/// Partition shared by all tenant records; tenants are keyed by id alone.
pub const TENANT_PARTITION: &str = "__tenants__";

/// Tenant (organization) entity. The isolation boundary for every other record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tenant {
    pub tenant_id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: new_id(),
            name,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Tenant {
    const COLLECTION: &'static str = "tenants";
    const LABEL: &'static str = "Tenant";

    fn id(&self) -> &str {
        &self.tenant_id
    }

    fn partition_key(&self) -> &str {
        TENANT_PARTITION
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TenantCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct TenantUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

impl Patch<Tenant> for TenantUpdate {
    fn apply(self, target: &mut Tenant) {
        if let Some(name) = self.name {
            target.name = name;
        }
        if let Some(is_active) = self.is_active {
            target.is_active = is_active;
        }
    }
}
