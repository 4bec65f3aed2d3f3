use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{new_id, Entity, Managed, Patch};

/// Customer account, keyed by `(account_id, tenant_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub account_id: String,
    pub tenant_id: String,
    pub name: String,
    pub manager_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(tenant_id: String, create: AccountCreate) -> Self {
        let now = Utc::now();
        Self {
            account_id: new_id(),
            tenant_id,
            name: create.name,
            manager_id: create.manager_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Account {
    const COLLECTION: &'static str = "accounts";
    const LABEL: &'static str = "Account";

    fn id(&self) -> &str {
        &self.account_id
    }

    fn partition_key(&self) -> &str {
        &self.tenant_id
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

impl Managed for Account {
    fn manager_id(&self) -> &str {
        &self.manager_id
    }

    fn set_manager(&mut self, manager_id: String) {
        self.manager_id = manager_id;
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AccountCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub manager_id: String,
    /// Accepted for compatibility and ignored: the caller's tenant is always used.
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct AccountUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub manager_id: Option<String>,
    pub is_active: Option<bool>,
}

impl Patch<Account> for AccountUpdate {
    fn apply(self, target: &mut Account) {
        if let Some(name) = self.name {
            target.name = name;
        }
        if let Some(manager_id) = self.manager_id {
            target.manager_id = manager_id;
        }
        if let Some(is_active) = self.is_active {
            target.is_active = is_active;
        }
    }
}
