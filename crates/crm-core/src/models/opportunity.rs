use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use validator::Validate;

use super::{new_id, Entity, Managed, Patch};

/// Sales stage. Declaration order is pipeline order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum OpportunityStage {
    Prospecting,
    Qualification,
    Committed,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
    #[serde(rename = "Closed Won")]
    ClosedWon,
}

impl OpportunityStage {
    pub const ALL: [OpportunityStage; 5] = [
        OpportunityStage::Prospecting,
        OpportunityStage::Qualification,
        OpportunityStage::Committed,
        OpportunityStage::ClosedLost,
        OpportunityStage::ClosedWon,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OpportunityStage::Prospecting => "Prospecting",
            OpportunityStage::Qualification => "Qualification",
            OpportunityStage::Committed => "Committed",
            OpportunityStage::ClosedLost => "Closed Lost",
            OpportunityStage::ClosedWon => "Closed Won",
        }
    }
}

impl Display for OpportunityStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.label())
    }
}

/// Sales opportunity, keyed by `(opportunity_id, tenant_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Opportunity {
    pub opportunity_id: String,
    pub tenant_id: String,
    pub account_id: String,
    pub name: String,
    pub stage: OpportunityStage,
    pub expected_revenue: f64,
    pub manager_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn new(tenant_id: String, create: OpportunityCreate) -> Self {
        let now = Utc::now();
        Self {
            opportunity_id: new_id(),
            tenant_id,
            account_id: create.account_id,
            name: create.name,
            stage: create.stage,
            expected_revenue: create.expected_revenue,
            manager_id: create.manager_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Opportunity {
    const COLLECTION: &'static str = "opportunities";
    const LABEL: &'static str = "Opportunity";

    fn id(&self) -> &str {
        &self.opportunity_id
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

impl Managed for Opportunity {
    fn manager_id(&self) -> &str {
        &self.manager_id
    }

    fn set_manager(&mut self, manager_id: String) {
        self.manager_id = manager_id;
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct OpportunityCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub account_id: String,
    pub stage: OpportunityStage,
    #[validate(range(min = 0.0))]
    pub expected_revenue: f64,
    #[validate(length(min = 1))]
    pub manager_id: String,
    /// Accepted for compatibility and ignored: the caller's tenant is always used.
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct OpportunityUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub stage: Option<OpportunityStage>,
    #[validate(range(min = 0.0))]
    pub expected_revenue: Option<f64>,
    #[validate(length(min = 1))]
    pub manager_id: Option<String>,
    pub is_active: Option<bool>,
}

impl Patch<Opportunity> for OpportunityUpdate {
    fn apply(self, target: &mut Opportunity) {
        if let Some(name) = self.name {
            target.name = name;
        }
        if let Some(stage) = self.stage {
            target.stage = stage;
        }
        if let Some(expected_revenue) = self.expected_revenue {
            target.expected_revenue = expected_revenue;
        }
        if let Some(manager_id) = self.manager_id {
            target.manager_id = manager_id;
        }
        if let Some(is_active) = self.is_active {
            target.is_active = is_active;
        }
    }
}
