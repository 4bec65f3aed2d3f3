use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use validator::Validate;

use super::{Entity, Patch};

/// User role for authorization
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    /// Parse a role claim. Anything other than `admin` is an ordinary user.
    pub fn from_claim(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// User entity, keyed by `(user_id, tenant_id)`.
///
/// `user_id` is the subject issued by the identity backend, so a token's `sub`
/// resolves directly to this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub user_id: String,
    pub tenant_id: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[schema(value_type = Vec<String>)]
    pub managed_account_ids: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Record for a freshly registered identity
    pub fn new(user_id: String, tenant_id: String, create: &UserCreate, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            tenant_id,
            email: create.email.trim().to_lowercase(),
            given_name: create.given_name.clone(),
            family_name: create.family_name.clone(),
            role,
            is_active: true,
            managed_account_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true when the set changed.
    pub fn add_managed_account(&mut self, account_id: &str) -> bool {
        self.managed_account_ids.insert(account_id.to_string())
    }

    /// Returns true when the set changed.
    pub fn remove_managed_account(&mut self, account_id: &str) -> bool {
        self.managed_account_ids.remove(account_id)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "User";

    fn id(&self) -> &str {
        &self.user_id
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

/// New user with credentials. The tenant always comes from the caller's context.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UserCreate {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub given_name: String,
    #[validate(length(min = 1, max = 100))]
    pub family_name: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Administrative update. Email is the login name and cannot change here.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 100))]
    pub given_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub family_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl Patch<User> for UserUpdate {
    fn apply(self, target: &mut User) {
        if let Some(given_name) = self.given_name {
            target.given_name = given_name;
        }
        if let Some(family_name) = self.family_name {
            target.family_name = family_name;
        }
        if let Some(role) = self.role {
            target.role = role;
        }
        if let Some(is_active) = self.is_active {
            target.is_active = is_active;
        }
    }
}

/// Self-service update for `/users/me`; role and activity are not reachable.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UserSelfUpdate {
    #[validate(length(min = 1, max = 100))]
    pub given_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub family_name: Option<String>,
}

impl From<UserSelfUpdate> for UserUpdate {
    fn from(update: UserSelfUpdate) -> Self {
        UserUpdate {
            given_name: update.given_name,
            family_name: update.family_name,
            role: None,
            is_active: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            user_id: "u-1".to_string(),
            tenant_id: "t-1".to_string(),
            email: "ada@example.com".to_string(),
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            role: UserRole::User,
            is_active: true,
            managed_account_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_from_claim() {
        assert_eq!(UserRole::from_claim("admin"), UserRole::Admin);
        assert_eq!(UserRole::from_claim("ADMIN"), UserRole::Admin);
        assert_eq!(UserRole::from_claim("user"), UserRole::User);
        assert_eq!(UserRole::from_claim("superuser"), UserRole::User);
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[test]
    fn test_managed_accounts_behave_as_set() {
        let mut user = sample_user();
        assert!(user.add_managed_account("a-1"));
        assert!(!user.add_managed_account("a-1"));
        assert_eq!(user.managed_account_ids.len(), 1);
        assert!(user.remove_managed_account("a-1"));
        assert!(!user.remove_managed_account("a-1"));
    }

    #[test]
    fn test_self_update_cannot_escalate() {
        let mut user = sample_user();
        let update: UserUpdate = UserSelfUpdate {
            given_name: Some("Augusta".to_string()),
            family_name: None,
        }
        .into();
        update.apply(&mut user);
        assert_eq!(user.given_name, "Augusta");
        assert_eq!(user.family_name, "Lovelace");
        assert_eq!(user.role, UserRole::User);
    }

    #[test]
    fn test_role_defaults_to_user_on_create() {
        let create: UserCreate = serde_json::from_value(serde_json::json!({
            "email": "bob@example.com",
            "password": "correct horse",
            "given_name": "Bob",
            "family_name": "Builder"
        }))
        .unwrap();
        assert_eq!(create.role, UserRole::User);
    }
}
