//! Shared fixtures for the service tests.

use std::ops::Deref;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use crm_core::models::{
    Account, AccountCreate, OnboardingRequest, Opportunity, OpportunityCreate, OpportunityStage,
    Tenant, TenantCreate, User, UserCreate, UserRole,
};
use crm_core::AppError;
use crm_db::{InMemoryBackend, KeyValueBackend, TenantScopedStore};

use crate::identity::{IdentityBackend, LocalIdentityProvider, LocalIdentitySettings, ResetCodeSink};
use crate::{
    AccountService, AnalyticsService, AuthContextResolver, AuthService, OnboardingService,
    OpportunityService, TenantService, UserService,
};

pub const PASSWORD: &str = "correct-horse";

/// Records delivered reset codes instead of sending them.
#[derive(Default)]
pub struct CapturingSink(Mutex<Vec<(String, String)>>);

impl CapturingSink {
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait::async_trait]
impl ResetCodeSink for CapturingSink {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.0
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Every service wired over one backend, the way the API wires them.
#[derive(Clone)]
pub struct TestServices {
    pub backend: Arc<dyn KeyValueBackend>,
    pub identity: Arc<dyn IdentityBackend>,
    pub sink: Arc<CapturingSink>,
    pub tenants: TenantService,
    pub users: UserService,
    pub accounts: AccountService,
    pub opportunities: OpportunityService,
    pub analytics: AnalyticsService,
    pub onboarding: OnboardingService,
    pub auth: AuthService,
    pub resolver: AuthContextResolver,
}

impl TestServices {
    /// Services backed by a local identity provider on the same backend.
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        let sink = Arc::new(CapturingSink::default());
        let identity = Arc::new(LocalIdentityProvider::new(
            backend.clone(),
            LocalIdentitySettings {
                signing_secret: "service-tests-signing-secret-0123456789".to_string(),
                token_ttl: Duration::minutes(30),
                issuer: None,
                audience: None,
            },
            sink.clone(),
        ));
        Self::build(backend, identity, sink)
    }

    pub fn with_identity(
        backend: Arc<dyn KeyValueBackend>,
        identity: Arc<dyn IdentityBackend>,
    ) -> Self {
        Self::build(backend, identity, Arc::new(CapturingSink::default()))
    }

    fn build(
        backend: Arc<dyn KeyValueBackend>,
        identity: Arc<dyn IdentityBackend>,
        sink: Arc<CapturingSink>,
    ) -> Self {
        let tenants = TenantService::new(TenantScopedStore::new(backend.clone()));
        let users = UserService::new(TenantScopedStore::new(backend.clone()), identity.clone());
        let accounts = AccountService::new(TenantScopedStore::new(backend.clone()), users.clone());
        let opportunities = OpportunityService::new(
            TenantScopedStore::new(backend.clone()),
            accounts.clone(),
            users.clone(),
        );
        let analytics = AnalyticsService::new(accounts.clone(), opportunities.clone());
        let onboarding = OnboardingService::new(tenants.clone(), users.clone(), identity.clone());
        let auth = AuthService::new(identity.clone(), onboarding.clone());
        let resolver = AuthContextResolver::new(users.store().clone(), identity.clone());

        Self {
            backend,
            identity,
            sink,
            tenants,
            users,
            accounts,
            opportunities,
            analytics,
            onboarding,
            auth,
            resolver,
        }
    }
}

/// One onboarded tenant with its admin.
pub struct Fixture {
    pub services: TestServices,
    pub tenant: Tenant,
    pub admin: User,
}

impl Deref for Fixture {
    type Target = TestServices;

    fn deref(&self) -> &TestServices {
        &self.services
    }
}

impl Fixture {
    /// Tenant "Acme" administered by `admin@acme.test`.
    pub async fn new() -> Self {
        let services = TestServices::new(Arc::new(InMemoryBackend::new()));
        Self::onboard_with(services, "Acme", "admin@acme.test").await
    }

    /// Another tenant on the same backend and identity provider.
    pub async fn onboard(&self, name: &str, admin_email: &str) -> Fixture {
        Self::onboard_with(self.services.clone(), name, admin_email).await
    }

    async fn onboard_with(services: TestServices, name: &str, admin_email: &str) -> Fixture {
        let response = services
            .onboarding
            .onboard(OnboardingRequest {
                tenant: TenantCreate {
                    name: name.to_string(),
                },
                admin: new_user(admin_email),
            })
            .await
            .unwrap();
        Fixture {
            services,
            tenant: response.tenant,
            admin: response.admin,
        }
    }

    /// A role-`user` member of this tenant.
    pub async fn member(&self, email: &str) -> User {
        self.onboarding
            .provision_user(&self.tenant.tenant_id, new_user(email), UserRole::User)
            .await
            .unwrap()
    }

    /// An account managed by the admin.
    pub async fn account(&self, name: &str) -> Account {
        self.accounts
            .create(
                &self.tenant.tenant_id,
                AccountCreate {
                    name: name.to_string(),
                    manager_id: self.admin.user_id.clone(),
                    tenant_id: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn opportunity(
        &self,
        account: &Account,
        stage: OpportunityStage,
        expected_revenue: f64,
    ) -> Opportunity {
        self.opportunities
            .create(
                &self.tenant.tenant_id,
                OpportunityCreate {
                    name: format!("{} deal", account.name),
                    account_id: account.account_id.clone(),
                    stage,
                    expected_revenue,
                    manager_id: self.admin.user_id.clone(),
                    tenant_id: None,
                },
            )
            .await
            .unwrap()
    }
}

pub fn new_user(email: &str) -> UserCreate {
    UserCreate {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        given_name: "Ada".to_string(),
        family_name: "Lovelace".to_string(),
        role: UserRole::User,
    }
}
