//! Tenant onboarding and user provisioning.
//!
//! Both span the identity backend and the record store without a shared
//! transaction, so they run as sagas: every completed step registers a
//! compensation that undoes it if a later step fails. Adding the new user to
//! the tenant's identity group is lenient and never aborts the operation.

use std::sync::Arc;

use crm_core::models::{
    OnboardingRequest, OnboardingResponse, Tenant, User, UserCreate, UserRole,
};
use crm_core::AppError;

use crate::identity::{IdentityBackend, SignUp};
use crate::{Saga, TenantService, UserService};

#[derive(Clone)]
pub struct OnboardingService {
    tenants: TenantService,
    users: UserService,
    identity: Arc<dyn IdentityBackend>,
}

impl OnboardingService {
    pub fn new(
        tenants: TenantService,
        users: UserService,
        identity: Arc<dyn IdentityBackend>,
    ) -> Self {
        Self {
            tenants,
            users,
            identity,
        }
    }

    /// Create a tenant, its identity group and its first administrator.
    #[tracing::instrument(skip(self, request), fields(tenant.name = %request.tenant.name))]
    pub async fn onboard(&self, request: OnboardingRequest) -> Result<OnboardingResponse, AppError> {
        let mut saga = Saga::new("tenant_onboarding");

        let tenants = self.tenants.clone();
        let tenant = saga
            .step(
                "create_tenant",
                self.tenants.create(request.tenant),
                move |tenant: &Tenant| {
                    let tenant_id = tenant.tenant_id.clone();
                    async move { tenants.remove(&tenant_id).await }
                },
            )
            .await?;

        let identity = self.identity.clone();
        let group = tenant.tenant_id.clone();
        let description = format!("Group for tenant {}", tenant.name);
        saga.step(
            "create_identity_group",
            self.identity.create_group(&tenant.tenant_id, &description),
            move |_: &()| async move { identity.delete_group(&group).await },
        )
        .await?;

        let admin = self
            .register(&mut saga, &tenant.tenant_id, request.admin, UserRole::Admin)
            .await?;

        saga.complete();
        tracing::info!(
            tenant_id = %tenant.tenant_id,
            admin_id = %admin.user_id,
            "Tenant onboarded"
        );
        Ok(OnboardingResponse { tenant, admin })
    }

    /// Add a user to an existing, active tenant with the given role.
    #[tracing::instrument(skip(self, request))]
    pub async fn provision_user(
        &self,
        tenant_id: &str,
        request: UserCreate,
        role: UserRole,
    ) -> Result<User, AppError> {
        self.tenants.require_active(tenant_id).await?;

        let mut saga = Saga::new("user_provisioning");
        let user = self.register(&mut saga, tenant_id, request, role).await?;
        saga.complete();
        Ok(user)
    }

    /// Identity, then user record, then (leniently) group membership.
    async fn register(
        &self,
        saga: &mut Saga,
        tenant_id: &str,
        request: UserCreate,
        role: UserRole,
    ) -> Result<User, AppError> {
        let identity = self.identity.clone();
        let user_id = saga
            .step(
                "register_identity",
                self.identity.sign_up(SignUp {
                    email: request.email.clone(),
                    password: request.password.clone(),
                    given_name: request.given_name.clone(),
                    family_name: request.family_name.clone(),
                    tenant_id: tenant_id.to_string(),
                    role,
                }),
                move |user_id: &String| {
                    let user_id = user_id.clone();
                    async move { identity.delete_user(&user_id).await }
                },
            )
            .await?;

        let users = self.users.clone();
        let user = saga
            .step(
                "create_user_record",
                self.users.insert(User::new(
                    user_id,
                    tenant_id.to_string(),
                    &request,
                    role,
                )),
                move |user: &User| {
                    let (user_id, tenant_id) = (user.user_id.clone(), user.tenant_id.clone());
                    async move { users.remove(&user_id, &tenant_id).await }
                },
            )
            .await?;

        saga.lenient_step(
            "add_user_to_group",
            self.identity.add_user_to_group(&user.user_id, tenant_id),
        )
        .await;

        Ok(user)
    }
}
