use axum_test::TestServer;
use serde_json::json;

use super::api_path;

pub const TEST_PASSWORD: &str = "TestPassword123!";

/// An onboarded tenant admin, or a user provisioned into that tenant.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub email: String,
    pub tenant_id: String,
    pub user_id: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Exchange credentials for an access token through the login form.
pub async fn login_user(client: &TestServer, email: &str, password: &str) -> String {
    let response = client
        .post(&api_path("/auth/login"))
        .form(&[("username", email), ("password", password)])
        .await;
    assert_eq!(response.status_code(), 200, "login failed for {}", email);
    let body: serde_json::Value = response.json();
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().expect("access_token").to_string()
}

/// Onboard a tenant named `org_name` with `email` as its admin, then log in.
pub async fn onboard_tenant(client: &TestServer, org_name: &str, email: &str) -> TestUser {
    let response = client
        .post(&api_path("/onboarding/onboard"))
        .json(&json!({
            "tenant": { "name": org_name },
            "admin": {
                "email": email,
                "password": TEST_PASSWORD,
                "given_name": "Ada",
                "family_name": "Admin",
                "role": "user"
            }
        }))
        .await;
    assert_eq!(response.status_code(), 201, "onboarding {} failed", org_name);
    let body: serde_json::Value = response.json();

    TestUser {
        email: email.to_string(),
        tenant_id: body["tenant"]["tenant_id"].as_str().unwrap().to_string(),
        user_id: body["admin"]["user_id"].as_str().unwrap().to_string(),
        token: login_user(client, email, TEST_PASSWORD).await,
    }
}

/// Provision a plain user into `admin`'s tenant, then log in.
pub async fn create_member(client: &TestServer, admin: &TestUser, email: &str) -> TestUser {
    let response = client
        .post(&api_path("/users"))
        .add_header("Authorization", admin.bearer())
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "given_name": "Sam",
            "family_name": "Seller",
            "role": "user"
        }))
        .await;
    assert_eq!(response.status_code(), 201, "provisioning {} failed", email);
    let body: serde_json::Value = response.json();

    TestUser {
        email: email.to_string(),
        tenant_id: admin.tenant_id.clone(),
        user_id: body["user_id"].as_str().unwrap().to_string(),
        token: login_user(client, email, TEST_PASSWORD).await,
    }
}
