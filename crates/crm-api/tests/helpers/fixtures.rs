use axum_test::TestServer;
use serde_json::{json, Value};

use super::api_path;
use super::auth::TestUser;

/// Create an account managed by `user` and return its JSON.
pub async fn create_account(client: &TestServer, user: &TestUser, name: &str) -> Value {
    let response = client
        .post(&api_path("/accounts"))
        .add_header("Authorization", user.bearer())
        .json(&json!({ "name": name, "manager_id": user.user_id }))
        .await;
    assert_eq!(response.status_code(), 201, "creating account {} failed", name);
    response.json()
}

pub async fn create_opportunity(
    client: &TestServer,
    user: &TestUser,
    account_id: &str,
    stage: &str,
    expected_revenue: f64,
) -> Value {
    let response = client
        .post(&api_path("/opportunities"))
        .add_header("Authorization", user.bearer())
        .json(&json!({
            "name": format!("{} deal", stage),
            "account_id": account_id,
            "stage": stage,
            "expected_revenue": expected_revenue,
            "manager_id": user.user_id
        }))
        .await;
    assert_eq!(response.status_code(), 201, "creating opportunity failed");
    response.json()
}
