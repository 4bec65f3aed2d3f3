mod helpers;

use helpers::api_path;
use helpers::auth::{create_member, onboard_tenant};
use helpers::fixtures::{create_account, create_opportunity};
use helpers::setup_test_app;
use serde_json::json;

#[tokio::test]
async fn test_admin_only_endpoints_reject_members() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = onboard_tenant(client, "Acme", "admin@acme.test").await;
    let member = create_member(client, &admin, "rep@acme.test").await;

    let response = client
        .post(&api_path("/users"))
        .add_header("Authorization", member.bearer())
        .json(&json!({
            "email": "sneaky@acme.test",
            "password": "Password123!",
            "given_name": "Sneaky",
            "family_name": "Pete",
            "role": "admin"
        }))
        .await;
    assert_eq!(response.status_code(), 403);

    for path in ["/users", "/tenants"] {
        let response = client
            .get(&api_path(path))
            .add_header("Authorization", member.bearer())
            .await;
        assert_eq!(response.status_code(), 403, "GET {}", path);
    }

    // Self-service stays open
    let response = client
        .get(&api_path("/users/me"))
        .add_header("Authorization", member.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_self_update_cannot_change_role() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = onboard_tenant(client, "Acme", "admin@acme.test").await;
    let member = create_member(client, &admin, "rep@acme.test").await;

    let response = client
        .put(&api_path("/users/me"))
        .add_header("Authorization", member.bearer())
        .json(&json!({ "given_name": "Samantha", "role": "admin" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["given_name"], "Samantha");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn test_account_lifecycle() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = onboard_tenant(client, "Acme", "admin@acme.test").await;
    let member = create_member(client, &admin, "rep@acme.test").await;

    let account = create_account(client, &admin, "Acme Corp").await;
    let account_id = account["account_id"].as_str().unwrap();
    let path = api_path(&format!("/accounts/{}", account_id));

    // Partial update leaves other fields alone
    let response = client
        .put(&path)
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "name": "Acme Corporation" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Acme Corporation");
    assert_eq!(body["manager_id"], admin.user_id.as_str());

    let response = client
        .put(&format!("{}/change-manager", path))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "manager_id": member.user_id }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["manager_id"], member.user_id.as_str());

    let response = client
        .get(&api_path("/users/me"))
        .add_header("Authorization", member.bearer())
        .await;
    let me: serde_json::Value = response.json();
    assert!(me["managed_account_ids"]
        .as_array()
        .unwrap()
        .iter()
        .any(|id| id == account_id));

    // Unknown manager
    let response = client
        .put(&format!("{}/change-manager", path))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "manager_id": "nobody" }))
        .await;
    assert_eq!(response.status_code(), 400);

    // Soft delete is idempotent and keeps the record readable
    for _ in 0..2 {
        let response = client
            .delete(&path)
            .add_header("Authorization", admin.bearer())
            .await;
        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Account successfully deleted");
    }

    let response = client
        .get(&path)
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_active"], false);

    let response = client
        .get(&api_path("/accounts"))
        .add_header("Authorization", admin.bearer())
        .await;
    let accounts: Vec<serde_json::Value> = response.json();
    assert!(accounts.is_empty());
}

#[tokio::test]
async fn test_opportunity_filters_and_total() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = onboard_tenant(client, "Acme", "admin@acme.test").await;

    let first = create_account(client, &admin, "First").await;
    let second = create_account(client, &admin, "Second").await;
    let first_id = first["account_id"].as_str().unwrap();
    let second_id = second["account_id"].as_str().unwrap();

    create_opportunity(client, &admin, first_id, "Prospecting", 500.0).await;
    create_opportunity(client, &admin, first_id, "Qualification", 300.0).await;
    create_opportunity(client, &admin, second_id, "Closed Won", 50.0).await;

    let response = client
        .get(&api_path("/opportunities"))
        .add_query_param("account_id", first_id)
        .add_header("Authorization", admin.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let opportunities: Vec<serde_json::Value> = response.json();
    assert_eq!(opportunities.len(), 2);

    let response = client
        .get(&api_path("/opportunities/total-expected-revenue"))
        .add_header("Authorization", admin.bearer())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_expected_revenue"], 850.0);

    let response = client
        .get(&api_path("/opportunities/total-expected-revenue"))
        .add_query_param("account_id", first_id)
        .add_header("Authorization", admin.bearer())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_expected_revenue"], 800.0);
    assert_eq!(body["account_id"], first_id);
}

#[tokio::test]
async fn test_invalid_bodies_are_bad_requests() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = onboard_tenant(client, "Acme", "admin@acme.test").await;

    let response = client
        .post(&api_path("/accounts"))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "name": "" , "manager_id": admin.user_id }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = client
        .post(&api_path("/opportunities"))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "name": "Deal", "stage": "Negotiation" }))
        .await;
    assert_eq!(response.status_code(), 400);
}
