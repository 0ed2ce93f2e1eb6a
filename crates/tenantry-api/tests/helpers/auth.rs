use super::api_path;
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

pub const ROOT_EMAIL: &str = "root@tenantry.test";
pub const ROOT_PASSWORD: &str = "root-password";
pub const TEST_PASSWORD: &str = "TestPassword123!";

/// A tenant registered through the API, with its admin logged in.
pub struct TestTenant {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub admin_token: String,
}

/// A tenant user logged in through the API.
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn uuid_field(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("expected a UUID string")
}

/// Log in and return the bearer token; panics on failure.
pub async fn login(client: &TestServer, email: &str, password: &str) -> String {
    let response = client
        .post(&api_path("/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 200, "login failed for {}", email);
    let data: Value = response.json();
    data["token"].as_str().expect("token in login response").to_string()
}

/// Register a tenant as the super admin. Admin email is `admin@{subdomain}.test`.
pub async fn create_test_tenant(
    client: &TestServer,
    root_token: &str,
    subdomain: &str,
    max_users: Option<i64>,
    max_projects: Option<i64>,
) -> TestTenant {
    let admin_email = format!("admin@{}.test", subdomain);
    let response = client
        .post(&api_path("/tenants"))
        .add_header("Authorization", bearer(root_token))
        .json(&json!({
            "name": subdomain,
            "subdomain": subdomain,
            "subscription_tier": "free",
            "max_users": max_users,
            "max_projects": max_projects,
            "admin_email": admin_email,
            "admin_password": TEST_PASSWORD,
        }))
        .await;
    assert_eq!(response.status_code(), 201, "tenant creation failed");
    let data: Value = response.json();

    TestTenant {
        id: uuid_field(&data["tenant"]["id"]),
        admin_id: uuid_field(&data["admin"]["id"]),
        admin_token: login(client, &admin_email, TEST_PASSWORD).await,
    }
}

/// Create a user in `tenant_id` and log them in.
pub async fn create_test_user(
    client: &TestServer,
    admin_token: &str,
    tenant_id: Uuid,
    email: &str,
    role: &str,
) -> TestUser {
    let response = client
        .post(&api_path(&format!("/tenants/{}/users", tenant_id)))
        .add_header("Authorization", bearer(admin_token))
        .json(&json!({ "email": email, "password": TEST_PASSWORD, "role": role }))
        .await;
    assert_eq!(response.status_code(), 201, "user creation failed for {}", email);
    let data: Value = response.json();

    TestUser {
        id: uuid_field(&data["id"]),
        email: email.to_string(),
        token: login(client, email, TEST_PASSWORD).await,
    }
}

/// Create a project and return its id; panics unless the API answers 201.
pub async fn create_test_project(
    client: &TestServer,
    token: &str,
    tenant_id: Uuid,
    name: &str,
    assignee_ids: &[Uuid],
) -> Uuid {
    let response = client
        .post(&api_path(&format!("/tenants/{}/projects", tenant_id)))
        .add_header("Authorization", bearer(token))
        .json(&json!({ "name": name, "assignee_ids": assignee_ids }))
        .await;
    assert_eq!(response.status_code(), 201, "project creation failed");
    let data: Value = response.json();
    uuid_field(&data["id"])
}
