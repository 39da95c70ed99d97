//! HTTP-level tests over the in-memory backend

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use rbac::{
    aggregator::ExpiryPolicy,
    jwt::{DEFAULT_TOKEN_EXPIRY_HOURS, JwtConfig, JwtService},
    memory::MemoryStore,
    routes::create_router,
    state::AppState,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "Str0ng!pass";

fn jwt_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "integration-secret".to_string(),
        token_expiry_hours: DEFAULT_TOKEN_EXPIRY_HOURS,
    })
}

fn app() -> Router {
    let store = MemoryStore::new();
    create_router(AppState::in_memory(
        &store,
        jwt_service(),
        ExpiryPolicy::Ignore,
    ))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let (status, value) = send(app, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {value}");
    value
}

async fn create_user(app: &Router, name: &str) -> i64 {
    let user = create(
        app,
        "/users",
        json!({
            "name": name,
            "email": format!("{name}@example.com"),
            "mobile": "9876543210",
            "password": PASSWORD,
        }),
    )
    .await;
    user["id"].as_i64().unwrap()
}

async fn create_named(app: &Router, uri: &str, name: &str) -> i64 {
    create(app, uri, json!({ "name": name })).await["id"]
        .as_i64()
        .unwrap()
}

async fn grant(app: &Router, role_id: i64, access_id: i64) {
    create(
        app,
        "/role-accesses",
        json!({ "role_id": role_id, "access_id": access_id }),
    )
    .await;
}

async fn assign(app: &Router, user_id: i64, role_id: i64) {
    create(
        app,
        "/user-roles",
        json!({ "user_id": user_id, "role_id": role_id }),
    )
    .await;
}

/// alice holds Admin {read, write, delete} and Viewer {read, export}
async fn seed_alice(app: &Router) -> i64 {
    let alice = create_user(app, "alice").await;
    let read = create_named(app, "/accesses", "read").await;
    let write = create_named(app, "/accesses", "write").await;
    let delete = create_named(app, "/accesses", "delete").await;
    let export = create_named(app, "/accesses", "export").await;
    let admin = create_named(app, "/roles", "Admin").await;
    let viewer = create_named(app, "/roles", "Viewer").await;
    for access in [read, write, delete] {
        grant(app, admin, access).await;
    }
    for access in [read, export] {
        grant(app, viewer, access).await;
    }
    assign(app, alice, admin).await;
    assign(app, alice, viewer).await;
    alice
}

fn names(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_effective_access_is_union_over_roles() {
    let app = app();
    let alice = seed_alice(&app).await;

    let (status, body) = send(&app, Method::GET, &format!("/user/access?id={alice}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["delete", "export", "read", "write"]);
}

#[tokio::test]
async fn test_login_issues_token_with_effective_accesses() {
    let app = app();
    let alice = seed_alice(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "alice", "password": PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let claims = jwt_service()
        .validate_token(body["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(i64::from(claims.user_id), alice);
    assert_eq!(claims.username, "alice");
    let mut access = claims.access;
    access.sort();
    assert_eq!(access, vec!["delete", "export", "read", "write"]);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = app();
    create_user(&app, "alice").await;

    let (unknown_status, unknown_body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "mallory", "password": PASSWORD })),
    )
    .await;
    let (wrong_status, wrong_body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "alice", "password": "Wr0ng!pass" })),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
    assert_eq!(unknown_body["error"], "invalid username or password");
}

#[tokio::test]
async fn test_missing_or_malformed_id_is_rejected() {
    let app = app();

    for uri in ["/user", "/user?id=abc", "/role?id=", "/user-role?user_id=1"] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "invalid id in query");
    }
}

#[tokio::test]
async fn test_user_round_trip_hides_password_hash() {
    let app = app();
    let id = create_user(&app, "bob").await;

    let (status, user) = send(&app, Method::GET, &format!("/user?id={id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "bob");
    assert_eq!(user["email"], "bob@example.com");
    assert_eq!(user["mobile"], "9876543210");
    assert!(user.get("password_hash").is_none());
}

#[tokio::test]
async fn test_invalid_user_fields_are_rejected_before_storage() {
    let app = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/users",
        Some(json!({ "name": "carol", "email": "not-an-email", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/users",
        Some(json!({ "name": "carol", "mobile": "123", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, users) = send(&app, Method::GET, "/users", None).await;
    assert!(users.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_role_name_conflicts() {
    let app = app();
    create_named(&app, "/roles", "Admin").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/roles",
        Some(json!({ "name": "Admin" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "role already exists");
}

#[tokio::test]
async fn test_blank_role_name_is_a_validation_error() {
    let (status, body) = send(
        &app(),
        Method::POST,
        "/roles",
        Some(json!({ "name": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation error: role name is required");
}

#[tokio::test]
async fn test_membership_for_missing_user_is_invalid_reference() {
    let app = app();
    let role = create_named(&app, "/roles", "Admin").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/user-roles",
        Some(json!({ "user_id": 42, "role_id": role })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_deleting_role_removes_its_grants() {
    let app = app();
    let role = create_named(&app, "/roles", "Admin").await;
    let access = create_named(&app, "/accesses", "read").await;
    grant(&app, role, access).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/role?id={role}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, grants) = send(&app, Method::GET, "/role-accesses", None).await;
    assert!(grants.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::DELETE, &format!("/role?id={role}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_without_roles_has_no_access() {
    let app = app();
    let id = create_user(&app, "dave").await;

    let (status, body) = send(&app, Method::GET, &format!("/user/access?id={id}"), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no access found for the user");
}

#[tokio::test]
async fn test_roles_and_accesses_by_owner() {
    let app = app();
    let alice = seed_alice(&app).await;

    let (status, roles) = send(&app, Method::GET, &format!("/user/roles?id={alice}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&roles), vec!["Admin", "Viewer"]);

    let viewer = roles
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "Viewer")
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    let (status, accesses) = send(
        &app,
        Method::GET,
        &format!("/role/access?id={viewer}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&accesses), vec!["export", "read"]);
}

#[tokio::test]
async fn test_password_change_requires_the_old_password() {
    let app = app();
    let id = create_user(&app, "erin").await;
    let uri = format!("/user/password?id={id}");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "old_password": "Wr0ng!pass", "password": "N3w!password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "old_password": PASSWORD, "password": "N3w!password" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "erin", "password": "N3w!password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_membership_expiry_can_be_updated() {
    let app = app();
    let user = create_user(&app, "frank").await;
    let role = create_named(&app, "/roles", "Admin").await;
    assign(&app, user, role).await;
    let uri = format!("/user-role?user_id={user}&role_id={role}");

    let (status, membership) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "expiry_date": "2030-01-01T00:00:00Z" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(membership["expiry_date"], "2030-01-01T00:00:00Z");
    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched["expiry_date"], "2030-01-01T00:00:00Z");
}
