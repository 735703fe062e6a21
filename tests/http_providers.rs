//! reqwest collaborators against a local axum server.
#![cfg(feature = "http-provider")]

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use hr_session::config::ProviderConfig;
use hr_session::errors::UpstreamError;
use hr_session::storage::InMemoryStore;
use hr_session::{
    AuthError, AuthProvider, EmployeeDirectory, HttpAuthProvider, HttpEmployeeDirectory,
    SessionConfig, SessionManager,
};
use serde_json::{Value, json};

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("jane@x.com"), Some("pw")) => (
            StatusCode::OK,
            Json(json!({
                "user": {"_id": "e1", "email": "jane@x.com", "role": "employee"},
                "token": "jwt-1"
            })),
        ),
        (Some("boss@x.com"), Some("pw")) => (
            StatusCode::OK,
            Json(json!({"user": {"_id": "b1", "roles": ["manager"]}, "token": "jwt-2"})),
        ),
        (Some("down@x.com"), _) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "maintenance window"})),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid email or password"})),
        ),
    }
}

async fn employee(Path(id): Path<String>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer jwt-1");
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Token missing"})),
        );
    }
    if id != "e1" {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"})));
    }
    (
        StatusCode::OK,
        Json(json!({"_id": "e1", "firstName": "Jane", "role": "employee", "organizationId": {"_id": "org-1"}})),
    )
}

async fn spawn_server() -> ProviderConfig {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/employees/{id}", get(employee));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ProviderConfig {
        base_url: format!("http://{addr}/api"),
        ..ProviderConfig::default()
    }
}

#[tokio::test]
async fn test_http_login_success() {
    let config = spawn_server().await;
    let provider = HttpAuthProvider::new(&config).unwrap();

    let response = provider.login("jane@x.com", "pw").await.unwrap();
    assert_eq!(response.token(), Some("jwt-1"));
    assert_eq!(response.user_record().unwrap().unwrap().id().as_deref(), Some("e1"));
}

#[tokio::test]
async fn test_http_login_rejection_keeps_message() {
    let config = spawn_server().await;
    let provider = HttpAuthProvider::new(&config).unwrap();

    let err = provider.login("jane@x.com", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        UpstreamError::Rejected { ref message } if message == "Invalid email or password"
    ));
}

#[tokio::test]
async fn test_http_login_server_error() {
    let config = spawn_server().await;
    let provider = HttpAuthProvider::new(&config).unwrap();

    let err = provider.login("down@x.com", "pw").await.unwrap_err();
    assert!(matches!(
        err,
        UpstreamError::Status { status: 503, ref message } if message == "maintenance window"
    ));
}

#[tokio::test]
async fn test_http_login_unreachable_service() {
    let config = ProviderConfig {
        base_url: "http://127.0.0.1:9/api".to_string(),
        ..ProviderConfig::default()
    };
    let provider = HttpAuthProvider::new(&config).unwrap();
    let err = provider.login("jane@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Http(_)));
}

#[tokio::test]
async fn test_http_employee_lookup() {
    let config = spawn_server().await;
    let directory = HttpEmployeeDirectory::new(&config).unwrap();

    let user = directory.get_by_id("e1", "jwt-1").await.unwrap();
    assert_eq!(user.organization_id().as_deref(), Some("org-1"));

    let err = directory.get_by_id("e2", "jwt-1").await.unwrap_err();
    assert!(matches!(err, UpstreamError::NotFound { ref id } if id == "e2"));

    let err = directory.get_by_id("e1", "stale").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_manager_over_http() {
    let provider_config = spawn_server().await;
    let config = SessionConfig {
        provider: provider_config,
        ..SessionConfig::default()
    };
    let directory = HttpEmployeeDirectory::new(&config.provider).unwrap();
    let provider = HttpAuthProvider::new(&config.provider).unwrap();
    let store = InMemoryStore::new();
    let manager = SessionManager::new(store.clone(), provider, config);
    manager.initialize().await;

    let err = manager.login("boss@x.com", "pw").await.unwrap_err();
    assert!(err.is_access_denied());
    assert!(store.snapshot().is_empty());

    let err = manager.login("jane@x.com", "nope").await.unwrap_err();
    assert!(matches!(err, AuthError::Upstream(_)));
    assert_eq!(err.response().data.message, "Invalid email or password");

    manager.login("jane@x.com", "pw").await.unwrap();
    assert_eq!(store.value("token").as_deref(), Some("jwt-1"));

    let fresh = manager.refresh_profile(&directory).await.unwrap();
    assert_eq!(fresh.display_name().as_deref(), Some("Jane"));
    assert_eq!(manager.organization_id().as_deref(), Some("org-1"));
}
