//! File-backed sessions across manager instances, as across page reloads.

use hr_session::testing::{MockAuthProvider, employee};
use hr_session::{FileSessionStore, SessionConfig, SessionManager, SessionPhase, SessionStore};
use tempfile::TempDir;

fn manager_at(dir: &TempDir) -> SessionManager<FileSessionStore, MockAuthProvider> {
    let store = FileSessionStore::new(dir.path().join("session.json"));
    SessionManager::new(store, MockAuthProvider::new(), SessionConfig::default())
}

#[tokio::test]
async fn test_login_then_reload_restores_session() {
    let dir = TempDir::new().unwrap();

    let first = manager_at(&dir);
    first.initialize().await;
    first.login("jane@x.com", "pw").await.unwrap();

    let second = manager_at(&dir);
    let outcome = second.initialize().await;
    assert_eq!(outcome.state.phase(), SessionPhase::Authenticated);
    let user = outcome.state.user().unwrap();
    assert_eq!(user.email(), Some("jane@x.com"));
    assert_eq!(user.id().as_deref(), Some("emp-1"));
}

#[tokio::test]
async fn test_logout_then_reload_is_signed_out() {
    let dir = TempDir::new().unwrap();

    let first = manager_at(&dir);
    first.login("jane@x.com", "pw").await.unwrap();
    first.logout().await;

    let store = FileSessionStore::new(dir.path().join("session.json"));
    assert_eq!(store.get("token").await.unwrap(), None);
    assert_eq!(store.get("role").await.unwrap().as_deref(), Some("employee"));

    let second = manager_at(&dir);
    assert!(!second.initialize().await.state.is_authenticated());
}

#[tokio::test]
async fn test_corrupted_file_starts_signed_out() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("session.json"), "{{ not json").unwrap();

    let manager = manager_at(&dir);
    let outcome = manager.initialize().await;
    assert_eq!(outcome.state.phase(), SessionPhase::Unauthenticated);

    // The next login rewrites the file
    manager.login("jane@x.com", "pw").await.unwrap();
    let reloaded = manager_at(&dir);
    assert!(reloaded.initialize().await.state.is_authenticated());
}

#[tokio::test]
async fn test_set_user_is_visible_after_reload() {
    let dir = TempDir::new().unwrap();

    let first = manager_at(&dir);
    first.login("jane@x.com", "pw").await.unwrap();
    first
        .set_user(employee("emp-1").with_organization_id("org-5"))
        .await
        .unwrap();

    let second = manager_at(&dir);
    let outcome = second.initialize().await;
    assert_eq!(outcome.state.organization_id(), Some("org-5"));
}
