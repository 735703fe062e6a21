//! Testing utilities for hr-session.
//!
//! Mock collaborators and fixtures for exercising the session manager and
//! router without a running authentication service.

use crate::errors::{StorageError, UpstreamError};
use crate::providers::{AuthProvider, EmployeeDirectory, LoginResponse};
use crate::storage::{InMemoryStore, SessionStore, StorageResult};
use crate::user::UserRecord;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Token the default mock response carries.
pub const MOCK_TOKEN: &str = "mock-token";

#[derive(Debug, Clone)]
enum MockOutcome {
    /// Employee response built from the submitted email
    Employee,
    Respond(Value),
    Reject(String),
    Fail { status: u16, message: String },
}

/// Mock authentication service.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    outcome: MockOutcome,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockAuthProvider {
    /// Accepts everyone as an employee with id `emp-1` and [`MOCK_TOKEN`].
    pub fn new() -> Self {
        Self::with_outcome(MockOutcome::Employee)
    }

    /// Returns `body` verbatim for every login.
    pub fn responding(body: Value) -> Self {
        Self::with_outcome(MockOutcome::Respond(body))
    }

    /// Refuses every login with the service's message, like a 401.
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Reject(message.into()))
    }

    /// Fails every login with an unexpected status.
    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Fail {
            status,
            message: message.into(),
        })
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Delay each login (useful for overlapping calls)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_email(&self) -> Option<String> {
        self.calls.lock().last().cloned()
    }
}

impl Default for MockAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn login(&self, email: &str, _password: &str) -> Result<LoginResponse, UpstreamError> {
        self.calls.lock().push(email.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let body = match &self.outcome {
            MockOutcome::Employee => json!({
                "user": {
                    "_id": "emp-1",
                    "email": email,
                    "firstName": "Test",
                    "lastName": "Employee",
                    "role": "employee",
                },
                "token": MOCK_TOKEN,
            }),
            MockOutcome::Respond(body) => body.clone(),
            MockOutcome::Reject(message) => {
                return Err(UpstreamError::Rejected {
                    message: message.clone(),
                });
            }
            MockOutcome::Fail { status, message } => {
                return Err(UpstreamError::Status {
                    status: *status,
                    message: message.clone(),
                });
            }
        };

        serde_json::from_value(body).map_err(|e| UpstreamError::Rejected {
            message: e.to_string(),
        })
    }
}

/// Mock employee directory keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MockEmployeeDirectory {
    employees: Arc<Mutex<HashMap<String, UserRecord>>>,
    tokens: Arc<Mutex<Vec<String>>>,
}

impl MockEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employee(self, user: UserRecord) -> Self {
        if let Some(id) = user.id() {
            self.employees.lock().insert(id, user.clone());
        }
        self
    }

    /// Tokens presented so far.
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl EmployeeDirectory for MockEmployeeDirectory {
    async fn get_by_id(&self, id: &str, token: &str) -> Result<UserRecord, UpstreamError> {
        self.tokens.lock().push(token.to_string());
        self.employees
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| UpstreamError::NotFound { id: id.to_string() })
    }
}

/// Store whose every operation fails, as when the backend is unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

#[async_trait]
impl SessionStore for UnavailableStore {
    async fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::BackendUnavailable)
    }

    async fn set(&self, _entries: &[(&str, &str)]) -> StorageResult<()> {
        Err(StorageError::BackendUnavailable)
    }

    async fn clear(&self, _keys: &[&str]) -> StorageResult<()> {
        Err(StorageError::BackendUnavailable)
    }
}

/// Employee record with `_id` set.
pub fn employee(id: &str) -> UserRecord {
    UserRecord::from_email(format!("{id}@example.com"))
        .with_id(id)
        .with_role("employee")
}

/// Store holding a complete session for `user` under the default keys.
pub fn seeded_store(user: &UserRecord, role: &str) -> InMemoryStore {
    let json = serde_json::to_string(user).unwrap_or_default();
    InMemoryStore::with_entries([
        ("user", json.as_str()),
        ("token", MOCK_TOKEN),
        ("role", role),
    ])
}
