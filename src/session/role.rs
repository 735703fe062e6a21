//! Role extraction and the eligibility policy.

use crate::config::PolicyConfig;
use crate::providers::LoginResponse;
use serde_json::Value;

/// Finds the role in a login response.
///
/// Checked in order: top-level `role`, `user.role`, then the first entry of
/// `user.roles` (a string or an object with `name`). The first non-empty
/// string wins.
pub fn extract_role(response: &LoginResponse) -> Option<String> {
    fn non_empty(value: Option<&Value>) -> Option<&str> {
        value.and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    let user = response.user.as_ref();
    let first_listed = || {
        let first = user?.get("roles")?.as_array()?.first()?;
        match first {
            Value::String(_) => non_empty(Some(first)),
            Value::Object(role) => non_empty(role.get("name")),
            _ => None,
        }
    };

    non_empty(response.role.as_ref())
        .or_else(|| non_empty(user.and_then(|u| u.get("role"))))
        .or_else(first_listed)
        .map(str::to_string)
}

/// Roles allowed to hold a session. Comparison lower-cases the candidate
/// and requires an exact match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePolicy {
    allowed: Vec<String>,
}

impl RolePolicy {
    pub fn new<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        Self {
            allowed: roles
                .into_iter()
                .map(|r| r.as_ref().to_lowercase())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    pub fn employee_only() -> Self {
        Self::new(["employee"])
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(&config.allowed_roles)
    }

    pub fn is_eligible(&self, role: &str) -> bool {
        let role = role.to_lowercase();
        self.allowed.iter().any(|allowed| *allowed == role)
    }

    /// `None` (no role at all) is never eligible.
    pub fn admits(&self, role: Option<&str>) -> bool {
        role.is_some_and(|r| self.is_eligible(r))
    }

    pub fn allowed_roles(&self) -> &[String] {
        &self.allowed
    }
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::employee_only()
    }
}
