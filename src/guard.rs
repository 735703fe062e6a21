//! Route guard for protected views.
//!
//! The guard makes no network calls and owns no state. It reads a
//! [`SessionState`] snapshot and decides whether the requested view renders,
//! waits, or is replaced by a redirect to the login destination.

use crate::config::SessionConfig;
use crate::session::{RolePolicy, SessionState};
use serde::{Deserialize, Serialize};

/// A navigation the router should perform, with the context the target
/// view needs to explain why it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationIntent {
    pub target_path: String,
    /// Set when the user was bounced off a protected view
    pub access_denied: bool,
    /// Path the user was trying to reach
    pub from_path: Option<String>,
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl NavigationIntent {
    /// Plain push navigation.
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            target_path: path.into(),
            access_denied: false,
            from_path: None,
            replace: false,
        }
    }

    /// Redirect that replaces the current entry.
    pub fn replace(path: impl Into<String>) -> Self {
        Self {
            replace: true,
            ..Self::to(path)
        }
    }

    /// Redirect off a protected view that the user may not see.
    pub fn denied(login_path: impl Into<String>, from_path: impl Into<String>) -> Self {
        Self {
            target_path: login_path.into(),
            access_denied: true,
            from_path: Some(from_path.into()),
            replace: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show a neutral placeholder and do nothing else
    Pending,
    Allow,
    Redirect(NavigationIntent),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    policy: RolePolicy,
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>, policy: RolePolicy) -> Self {
        Self {
            login_path: login_path.into(),
            policy,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.navigation.login_path.clone(),
            RolePolicy::from_config(&config.policy),
        )
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn check(&self, state: &SessionState, current_path: &str) -> GuardDecision {
        if state.loading() {
            tracing::debug!(path = current_path, "Guard waiting for session");
            return GuardDecision::Pending;
        }

        if !state.is_authenticated() || !self.policy.admits(state.role()) {
            tracing::debug!(
                path = current_path,
                authenticated = state.is_authenticated(),
                role = state.role(),
                "Guard redirecting to login"
            );
            return GuardDecision::Redirect(NavigationIntent::denied(
                self.login_path.clone(),
                current_path,
            ));
        }

        GuardDecision::Allow
    }
}
