//! In-memory authentication state derived from the session store.

use crate::user::UserRecord;
use serde::Serialize;

/// Lifecycle of the session as seen by views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionPhase {
    /// Startup, before the persisted session has been read
    Uninitialized,
    /// Restoring from storage or a login call is in flight
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session. `is_authenticated()` is always `user().is_some()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    phase: SessionPhase,
    user: Option<UserRecord>,
    organization_id: Option<String>,
}

impl SessionState {
    /// State before initialization; counts as loading so guards wait.
    pub fn initial() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            user: None,
            organization_id: None,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            user: None,
            organization_id: None,
        }
    }

    pub fn signed_in(user: UserRecord) -> Self {
        Self {
            phase: SessionPhase::Authenticated,
            organization_id: user.organization_id(),
            user: Some(user),
        }
    }

    /// Same user, now loading.
    pub(crate) fn begin_loading(&self) -> Self {
        Self {
            phase: SessionPhase::Loading,
            ..self.clone()
        }
    }

    /// Leave the loading phase with whatever user the state already holds.
    pub(crate) fn settled(&self) -> Self {
        match &self.user {
            Some(user) => Self::signed_in(user.clone()),
            None => Self::signed_out(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn loading(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Uninitialized | SessionPhase::Loading
        )
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.user.as_ref().and_then(UserRecord::role)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Notifications published by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Transition {
        from: SessionPhase,
        to: SessionPhase,
    },
    /// The stored profile was replaced through `set_user`
    UserUpdated { user_id: Option<String> },
}
