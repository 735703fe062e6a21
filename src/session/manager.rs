//! Session manager: the only writer of session state and persisted session.
//!
//! Restores the session once at startup, runs employee-only login and
//! logout, and keeps the in-memory state and the store in step. It never
//! navigates itself. Operations hand back the [`NavigationIntent`] the
//! router should follow.

use crate::config::SessionConfig;
use crate::errors::{AuthError, Result};
use crate::guard::NavigationIntent;
use crate::providers::{AuthProvider, EmployeeDirectory};
use crate::session::{RolePolicy, SessionEvent, SessionPhase, SessionState, extract_role};
use crate::storage::{PersistedSession, SessionStore, StorageKeys, serialize_user};
use crate::user::UserRecord;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, broadcast, watch};

const EVENT_CAPACITY: usize = 64;

/// Result of [`SessionManager::initialize`].
#[derive(Debug, Clone, PartialEq)]
pub struct InitOutcome {
    pub state: SessionState,
    /// Set when a stored session was rejected and the user must sign in again.
    pub redirect: Option<NavigationIntent>,
}

pub struct SessionManager<S: SessionStore, P: AuthProvider> {
    store: S,
    provider: P,
    config: SessionConfig,
    policy: RolePolicy,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    login_lock: Mutex<()>,
    /// Held while session state and storage are written together
    commit_lock: Mutex<()>,
    /// Bumped by every logout; a login started before it must not commit
    logouts: AtomicU64,
    initialized: AtomicBool,
}

/// What a successful authentication call hands to the commit step.
struct Accepted {
    user: UserRecord,
    token: String,
    role: String,
}

impl<S: SessionStore, P: AuthProvider> SessionManager<S, P> {
    pub fn new(store: S, provider: P, config: SessionConfig) -> Self {
        let policy = RolePolicy::from_config(&config.policy);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            provider,
            config,
            policy,
            state: watch::Sender::new(SessionState::initial()),
            events,
            login_lock: Mutex::new(()),
            commit_lock: Mutex::new(()),
            logouts: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    fn keys(&self) -> &StorageKeys {
        &self.config.storage.keys
    }

    /// Current snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that always holds the latest state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Phase transitions and profile updates from now on.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.state.borrow().user().cloned()
    }

    pub fn organization_id(&self) -> Option<String> {
        self.state.borrow().organization_id().map(str::to_string)
    }

    fn set_state(&self, next: SessionState) {
        let from = self.state.borrow().phase();
        let to = next.phase();
        self.state.send_replace(next);
        if from != to {
            tracing::debug!(?from, ?to, "Session phase changed");
            // No subscribers is fine
            let _ = self.events.send(SessionEvent::Transition { from, to });
        }
    }

    fn begin_loading(&self) -> SessionState {
        let previous = self.state();
        self.set_state(previous.begin_loading());
        previous
    }

    /// Clears all three persisted entries; failures are logged.
    async fn discard_persisted(&self) {
        let keys = self.keys();
        if let Err(e) = self.store.clear(&keys.all()).await {
            tracing::warn!(error = %e, "Failed to clear rejected session from storage");
        }
    }

    /// Restores the session from storage. Runs once; later calls return the
    /// current state untouched.
    ///
    /// Never fails: unreadable, partial or corrupted storage all end signed
    /// out. An ineligible stored role also clears storage and asks for a
    /// redirect to the login destination.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> InitOutcome {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::warn!("Session manager already initialized");
            return InitOutcome {
                state: self.state(),
                redirect: None,
            };
        }

        self.begin_loading();
        let keys = self.keys();

        let persisted = match PersistedSession::load(&self.store, keys).await {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                tracing::info!("No stored session");
                return self.finish_init(SessionState::signed_out(), None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session storage unreadable, starting signed out");
                return self.finish_init(SessionState::signed_out(), None);
            }
        };

        let mut user = match persisted.parse_user(&keys.user) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Stored user is corrupted, discarding session");
                self.discard_persisted().await;
                return self.finish_init(SessionState::signed_out(), None);
            }
        };

        if user.normalize_photo() {
            match serialize_user(&user) {
                Ok(json) => {
                    if let Err(e) = self.store.set(&[(keys.user.as_str(), json.as_str())]).await {
                        tracing::warn!(error = %e, "Failed to persist normalized user");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize normalized user"),
            }
        }

        let role = user.role().unwrap_or(persisted.role.as_str()).to_string();
        if !self.policy.is_eligible(&role) {
            tracing::info!(
                user_id = user.id().as_deref(),
                %role,
                "Stored session role is not eligible, signing out"
            );
            self.discard_persisted().await;
            let redirect = NavigationIntent::to(&self.config.navigation.login_path);
            return self.finish_init(SessionState::signed_out(), Some(redirect));
        }

        if user.role().is_none() {
            user.set_role(role.clone());
        }
        tracing::info!(user_id = user.id().as_deref(), %role, "Restored session");
        self.finish_init(SessionState::signed_in(user), None)
    }

    fn finish_init(&self, state: SessionState, redirect: Option<NavigationIntent>) -> InitOutcome {
        self.set_state(state.clone());
        InitOutcome { state, redirect }
    }

    /// Signs in through the authentication service.
    ///
    /// Only eligible roles get a session; anyone else gets
    /// [`AuthError::AccessDenied`] with the employees-only message and storage
    /// is left as it was. Upstream failures are returned unchanged. Loading is
    /// cleared before this returns, whatever the outcome. A second call while
    /// one is running fails with [`AuthError::LoginInProgress`]; a logout
    /// while the service is answering makes it fail with
    /// [`AuthError::LoginCancelled`] and nothing is stored.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<NavigationIntent> {
        let _login = self
            .login_lock
            .try_lock()
            .map_err(|_| AuthError::LoginInProgress)?;

        let epoch = self.logouts.load(Ordering::SeqCst);
        let previous = self.begin_loading();
        let accepted = self.authenticate(email, password).await;

        let _commit = self.commit_lock.lock().await;
        if self.logouts.load(Ordering::SeqCst) != epoch {
            // Logout already settled the state
            tracing::warn!("Login cancelled by logout");
            return Err(AuthError::LoginCancelled);
        }

        let result = match accepted {
            Ok(accepted) => self.commit(accepted).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                tracing::info!(
                    user_id = user.id().as_deref(),
                    role = user.role(),
                    "Login succeeded"
                );
                self.set_state(SessionState::signed_in(user));
                Ok(NavigationIntent::to(&self.config.navigation.dashboard_path))
            }
            Err(e) => {
                if e.is_access_denied() {
                    tracing::warn!("Login refused: role not eligible");
                } else {
                    tracing::error!(error = %e, "Login failed");
                }
                self.set_state(previous.settled());
                Err(e)
            }
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Accepted> {
        let response = self.provider.login(email, password).await?;

        let role = extract_role(&response)
            .filter(|role| self.policy.is_eligible(role))
            .ok_or_else(AuthError::employees_only)?;

        let token = match response.token() {
            Some(token) => token.to_string(),
            None => {
                let placeholder = self
                    .config
                    .policy
                    .placeholder_token
                    .clone()
                    .ok_or(AuthError::MissingToken)?;
                tracing::warn!("Login response carried no token, storing placeholder");
                placeholder
            }
        };

        let mut user = response
            .user_record()?
            .unwrap_or_else(|| UserRecord::from_email(email));
        user.normalize_photo();
        user.strip_secrets();
        user.set_role(role.clone());

        Ok(Accepted { user, token, role })
    }

    /// Persists an accepted login. Caller holds `commit_lock`.
    async fn commit(&self, accepted: Accepted) -> Result<UserRecord> {
        let Accepted { user, token, role } = accepted;
        PersistedSession::save(&self.store, self.keys(), &user, &token, &role).await?;
        Ok(user)
    }

    /// Signs out. Storage failures are logged, never returned.
    ///
    /// A login still waiting on the service is cancelled.
    pub async fn logout(&self) -> NavigationIntent {
        let _commit = self.commit_lock.lock().await;
        self.logouts.fetch_add(1, Ordering::SeqCst);

        let keys = self.keys();
        // TODO: the cached role entry is kept across logout; drop it here once
        // the sidebar stops falling back to it for signed-out users.
        if let Err(e) = self.store.clear(&[keys.user.as_str(), keys.token.as_str()]).await {
            tracing::warn!(error = %e, "Failed to clear stored session on logout");
        }
        let user_id = self.user().and_then(|u| u.id());
        self.set_state(SessionState::signed_out());
        tracing::info!(user_id = user_id.as_deref(), "Logged out");
        NavigationIntent::to(&self.config.navigation.login_path)
    }

    /// Replaces the signed-in user's profile, in memory and in storage.
    ///
    /// A record without a role keeps the current one, so the session stays
    /// valid across a reload. Fails with [`AuthError::LoginInProgress`] while
    /// a login is running.
    pub async fn set_user(&self, mut user: UserRecord) -> Result<()> {
        let _login = self
            .login_lock
            .try_lock()
            .map_err(|_| AuthError::LoginInProgress)?;
        let _commit = self.commit_lock.lock().await;

        let current_role = {
            let state = self.state.borrow();
            if !state.is_authenticated() {
                return Err(AuthError::NotAuthenticated);
            }
            state.role().map(str::to_string)
        };

        if user.role().is_none() {
            if let Some(role) = current_role {
                user.set_role(role);
            }
        }
        user.strip_secrets();
        user.normalize_photo();

        let json = serialize_user(&user)?;
        self.store
            .set(&[(self.keys().user.as_str(), json.as_str())])
            .await?;

        let user_id = user.id();
        self.set_state(SessionState::signed_in(user));
        let _ = self.events.send(SessionEvent::UserUpdated { user_id });
        Ok(())
    }

    /// Role as the navigation shell reads it: the user's own, else the cached entry.
    pub async fn effective_role(&self) -> Option<String> {
        if let Some(role) = self.state.borrow().role() {
            return Some(role.to_string());
        }
        match self.store.get(&self.keys().role).await {
            Ok(role) => role.filter(|r| !r.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached role");
                None
            }
        }
    }

    /// Reloads the signed-in employee from the directory and stores the result.
    ///
    /// The validated session role is kept even if the directory reports a different one.
    pub async fn refresh_profile(&self, directory: &dyn EmployeeDirectory) -> Result<UserRecord> {
        let (id, role) = {
            let state = self.state.borrow();
            let user = state.user().ok_or(AuthError::NotAuthenticated)?;
            let id = user
                .id()
                .ok_or_else(|| AuthError::configuration("signed-in user has no id"))?;
            (id, state.role().map(str::to_string))
        };
        let token = self
            .store
            .get(&self.keys().token)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        let mut fresh = directory.get_by_id(&id, &token).await.map_err(|e| {
            tracing::warn!(user_id = %id, error = %e, "Failed to fetch profile");
            AuthError::from(e)
        })?;
        if let Some(role) = role {
            fresh.set_role(role);
        }
        self.set_user(fresh).await?;
        self.user().ok_or(AuthError::NotAuthenticated)
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }
}
