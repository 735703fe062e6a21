//! Top-level route table and the application shell that drives navigation.
//!
//! [`RouteTable::portal`] mirrors the HR portal: `/login` is public, `/`
//! forwards to the dashboard, and every other path, including unknown ones,
//! sits behind the [`RouteGuard`]. [`AppRouter`] is the only component that
//! performs navigation. The session manager and guard just describe it.

use crate::config::NavigationConfig;
use crate::errors::Result;
use crate::guard::{GuardDecision, NavigationIntent, RouteGuard};
use crate::providers::AuthProvider;
use crate::session::{InitOutcome, SessionManager};
use crate::storage::SessionStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Redirect chains longer than this are treated as a loop.
const MAX_REDIRECTS: usize = 8;

/// View shown for unmatched paths.
pub const NOT_FOUND_VIEW: &str = "not-found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    View(String),
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pattern: String,
    target: RouteTarget,
    guarded: bool,
}

impl Route {
    pub fn view(pattern: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            target: RouteTarget::View(view.into()),
            guarded: true,
        }
    }

    pub fn redirect(pattern: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            target: RouteTarget::Redirect(to.into()),
            guarded: true,
        }
    }

    /// Reachable without a session.
    pub fn public(mut self) -> Self {
        self.guarded = false;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    /// Matches `/hr/:id` style patterns segment by segment.
    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let pattern: Vec<&str> = segments(&self.pattern).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (expected, got) in pattern.iter().zip(actual) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), got.to_string());
                }
                None if *expected == got => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Drops the query string and fragment.
fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    fallback: Route,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: Route::view("*", NOT_FOUND_VIEW),
        }
    }

    /// Routes are tried in insertion order.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn fallback(mut self, route: Route) -> Self {
        self.fallback = route;
        self
    }

    /// The HR portal's route table.
    pub fn portal(navigation: &NavigationConfig) -> Self {
        const VIEWS: &[(&str, &str)] = &[
            ("/employees", "employees"),
            ("/add-employee", "add-employee"),
            ("/hr", "hr"),
            ("/hr/:id", "hr"),
            ("/admin", "admin-panel"),
            ("/regularization", "regularization"),
            ("/regularization/submit", "submit-regularization"),
            ("/organizations/:id", "organization-details"),
            ("/payroll", "payroll"),
            ("/salary-slips", "salary-slips"),
            ("/attendance", "attendance"),
            ("/attendance/employee/:id", "employee-attendance-detail"),
            ("/apply-leave", "apply-leave"),
            ("/leaves", "leaves"),
            ("/leaves/policy", "leave-policy"),
            ("/leaves/requests", "leave-requests"),
            ("/leaves/allotment", "leave-allotment"),
            ("/leaves/balance", "leave-balance"),
            ("/leaves/allotment/history/:employeeId", "leave-allotment-history"),
            ("/reports/employees", "employees-report"),
            ("/reports/leave-requests", "leave-requests-report"),
            ("/reports/payroll", "payroll-report"),
            ("/settings", "settings"),
            ("/profile", "profile"),
            ("/create-organization", "create-organization"),
        ];

        let table = Self::new()
            .route(Route::view(&navigation.login_path, "login").public())
            .route(Route::redirect("/", &navigation.dashboard_path))
            .route(Route::view(&navigation.dashboard_path, "dashboard"));
        VIEWS
            .iter()
            .fold(table, |table, (pattern, view)| {
                table.route(Route::view(*pattern, *view))
            })
    }

    pub fn resolve(&self, path: &str) -> RouteMatch<'_> {
        let path = strip_query(path);
        self.routes
            .iter()
            .find_map(|route| {
                route
                    .matches(path)
                    .map(|params| RouteMatch { route, params })
            })
            .unwrap_or_else(|| RouteMatch {
                route: &self.fallback,
                params: HashMap::new(),
            })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

/// What the shell should show for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render {
        view: String,
        params: HashMap<String, String>,
    },
    /// Session still loading; render the placeholder
    Waiting,
    Redirect(NavigationIntent),
}

/// Performs navigation on behalf of the shell.
pub trait Navigator: Send + Sync {
    fn navigate(&self, intent: &NavigationIntent);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn navigate(&self, intent: &NavigationIntent) {
        (**self).navigate(intent)
    }
}

/// In-memory history stack; `replace` intents overwrite the top entry.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<NavigationIntent>>,
    navigations: Mutex<Vec<NavigationIntent>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<NavigationIntent> {
        self.entries.lock().last().cloned()
    }

    pub fn current_path(&self) -> Option<String> {
        self.current().map(|i| i.target_path)
    }

    /// The stack as it stands, oldest first.
    pub fn entries(&self) -> Vec<NavigationIntent> {
        self.entries.lock().clone()
    }

    /// Every navigation performed, including replaced ones.
    pub fn navigations(&self) -> Vec<NavigationIntent> {
        self.navigations.lock().clone()
    }

    pub fn navigations_to(&self, path: &str) -> usize {
        self.navigations
            .lock()
            .iter()
            .filter(|i| i.target_path == path)
            .count()
    }
}

impl Navigator for MemoryHistory {
    fn navigate(&self, intent: &NavigationIntent) {
        self.navigations.lock().push(intent.clone());
        let mut entries = self.entries.lock();
        if intent.replace {
            entries.pop();
        }
        entries.push(intent.clone());
    }
}

/// Application shell: session manager, guard and route table behind one navigator.
pub struct AppRouter<S: SessionStore, P: AuthProvider, N: Navigator> {
    manager: Arc<SessionManager<S, P>>,
    guard: RouteGuard,
    table: RouteTable,
    navigator: N,
}

impl<S: SessionStore, P: AuthProvider, N: Navigator> AppRouter<S, P, N> {
    /// Shell with the portal's route table.
    pub fn new(manager: Arc<SessionManager<S, P>>, navigator: N) -> Self {
        let guard = RouteGuard::from_config(manager.config());
        let table = RouteTable::portal(&manager.config().navigation);
        Self::with_table(manager, guard, table, navigator)
    }

    pub fn with_table(
        manager: Arc<SessionManager<S, P>>,
        guard: RouteGuard,
        table: RouteTable,
        navigator: N,
    ) -> Self {
        Self {
            manager,
            guard,
            table,
            navigator,
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager<S, P>> {
        &self.manager
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Restores the session and follows the redirect it asks for, if any.
    pub async fn start(&self) -> InitOutcome {
        let outcome = self.manager.initialize().await;
        if let Some(intent) = &outcome.redirect {
            self.navigator.navigate(intent);
        }
        outcome
    }

    /// Decides what `path` shows right now, without navigating.
    pub fn resolve(&self, path: &str) -> Resolution {
        let matched = self.table.resolve(path);
        let route = matched.route;

        if route.is_guarded() {
            match self.guard.check(&self.manager.state(), strip_query(path)) {
                GuardDecision::Pending => return Resolution::Waiting,
                GuardDecision::Redirect(intent) => return Resolution::Redirect(intent),
                GuardDecision::Allow => {}
            }
        }

        match route.target() {
            RouteTarget::View(view) => Resolution::Render {
                view: view.clone(),
                params: matched.params,
            },
            RouteTarget::Redirect(to) => Resolution::Redirect(NavigationIntent::replace(to)),
        }
    }

    /// Navigates to `path` and follows redirects until a view renders or the
    /// session is still loading.
    pub fn visit(&self, path: &str) -> Resolution {
        self.follow(NavigationIntent::to(path))
    }

    fn follow(&self, mut intent: NavigationIntent) -> Resolution {
        for _ in 0..MAX_REDIRECTS {
            self.navigator.navigate(&intent);
            match self.resolve(&intent.target_path) {
                Resolution::Redirect(next) => intent = next,
                resolution => return resolution,
            }
        }
        tracing::error!(path = %intent.target_path, "Redirect loop detected");
        Resolution::Redirect(intent)
    }

    /// Signs in and lands on the dashboard. Errors leave navigation untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Resolution> {
        let intent = self.manager.login(email, password).await?;
        Ok(self.follow(intent))
    }

    pub async fn logout(&self) -> Resolution {
        let intent = self.manager.logout().await;
        self.follow(intent)
    }
}
