/*!
# HR Session

Session establishment and route authorization for the HR portal.

The crate restores a persisted session at startup, runs an employee-only
login against the authentication service, and decides for every route
whether it renders, waits for the session, or redirects to the login view.

## Features

- Session restoration from a pluggable key/value store (in-memory or file)
- Employee-only login with role extraction from inconsistent responses
- Case-insensitive role policy shared by login, restore and the route guard
- Route guard producing navigation intents with access-denied context
- Portal route table with `:param` segments and a guarded not-found view
- Layered configuration (defaults, TOML file, `HR_SESSION__*` environment)
- reqwest-backed authentication and employee directory collaborators

## Quick Start

```rust,no_run
use hr_session::{AppRouter, ConfigBuilder, FileSessionStore, HttpAuthProvider, MemoryHistory, SessionManager};
use std::sync::Arc;

# #[tokio::main]
# async fn main() -> Result<(), Box<dyn std::error::Error>> {
let config = ConfigBuilder::new().with_file("hr-session.toml", false).build()?;

let store = FileSessionStore::new(FileSessionStore::default_path());
let provider = HttpAuthProvider::new(&config.provider)?;
let manager = Arc::new(SessionManager::new(store, provider, config));

let router = AppRouter::new(manager, MemoryHistory::new());
router.start().await;

router.login("jane@example.com", "secret").await?;
println!("{:?}", router.visit("/leaves/balance"));
# Ok(())
# }
```
*/

pub mod config;
pub mod errors;
pub mod guard;
pub mod providers;
pub mod router;
pub mod session;
pub mod storage;
pub mod testing;
pub mod user;

pub use config::{ConfigBuilder, SessionConfig};
pub use errors::{AuthError, Result, StorageError, UpstreamError};
pub use guard::{GuardDecision, NavigationIntent, RouteGuard};
pub use providers::{AuthProvider, EmployeeDirectory, LoginResponse};
#[cfg(feature = "http-provider")]
pub use providers::{HttpAuthProvider, HttpEmployeeDirectory};
pub use router::{AppRouter, MemoryHistory, Navigator, Resolution, Route, RouteTable};
pub use session::{InitOutcome, RolePolicy, SessionEvent, SessionManager, SessionPhase, SessionState};
pub use storage::{FileSessionStore, InMemoryStore, SessionStore, StorageKeys};
pub use user::UserRecord;
