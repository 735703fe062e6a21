//! Session state, role policy and the session manager.

pub mod manager;
pub mod role;
pub mod state;

pub use manager::*;
pub use role::{RolePolicy, extract_role};
pub use state::{SessionEvent, SessionPhase, SessionState};
