pub mod core;
pub mod file;
pub mod memory;

// Re-export the store port and persisted session types
pub use self::core::*;
pub use file::FileSessionStore;
pub use memory::InMemoryStore;
