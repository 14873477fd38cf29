#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Session stores: an in-process map and a SQLite table.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Capacity and idle-expiry bounds shared by both stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Live sessions allowed before the least recently updated is evicted.
    pub max_sessions: usize,
    /// Sessions idle for longer than this stop being loadable and are
    /// evicted on the next create.
    pub session_timeout: chrono::Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            session_timeout: chrono::Duration::hours(24),
        }
    }
}

impl SessionLimits {
    #[must_use]
    pub fn new(max_sessions: usize, timeout_hours: u64) -> Self {
        let hours = i64::try_from(timeout_hours).unwrap_or(i64::MAX / 3600);
        Self {
            max_sessions: max_sessions.max(1),
            session_timeout: chrono::Duration::try_hours(hours)
                .unwrap_or_else(|| chrono::Duration::hours(24 * 365)),
        }
    }
}
