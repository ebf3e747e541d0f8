//! SQLite storage backend.
//!
//! Uses `rusqlite` for synchronous operations and `tokio-rusqlite` to run
//! them on a dedicated connection thread. Every commit is one transaction.

mod conversions;
mod error;
mod schema;
mod store;

pub use store::SqliteStore;
