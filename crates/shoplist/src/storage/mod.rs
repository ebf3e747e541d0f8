//! Storage backend implementations.
//!
//! This module provides concrete implementations of the `EntitySet` trait
//! defined in `shoplist_core::storage`, plus the caching repository
//! decorator. The backend is selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): tables held in process memory
//! - `sqlite`: SQLite storage backend using `rusqlite` and `tokio-rusqlite`
//!
//! These features are mutually exclusive - only one storage backend can be
//! enabled at a time.
//!
//! Build with SQLite:
//! ```bash
//! cargo build -p shoplist --no-default-features --features sqlite,memory
//! ```

// Compile-time checks for mutual exclusivity
#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!(
    "Features 'sqlite' and 'inmemory' are mutually exclusive. \
    Enable only one storage backend at a time."
);

#[cfg(not(any(feature = "sqlite", feature = "inmemory")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'sqlite' feature. \
    Example: cargo build -p shoplist --features sqlite"
);

mod cached;

#[cfg(any(feature = "inmemory", test))]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cached::CachedRepository;

#[cfg(any(feature = "inmemory", test))]
pub use inmemory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// The storage backend compiled into this build.
#[cfg(feature = "inmemory")]
pub type Store = InMemoryStore;

#[cfg(feature = "sqlite")]
pub type Store = SqliteStore;
