//! In-memory storage backend.
//!
//! All tables live behind one `RwLock`, so a commit is applied to a copy
//! and swapped in as a whole. Data is lost when the process exits.

mod store;
mod tables;

pub use store::InMemoryStore;
