//! Cached repository decorator.
//!
//! Wraps any `Repository<E>` with the cache-aside pattern:
//!
//! - **Reads**: check the cache first, on miss fetch from the repository and
//!   populate the cache
//! - **Writes**: stage in the repository, write the by-id entry through, and
//!   refresh or evict it once the commit settles
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let cache = Arc::new(MemoryCache::new(10_000));
//!
//! let items = CachedRepository::<Item, _, _>::new(
//!     Arc::new(GenericRepository::new(store)),
//!     cache,
//!     Duration::from_secs(120),
//! );
//! ```

mod repository;

pub use repository::CachedRepository;
