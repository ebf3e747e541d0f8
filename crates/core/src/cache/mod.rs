mod error;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{entity_key, page_key};
pub use serialization::{deserialize, serialize, SerializationError};
pub use traits::Cache;
