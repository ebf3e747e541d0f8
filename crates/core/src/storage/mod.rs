mod error;
mod generic;
mod http_mapping;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{RepositoryError, Result};
pub use generic::GenericRepository;
pub use http_mapping::repository_error_to_status_code;
pub use traits::{EntitySet, Repository};
pub use types::{Change, Query};
