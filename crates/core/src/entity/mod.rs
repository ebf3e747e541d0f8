//! Domain entities and the store-neutral query vocabulary used to read and
//! mutate them.

mod includes;
mod query;
mod traits;
mod types;
mod validation;

pub use includes::Includes;
pub use query::{FieldValue, Filter, Mutation};
pub use traits::Entity;
pub use types::{Item, ItemCategory, ShoppingList, User, DEFAULT_IMAGE_NAME};
pub use validation::ValidationError;
