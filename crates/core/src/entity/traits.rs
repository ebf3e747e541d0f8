use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::{FieldValue, Includes, ValidationError};

/// Behaviour shared by every persisted entity.
///
/// The generic repository, the caching decorator and the generic service are
/// written once against this trait.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Label used in cache keys and error messages.
    const KIND: &'static str;

    /// Names of the scalar fields that filters and mutations may reference.
    const FIELDS: &'static [&'static str];

    /// Relations always loaded on reads unless the caller opts out.
    const DEFAULT_INCLUDES: Includes;

    fn id(&self) -> Uuid;

    fn set_id(&mut self, id: Uuid);

    /// Returns the current value of a scalar field, `None` for unknown names.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Assigns a scalar field. `id` is not assignable.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), ValidationError>;

    fn validate(&self) -> Result<(), ValidationError>;

    /// Drops loaded navigation properties, keeping only persisted columns.
    fn clear_relations(&mut self);

    /// Combines an incoming full-record update with the stored row.
    ///
    /// The default is a plain replace. Entities with columns that callers
    /// never send back (credentials) override this to carry them over.
    fn merge_for_update(self, _existing: &Self) -> Self {
        self
    }
}
