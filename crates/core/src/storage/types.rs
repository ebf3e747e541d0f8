use uuid::Uuid;

use crate::entity::{Filter, Includes};

/// A read request against an [`super::EntitySet`].
///
/// Rows come back in stable store order (insertion order). `skip` and
/// `limit` slice that order after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filter: Option<Filter>,
    pub includes: Includes,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(includes: Includes) -> Self {
        Self {
            includes,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// A staged mutation waiting for `save_changes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<E> {
    Insert(E),
    Update(E),
    Delete(Uuid),
}

impl<E: crate::entity::Entity> Change<E> {
    /// Id of the row the change targets.
    pub fn id(&self) -> Uuid {
        match self {
            Change::Insert(entity) | Change::Update(entity) => entity.id(),
            Change::Delete(id) => *id,
        }
    }
}
