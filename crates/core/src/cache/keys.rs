use uuid::Uuid;

/// Returns the cache key for a single entity.
pub fn entity_key(kind: &str, id: Uuid) -> String {
    format!("{}:{}", kind, id)
}

/// Returns the cache key for one page of `get_all_paginated`.
///
/// The `page` segment keeps page keys from ever colliding with entity keys.
pub fn page_key(kind: &str, skip: i64, limit: i64) -> String {
    format!("{}:page:{}:{}", kind, skip, limit)
}
