//! Vec-backed [`EntitySet`] shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::entity::{Entity, Filter, Mutation};

use super::{Change, EntitySet, Query, RepositoryError, Result};

pub(crate) struct VecStore<E> {
    pub rows: Mutex<Vec<E>>,
    pub fetch_calls: AtomicUsize,
    pub commit_calls: AtomicUsize,
    pub last_query: Mutex<Option<Query>>,
}

impl<E: Entity> VecStore<E> {
    pub fn with_rows(rows: Vec<E>) -> Self {
        Self {
            rows: Mutex::new(rows),
            fetch_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn commits(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }
}

impl<E: Entity> Default for VecStore<E> {
    fn default() -> Self {
        Self::with_rows(Vec::new())
    }
}

fn conflict<E: Entity>(id: uuid::Uuid) -> RepositoryError {
    RepositoryError::ConcurrencyConflict {
        entity_type: E::KIND,
        id: id.to_string(),
    }
}

#[async_trait]
impl<E: Entity> EntitySet<E> for VecStore<E> {
    async fn fetch(&self, query: Query) -> Result<Vec<E>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().await = Some(query.clone());
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| query.filter.as_ref().is_none_or(|f| f.matches(*row)))
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.lock().await.len() as u64)
    }

    async fn commit(&self, changes: Vec<Change<E>>) -> Result<()> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().await;
        let mut next = rows.clone();
        for change in changes {
            match change {
                Change::Insert(row) => next.push(row),
                Change::Update(row) => {
                    let id = row.id();
                    let slot = next
                        .iter_mut()
                        .find(|r| r.id() == id)
                        .ok_or_else(|| conflict::<E>(id))?;
                    *slot = row.merge_for_update(slot);
                }
                Change::Delete(id) => {
                    let before = next.len();
                    next.retain(|r| r.id() != id);
                    if next.len() == before {
                        return Err(conflict::<E>(id));
                    }
                }
            }
        }
        *rows = next;
        Ok(())
    }

    async fn update_where(&self, filter: &Filter, mutation: &Mutation) -> Result<u64> {
        let mut rows = self.rows.lock().await;
        let mut affected = 0;
        for row in rows.iter_mut().filter(|r| filter.matches(&**r)) {
            mutation.apply(row)?;
            affected += 1;
        }
        Ok(affected)
    }
}
