use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use shoplist_core::entity::{Entity, Filter, Mutation};
use shoplist_core::storage::{Change, EntitySet, Query, RepositoryError, Result};

use super::tables::{MemoryTable, Tables};

/// In-memory storage backend for every entity type.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict<E: Entity>(id: uuid::Uuid) -> RepositoryError {
    RepositoryError::ConcurrencyConflict {
        entity_type: E::KIND,
        id: id.to_string(),
    }
}

fn apply<E: MemoryTable>(tables: &mut Tables, change: Change<E>) -> Result<()> {
    match change {
        Change::Insert(mut row) => {
            row.clear_relations();
            if E::rows(tables).iter().any(|r| r.id() == row.id()) {
                return Err(RepositoryError::AlreadyExists {
                    entity_type: E::KIND,
                    id: row.id().to_string(),
                });
            }
            row.check_row(tables)?;
            E::rows_mut(tables).push(row);
        }
        Change::Update(mut row) => {
            row.clear_relations();
            let id = row.id();
            let position = E::rows(tables)
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| conflict::<E>(id))?;
            let row = row.merge_for_update(&E::rows(tables)[position]);
            row.check_row(tables)?;
            E::rows_mut(tables)[position] = row;
        }
        Change::Delete(id) => {
            let rows = E::rows_mut(tables);
            let before = rows.len();
            rows.retain(|r| r.id() != id);
            if rows.len() == before {
                return Err(conflict::<E>(id));
            }
            E::cascade(tables, id);
        }
    }
    Ok(())
}

#[async_trait]
impl<E: MemoryTable> EntitySet<E> for InMemoryStore {
    async fn fetch(&self, query: Query) -> Result<Vec<E>> {
        let tables = self.tables.read().await;
        Ok(E::rows(&tables)
            .iter()
            .filter(|row| query.filter.as_ref().is_none_or(|f| f.matches(*row)))
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|row| {
                let mut row = row.clone();
                row.load(&tables, query.includes);
                row
            })
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(E::rows(&*self.tables.read().await).len() as u64)
    }

    async fn commit(&self, changes: Vec<Change<E>>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        for change in changes {
            apply(&mut next, change)?;
        }
        *tables = next;
        tracing::debug!(entity = E::KIND, "Changes committed");
        Ok(())
    }

    async fn update_where(&self, filter: &Filter, mutation: &Mutation) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();

        let targets: Vec<usize> = E::rows(&next)
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.matches(*row))
            .map(|(i, _)| i)
            .collect();
        for &i in &targets {
            let mut row = E::rows(&next)[i].clone();
            mutation.apply(&mut row)?;
            row.check_row(&next)?;
            E::rows_mut(&mut next)[i] = row;
        }

        *tables = next;
        tracing::debug!(entity = E::KIND, affected = targets.len(), "Bulk update applied");
        Ok(targets.len() as u64)
    }
}
