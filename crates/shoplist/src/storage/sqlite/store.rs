//! SQLite storage backend.
//!
//! Implements `EntitySet` from `shoplist_core::storage` for every entity
//! type over a single `tokio_rusqlite` connection.

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use shoplist_core::entity::{
    Entity, Filter, Includes, Item, ItemCategory, Mutation, ShoppingList, User,
};
use shoplist_core::storage::{Change, EntitySet, Query, RepositoryError, Result};

use super::conversions::{
    filter_to_sql, item_category_values, item_values, row_to_item, row_to_item_category,
    row_to_shopping_list, row_to_user, shopping_list_values, user_values, uuid_value,
};
use super::error::{map_rusqlite_error, map_tokio_rusqlite_error};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// An entity persisted in its own SQLite table.
pub trait SqlEntity: Entity {
    const TABLE: &'static str;

    /// Column order shared by `from_row` and `to_values`. `id` comes first.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row) -> rusqlite::Result<Self>;

    fn to_values(&self) -> Vec<Value>;

    /// Fills the navigation properties named in `includes`.
    fn load(&mut self, conn: &rusqlite::Connection, includes: Includes) -> rusqlite::Result<()>;
}

/// Rows of `T` matching `clause`, in insertion order. A negative `limit`
/// means no limit.
fn select_rows<T: SqlEntity>(
    conn: &rusqlite::Connection,
    clause: &str,
    mut params: Vec<Value>,
    limit: i64,
    offset: i64,
) -> rusqlite::Result<Vec<T>> {
    params.push(Value::Integer(limit));
    params.push(Value::Integer(offset));

    let mut stmt = conn.prepare(&schema::select(T::TABLE, T::COLUMNS, clause))?;
    let rows = stmt.query_map(params_from_iter(params), T::from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn select_by_id<T: SqlEntity>(
    conn: &rusqlite::Connection,
    id: Uuid,
) -> rusqlite::Result<Option<T>> {
    Ok(select_rows::<T>(conn, "id = ?", vec![uuid_value(id)], 1, 0)?.pop())
}

fn select_children<T: SqlEntity>(
    conn: &rusqlite::Connection,
    column: &str,
    parent: Uuid,
) -> rusqlite::Result<Vec<T>> {
    select_rows::<T>(conn, &format!("{column} = ?"), vec![uuid_value(parent)], -1, 0)
}

impl SqlEntity for Item {
    const TABLE: &'static str = "items";
    const COLUMNS: &'static [&'static str] = schema::ITEM_COLUMNS;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_item(row)
    }

    fn to_values(&self) -> Vec<Value> {
        item_values(self)
    }

    fn load(&mut self, conn: &rusqlite::Connection, includes: Includes) -> rusqlite::Result<()> {
        if includes.contains(Includes::CATEGORY) {
            self.category = select_by_id(conn, self.item_category_id)?;
        }
        if includes.contains(Includes::SHOPPING_LIST) {
            self.shopping_list = select_by_id(conn, self.shopping_list_id)?;
        }
        Ok(())
    }
}

impl SqlEntity for ItemCategory {
    const TABLE: &'static str = "item_categories";
    const COLUMNS: &'static [&'static str] = schema::ITEM_CATEGORY_COLUMNS;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_item_category(row)
    }

    fn to_values(&self) -> Vec<Value> {
        item_category_values(self)
    }

    fn load(&mut self, conn: &rusqlite::Connection, includes: Includes) -> rusqlite::Result<()> {
        if includes.contains(Includes::ITEMS) {
            self.items = select_children(conn, "item_category_id", self.id)?;
        }
        Ok(())
    }
}

impl SqlEntity for ShoppingList {
    const TABLE: &'static str = "shopping_lists";
    const COLUMNS: &'static [&'static str] = schema::SHOPPING_LIST_COLUMNS;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_shopping_list(row)
    }

    fn to_values(&self) -> Vec<Value> {
        shopping_list_values(self)
    }

    fn load(&mut self, conn: &rusqlite::Connection, includes: Includes) -> rusqlite::Result<()> {
        if includes.contains(Includes::ITEMS) {
            // Items of a list always carry their category
            let mut items: Vec<Item> = select_children(conn, "shopping_list_id", self.id)?;
            for item in &mut items {
                item.load(conn, Includes::CATEGORY)?;
            }
            self.items = items;
        }
        if includes.contains(Includes::USER) {
            self.user = select_by_id(conn, self.user_id)?;
        }
        Ok(())
    }
}

impl SqlEntity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = schema::USER_COLUMNS;

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        row_to_user(row)
    }

    fn to_values(&self) -> Vec<Value> {
        user_values(self)
    }

    fn load(&mut self, conn: &rusqlite::Connection, includes: Includes) -> rusqlite::Result<()> {
        if includes.contains(Includes::SHOPPING_LISTS) {
            self.shopping_lists = select_children(conn, "user_id", self.id)?;
        }
        Ok(())
    }
}

/// SQLite-based storage for all entity types.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a file-based database and applies the schema.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;
        tracing::info!(path = %path, "SQLite database opened");

        Ok(Self { conn })
    }

    /// Creates a store over an in-memory database.
    ///
    /// Data is lost when the last clone is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }
}

fn conflict<E: Entity>(id: &str) -> RepositoryError {
    RepositoryError::ConcurrencyConflict {
        entity_type: E::KIND,
        id: id.to_string(),
    }
}

/// Values for `schema::update`: every column but `id`, then `id`.
fn update_values<E: SqlEntity>(row: &E) -> Vec<Value> {
    let mut values = row.to_values();
    let id = values.remove(0);
    values.push(id);
    values
}

fn apply<E: SqlEntity>(conn: &rusqlite::Connection, change: Change<E>) -> Result<()> {
    let id = change.id().to_string();
    let sql_err = |e: rusqlite::Error| map_rusqlite_error(e, E::KIND, &id);

    match change {
        Change::Insert(row) => {
            conn.execute(
                &schema::insert(E::TABLE, E::COLUMNS),
                params_from_iter(row.to_values()),
            )
            .map_err(sql_err)?;
        }
        Change::Update(row) => {
            let existing = select_by_id::<E>(conn, row.id())
                .map_err(sql_err)?
                .ok_or_else(|| conflict::<E>(&id))?;
            let row = row.merge_for_update(&existing);
            conn.execute(
                &schema::update(E::TABLE, E::COLUMNS),
                params_from_iter(update_values(&row)),
            )
            .map_err(sql_err)?;
        }
        Change::Delete(target) => {
            let affected = conn
                .execute(&schema::delete(E::TABLE), params_from_iter([uuid_value(target)]))
                .map_err(sql_err)?;
            if affected == 0 {
                return Err(conflict::<E>(&id));
            }
        }
    }
    Ok(())
}

/// Applies every change in one transaction. Dropping the transaction on
/// error rolls it back.
fn apply_all<E: SqlEntity>(conn: &mut rusqlite::Connection, changes: Vec<Change<E>>) -> Result<()> {
    let tx = conn
        .transaction()
        .map_err(|e| map_rusqlite_error(e, E::KIND, ""))?;
    for change in changes {
        apply(&tx, change)?;
    }
    tx.commit().map_err(|e| map_rusqlite_error(e, E::KIND, ""))
}

fn update_matching<E: SqlEntity>(
    conn: &mut rusqlite::Connection,
    filter: &Filter,
    mutation: &Mutation,
) -> Result<u64> {
    let tx = conn
        .transaction()
        .map_err(|e| map_rusqlite_error(e, E::KIND, ""))?;

    let mut params = Vec::new();
    let clause = filter_to_sql(filter, &mut params);
    let rows = select_rows::<E>(&tx, &clause, params, -1, 0)
        .map_err(|e| map_rusqlite_error(e, E::KIND, ""))?;

    let sql = schema::update(E::TABLE, E::COLUMNS);
    for mut row in rows.iter().cloned() {
        mutation.apply(&mut row)?;
        tx.execute(&sql, params_from_iter(update_values(&row)))
            .map_err(|e| map_rusqlite_error(e, E::KIND, &row.id().to_string()))?;
    }

    tx.commit().map_err(|e| map_rusqlite_error(e, E::KIND, ""))?;
    Ok(rows.len() as u64)
}

#[async_trait]
impl<E: SqlEntity> EntitySet<E> for SqliteStore {
    async fn fetch(&self, query: Query) -> Result<Vec<E>> {
        if let Some(filter) = &query.filter {
            filter.check_fields(E::FIELDS)?;
        }
        let Query {
            filter,
            includes,
            skip,
            limit,
        } = query;
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let offset = i64::try_from(skip).unwrap_or(i64::MAX);

        self.conn
            .call(move |conn| {
                let mut params = Vec::new();
                let clause = filter
                    .as_ref()
                    .map_or_else(|| "1".to_string(), |f| filter_to_sql(f, &mut params));

                let mut rows =
                    select_rows::<E>(conn, &clause, params, limit, offset).map_err(wrap_err)?;
                for row in &mut rows {
                    row.load(conn, includes).map_err(wrap_err)?;
                }
                Ok(rows)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::KIND))
    }

    async fn count(&self) -> Result<u64> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row(&schema::count(E::TABLE), [], |row| row.get(0))
                    .map_err(wrap_err)?;
                Ok(count.max(0) as u64)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::KIND))
    }

    async fn commit(&self, changes: Vec<Change<E>>) -> Result<()> {
        let count = changes.len();
        self.conn
            .call(move |conn| Ok(apply_all(conn, changes)))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::KIND))??;

        tracing::debug!(entity = E::KIND, changes = count, "Changes committed");
        Ok(())
    }

    async fn update_where(&self, filter: &Filter, mutation: &Mutation) -> Result<u64> {
        filter.check_fields(E::FIELDS)?;
        mutation.check_fields(E::FIELDS)?;
        let filter = filter.clone();
        let mutation = mutation.clone();

        let affected = self
            .conn
            .call(move |conn| Ok(update_matching::<E>(conn, &filter, &mutation)))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, E::KIND))??;

        tracing::debug!(entity = E::KIND, affected, "Bulk update applied");
        Ok(affected)
    }
}
