//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows, parameter values and
//! domain types. Testable without database access.

use std::str::FromStr;

use rusqlite::types::{Type, Value};
use rusqlite::Row;
use rust_decimal::Decimal;
use uuid::Uuid;

use shoplist_core::entity::{FieldValue, Filter, Item, ItemCategory, ShoppingList, User};

/// Convert a SQLite row to a User.
///
/// Expected columns: id, user_name, email, password_hash, image_name
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let mut user = User::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?)
        .with_id(parse_uuid(0, &id)?);
    user.password_hash = row.get(3)?;
    user.image_name = row.get(4)?;
    Ok(user)
}

pub fn user_values(user: &User) -> Vec<Value> {
    vec![
        uuid_value(user.id),
        Value::Text(user.user_name.clone()),
        Value::Text(user.email.clone()),
        optional_text(user.password_hash.clone()),
        Value::Text(user.image_name.clone()),
    ]
}

/// Expected columns: id, name, user_id
pub fn row_to_shopping_list(row: &Row) -> rusqlite::Result<ShoppingList> {
    let id: String = row.get(0)?;
    let name: Option<String> = row.get(1)?;
    let user_id: String = row.get(2)?;

    let mut list = ShoppingList::new(parse_uuid(2, &user_id)?).with_id(parse_uuid(0, &id)?);
    list.name = name;
    Ok(list)
}

pub fn shopping_list_values(list: &ShoppingList) -> Vec<Value> {
    vec![
        uuid_value(list.id),
        optional_text(list.name.clone()),
        uuid_value(list.user_id),
    ]
}

/// Expected columns: id, name
pub fn row_to_item_category(row: &Row) -> rusqlite::Result<ItemCategory> {
    let id: String = row.get(0)?;
    Ok(ItemCategory::new(row.get::<_, String>(1)?).with_id(parse_uuid(0, &id)?))
}

pub fn item_category_values(category: &ItemCategory) -> Vec<Value> {
    vec![uuid_value(category.id), Value::Text(category.name.clone())]
}

/// Expected columns: id, name, quantity, notes, price, shopping_list_id, item_category_id
pub fn row_to_item(row: &Row) -> rusqlite::Result<Item> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let quantity: i32 = row.get(2)?;
    let notes: String = row.get(3)?;
    let price: String = row.get(4)?;
    let shopping_list_id: String = row.get(5)?;
    let item_category_id: String = row.get(6)?;

    Ok(Item::new(
        name,
        quantity,
        parse_decimal(4, &price)?,
        parse_uuid(5, &shopping_list_id)?,
        parse_uuid(6, &item_category_id)?,
    )
    .with_notes(notes)
    .with_id(parse_uuid(0, &id)?))
}

pub fn item_values(item: &Item) -> Vec<Value> {
    vec![
        uuid_value(item.id),
        Value::Text(item.name.clone()),
        Value::Integer(i64::from(item.quantity)),
        Value::Text(item.notes.clone()),
        decimal_value(item.price),
        uuid_value(item.shopping_list_id),
        uuid_value(item.item_category_id),
    ]
}

/// Binds a field value the same way its column is stored.
pub fn field_to_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Uuid(id) => uuid_value(*id),
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Integer(n) => Value::Integer(*n),
        FieldValue::Decimal(d) => decimal_value(*d),
        FieldValue::Null => Value::Null,
    }
}

/// Renders `filter` as a `WHERE` clause, pushing bound values onto `params`.
///
/// Field names must already be checked against the entity's known fields.
pub fn filter_to_sql(filter: &Filter, params: &mut Vec<Value>) -> String {
    match filter {
        Filter::Eq { field, value } => match field_to_value(value) {
            Value::Null => format!("{field} IS NULL"),
            bound => {
                params.push(bound);
                format!("{field} = ?")
            }
        },
        Filter::And(filters) => join(filters, " AND ", "1", params),
        Filter::Or(filters) => join(filters, " OR ", "0", params),
    }
}

fn join(filters: &[Filter], separator: &str, empty: &str, params: &mut Vec<Value>) -> String {
    if filters.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = filters.iter().map(|f| filter_to_sql(f, params)).collect();
    format!("({})", parts.join(separator))
}

/// Canonical text for a decimal column: trailing zeros past two places are
/// dropped, so `3.5`, `3.50` and `3.500` bind and store as `"3.50"`.
pub fn decimal_value(value: Decimal) -> Value {
    let mut value = value.normalize();
    if value.scale() < 2 {
        value.rescale(2);
    }
    Value::Text(value.to_string())
}

pub fn uuid_value(id: Uuid) -> Value {
    Value::Text(id.to_string())
}

fn optional_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

fn parse_uuid(column: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_decimal(column: usize, s: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_to_sql_eq() {
        let id = Uuid::new_v4();
        let mut params = Vec::new();

        let sql = filter_to_sql(&Filter::id(id), &mut params);

        assert_eq!(sql, "id = ?");
        assert_eq!(params, vec![Value::Text(id.to_string())]);
    }

    #[test]
    fn test_decimal_value_is_canonical() {
        let text = |d: Decimal| match decimal_value(d) {
            Value::Text(s) => s,
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(text(Decimal::new(35, 1)), "3.50");
        assert_eq!(text(Decimal::new(3500, 3)), "3.50");
        assert_eq!(text(Decimal::new(4, 0)), "4.00");
        assert_eq!(text(Decimal::new(12345, 3)), "12.345");
    }

    #[test]
    fn test_filter_to_sql_null_uses_is_null() {
        let mut params = Vec::new();
        let sql = filter_to_sql(&Filter::eq("name", FieldValue::Null), &mut params);

        assert_eq!(sql, "name IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_filter_to_sql_nested() {
        let mut params = Vec::new();
        let filter = Filter::eq("name", "Milk")
            .and(Filter::eq("quantity", 2))
            .or(Filter::eq("notes", "rye"));

        let sql = filter_to_sql(&filter, &mut params);

        assert_eq!(sql, "((name = ? AND quantity = ?) OR notes = ?)");
        assert_eq!(
            params,
            vec![
                Value::Text("Milk".to_string()),
                Value::Integer(2),
                Value::Text("rye".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_groups() {
        let mut params = Vec::new();
        assert_eq!(filter_to_sql(&Filter::And(vec![]), &mut params), "1");
        assert_eq!(filter_to_sql(&Filter::Or(vec![]), &mut params), "0");
    }

    #[test]
    fn test_decimal_binds_as_text() {
        assert_eq!(
            field_to_value(&FieldValue::Decimal(Decimal::new(350, 2))),
            Value::Text("3.50".to_string())
        );
    }

    #[test]
    fn test_item_values_column_order() {
        let item = Item::new("Milk", 2, Decimal::new(350, 2), Uuid::nil(), Uuid::nil())
            .with_id(Uuid::nil());
        let values = item_values(&item);

        assert_eq!(values.len(), 7);
        assert_eq!(values[2], Value::Integer(2));
        assert_eq!(values[4], Value::Text("3.50".to_string()));
    }
}
