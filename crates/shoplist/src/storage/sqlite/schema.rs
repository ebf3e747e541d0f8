//! SQLite schema definitions.

/// Creates all tables. Foreign keys are enabled per connection.
pub const CREATE_TABLES: &str = r#"
PRAGMA foreign_keys = ON;

-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    user_name TEXT NOT NULL,
    email TEXT NOT NULL COLLATE NOCASE UNIQUE,
    password_hash TEXT,
    image_name TEXT NOT NULL DEFAULT 'Default.jpg'
);

-- Shopping lists table
CREATE TABLE IF NOT EXISTS shopping_lists (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    user_id TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Item categories table
CREATE TABLE IF NOT EXISTS item_categories (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

-- Items table. Prices are stored as decimal text to keep them exact.
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL,
    shopping_list_id TEXT NOT NULL,
    item_category_id TEXT NOT NULL,
    FOREIGN KEY (shopping_list_id) REFERENCES shopping_lists(id) ON DELETE CASCADE,
    FOREIGN KEY (item_category_id) REFERENCES item_categories(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_shopping_lists_user ON shopping_lists(user_id);
CREATE INDEX IF NOT EXISTS idx_items_list ON items(shopping_list_id);
CREATE INDEX IF NOT EXISTS idx_items_category ON items(item_category_id);
"#;

pub const USER_COLUMNS: &[&str] = &["id", "user_name", "email", "password_hash", "image_name"];

pub const SHOPPING_LIST_COLUMNS: &[&str] = &["id", "name", "user_id"];

pub const ITEM_CATEGORY_COLUMNS: &[&str] = &["id", "name"];

pub const ITEM_COLUMNS: &[&str] = &[
    "id",
    "name",
    "quantity",
    "notes",
    "price",
    "shopping_list_id",
    "item_category_id",
];

/// `SELECT` over `columns` with a caller-supplied `WHERE` clause, in insertion order.
pub fn select(table: &str, columns: &[&str], clause: &str) -> String {
    format!(
        "SELECT {} FROM {table} WHERE {clause} ORDER BY rowid LIMIT ? OFFSET ?",
        columns.join(", ")
    )
}

pub fn insert(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

/// `UPDATE` of every column but the leading `id`, keyed by `id` as the last parameter.
pub fn update(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .skip(1)
        .map(|c| format!("{c} = ?"))
        .collect();
    format!("UPDATE {table} SET {} WHERE id = ?", assignments.join(", "))
}

pub fn delete(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id = ?")
}

pub fn count(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_builders() {
        assert_eq!(
            select("item_categories", ITEM_CATEGORY_COLUMNS, "1"),
            "SELECT id, name FROM item_categories WHERE 1 ORDER BY rowid LIMIT ? OFFSET ?"
        );
        assert_eq!(
            insert("shopping_lists", SHOPPING_LIST_COLUMNS),
            "INSERT INTO shopping_lists (id, name, user_id) VALUES (?, ?, ?)"
        );
        assert_eq!(
            update("shopping_lists", SHOPPING_LIST_COLUMNS),
            "UPDATE shopping_lists SET name = ?, user_id = ? WHERE id = ?"
        );
        assert_eq!(delete("users"), "DELETE FROM users WHERE id = ?");
    }
}
