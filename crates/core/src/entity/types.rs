use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{max_chars, require};
use super::{Entity, FieldValue, Includes, ValidationError};

/// Image name assigned to users that never uploaded an avatar.
pub const DEFAULT_IMAGE_NAME: &str = "Default.jpg";

const NAME_MAX: usize = 50;
const NOTES_MAX: usize = 200;
const USER_FIELD_MAX: usize = 256;
const MIN_QUANTITY: i32 = 1;

/// Smallest accepted item price (0.99).
fn min_price() -> Decimal {
    Decimal::new(99, 2)
}

/// A product line on a shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    #[serde(default)]
    pub notes: String,
    pub price: Decimal,
    pub shopping_list_id: Uuid,
    pub item_category_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ItemCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_list: Option<ShoppingList>,
}

impl Item {
    /// Creates an unsaved item. The id stays nil until the item is posted.
    pub fn new(
        name: impl Into<String>,
        quantity: i32,
        price: Decimal,
        shopping_list_id: Uuid,
        item_category_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            quantity,
            notes: String::new(),
            price,
            shopping_list_id,
            item_category_id,
            category: None,
            shopping_list: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Name of the loaded category, if the relation was included.
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }
}

impl Entity for Item {
    const KIND: &'static str = "item";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "quantity",
        "notes",
        "price",
        "shopping_list_id",
        "item_category_id",
    ];
    const DEFAULT_INCLUDES: Includes = Includes::SHOPPING_LIST.union(Includes::CATEGORY);

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            "quantity" => self.quantity.into(),
            "notes" => self.notes.as_str().into(),
            "price" => self.price.into(),
            "shopping_list_id" => self.shopping_list_id.into(),
            "item_category_id" => self.item_category_id.into(),
            _ => return None,
        })
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), ValidationError> {
        match name {
            "name" => self.name = value.into_text(name)?,
            "quantity" => {
                let quantity = value.into_integer(name)?;
                self.quantity = i32::try_from(quantity).map_err(|_| ValidationError::Malformed {
                    field: "quantity",
                    expected: "32-bit integer",
                })?;
            }
            "notes" => self.notes = value.into_optional_text(name)?.unwrap_or_default(),
            "price" => self.price = value.into_decimal(name)?,
            "shopping_list_id" => self.shopping_list_id = value.into_uuid(name)?,
            "item_category_id" => self.item_category_id = value.into_uuid(name)?,
            "id" => return Err(ValidationError::ReadOnly(name.to_string())),
            _ => return Err(ValidationError::UnknownField(name.to_string())),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        max_chars("name", &self.name, NAME_MAX)?;
        max_chars("notes", &self.notes, NOTES_MAX)?;
        if self.quantity < MIN_QUANTITY {
            return Err(ValidationError::BelowMinimum {
                field: "quantity",
                min: MIN_QUANTITY.to_string(),
            });
        }
        if self.price < min_price() {
            return Err(ValidationError::BelowMinimum {
                field: "price",
                min: min_price().to_string(),
            });
        }
        Ok(())
    }

    fn clear_relations(&mut self) {
        self.category = None;
        self.shopping_list = None;
    }
}

/// A grouping for items (dairy, bakery, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCategory {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
}

impl ItemCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

impl Entity for ItemCategory {
    const KIND: &'static str = "item_category";
    const FIELDS: &'static [&'static str] = &["id", "name"];
    const DEFAULT_INCLUDES: Includes = Includes::NONE;

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), ValidationError> {
        match name {
            "name" => self.name = value.into_text(name)?,
            "id" => return Err(ValidationError::ReadOnly(name.to_string())),
            _ => return Err(ValidationError::UnknownField(name.to_string())),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        max_chars("name", &self.name, NAME_MAX)
    }

    fn clear_relations(&mut self) {
        self.items.clear();
    }
}

/// A list owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: Uuid,
    pub name: Option<String>,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl ShoppingList {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            name: None,
            user_id,
            items: Vec::new(),
            user: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

impl Entity for ShoppingList {
    const KIND: &'static str = "shopping_list";
    const FIELDS: &'static [&'static str] = &["id", "name", "user_id"];
    const DEFAULT_INCLUDES: Includes = Includes::ITEMS.union(Includes::USER);

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "user_id" => Some(self.user_id.into()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), ValidationError> {
        match name {
            "name" => self.name = value.into_optional_text(name)?,
            "user_id" => self.user_id = value.into_uuid(name)?,
            "id" => return Err(ValidationError::ReadOnly(name.to_string())),
            _ => return Err(ValidationError::UnknownField(name.to_string())),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => max_chars("name", name, NAME_MAX),
            None => Ok(()),
        }
    }

    fn clear_relations(&mut self) {
        self.items.clear();
        self.user = None;
    }
}

/// An account that owns shopping lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    /// Argon2 PHC string. Absent on records that came back from a client.
    /// Never serialized, so cached copies hold no credentials.
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(default = "default_image_name")]
    pub image_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shopping_lists: Vec<ShoppingList>,
}

fn default_image_name() -> String {
    DEFAULT_IMAGE_NAME.to_string()
}

impl User {
    pub fn new(user_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            user_name: user_name.into(),
            email: email.into(),
            password_hash: None,
            image_name: default_image_name(),
            shopping_lists: Vec::new(),
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// True while the user still has the placeholder avatar.
    pub fn has_default_image(&self) -> bool {
        self.image_name == DEFAULT_IMAGE_NAME
    }
}

impl Entity for User {
    const KIND: &'static str = "user";
    const FIELDS: &'static [&'static str] = &["id", "user_name", "email", "image_name"];
    const DEFAULT_INCLUDES: Includes = Includes::NONE;

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "user_name" => Some(self.user_name.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            "image_name" => Some(self.image_name.as_str().into()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), ValidationError> {
        match name {
            "user_name" => self.user_name = value.into_text(name)?,
            "email" => self.email = value.into_text(name)?,
            "image_name" => self.image_name = value.into_text(name)?,
            "id" => return Err(ValidationError::ReadOnly(name.to_string())),
            _ => return Err(ValidationError::UnknownField(name.to_string())),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("user_name", &self.user_name)?;
        max_chars("user_name", &self.user_name, USER_FIELD_MAX)?;
        require("email", &self.email)?;
        max_chars("email", &self.email, USER_FIELD_MAX)?;
        if !self.email.contains('@') {
            return Err(ValidationError::Malformed {
                field: "email",
                expected: "email address",
            });
        }
        require("image_name", &self.image_name)
    }

    fn clear_relations(&mut self) {
        self.shopping_lists.clear();
    }

    fn merge_for_update(mut self, existing: &Self) -> Self {
        if self.password_hash.is_none() {
            self.password_hash = existing.password_hash.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milk() -> Item {
        Item::new("Milk", 2, Decimal::new(350, 2), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_item_validates() {
        assert!(milk().validate().is_ok());
    }

    #[test]
    fn test_item_name_required() {
        let mut item = milk();
        item.name = String::new();
        assert_eq!(
            item.validate(),
            Err(ValidationError::Required { field: "name" })
        );
    }

    #[test]
    fn test_item_name_length_boundary() {
        let mut item = milk();
        item.name = "a".repeat(50);
        assert!(item.validate().is_ok());
        item.name.push('a');
        assert!(matches!(
            item.validate(),
            Err(ValidationError::TooLong { field: "name", .. })
        ));
    }

    #[test]
    fn test_item_notes_length() {
        let item = milk().with_notes("n".repeat(201));
        assert!(matches!(
            item.validate(),
            Err(ValidationError::TooLong { field: "notes", .. })
        ));
    }

    #[test]
    fn test_item_quantity_minimum() {
        let mut item = milk();
        item.quantity = 0;
        assert!(matches!(
            item.validate(),
            Err(ValidationError::BelowMinimum {
                field: "quantity",
                ..
            })
        ));
    }

    #[test]
    fn test_item_price_minimum() {
        let mut item = milk();
        item.price = Decimal::new(99, 2);
        assert!(item.validate().is_ok());
        item.price = Decimal::new(98, 2);
        assert!(matches!(
            item.validate(),
            Err(ValidationError::BelowMinimum { field: "price", .. })
        ));
    }

    #[test]
    fn test_item_set_field() {
        let mut item = milk();
        item.set_field("quantity", FieldValue::Integer(5)).unwrap();
        assert_eq!(item.quantity, 5);
        assert_eq!(
            item.set_field("id", FieldValue::Uuid(Uuid::nil())),
            Err(ValidationError::ReadOnly("id".to_string()))
        );
        assert_eq!(
            item.set_field("colour", FieldValue::Null),
            Err(ValidationError::UnknownField("colour".to_string()))
        );
    }

    #[test]
    fn test_item_fields_resolve() {
        let item = milk();
        for field in Item::FIELDS {
            assert!(item.field(field).is_some(), "field {field} should resolve");
        }
    }

    #[test]
    fn test_item_default_includes() {
        assert!(Item::DEFAULT_INCLUDES.contains(Includes::CATEGORY));
        assert!(Item::DEFAULT_INCLUDES.contains(Includes::SHOPPING_LIST));
        assert!(ShoppingList::DEFAULT_INCLUDES.contains(Includes::ITEMS | Includes::USER));
        assert!(ItemCategory::DEFAULT_INCLUDES.is_empty());
        assert!(User::DEFAULT_INCLUDES.is_empty());
    }

    #[test]
    fn test_shopping_list_name_is_optional() {
        let list = ShoppingList::new(Uuid::new_v4());
        assert!(list.validate().is_ok());
        assert_eq!(list.field("name"), Some(FieldValue::Null));

        let list = list.with_name("x".repeat(51));
        assert!(list.validate().is_err());
    }

    #[test]
    fn test_user_email_must_contain_at() {
        let user = User::new("bob", "bob.example.com");
        assert!(matches!(
            user.validate(),
            Err(ValidationError::Malformed { field: "email", .. })
        ));
    }

    #[test]
    fn test_user_defaults_image() {
        let user = User::new("bob", "bob@example.com");
        assert!(user.has_default_image());
        assert_eq!(user.image_name, DEFAULT_IMAGE_NAME);
    }

    #[test]
    fn test_user_merge_keeps_stored_password() {
        let stored = User::new("bob", "bob@example.com").with_password_hash("$argon2id$...");
        let incoming = User::new("bobby", "bob@example.com");

        let merged = incoming.merge_for_update(&stored);
        assert_eq!(merged.user_name, "bobby");
        assert_eq!(merged.password_hash.as_deref(), Some("$argon2id$..."));
    }

    #[test]
    fn test_user_merge_prefers_new_password() {
        let stored = User::new("bob", "bob@example.com").with_password_hash("old");
        let incoming = User::new("bob", "bob@example.com").with_password_hash("new");

        assert_eq!(
            incoming.merge_for_update(&stored).password_hash.as_deref(),
            Some("new")
        );
    }

    #[test]
    fn test_clear_relations() {
        let category = ItemCategory::new("Dairy").with_id(Uuid::new_v4());
        let mut item = milk();
        item.category = Some(category);
        item.clear_relations();
        assert!(item.category.is_none());
        assert!(item.category_name().is_none());
    }

    #[test]
    fn test_user_deserialize_defaults_image() {
        let json = r#"{"id":"00000000-0000-0000-0000-000000000000","userName":"a","email":"a@b.c"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.image_name, DEFAULT_IMAGE_NAME);
        assert!(user.password_hash.is_none());
    }
}
