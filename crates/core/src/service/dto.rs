use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub name: String,
    pub quantity: i32,
    #[serde(default)]
    pub notes: Option<String>,
    pub price: Decimal,
    pub shopping_list_id: Uuid,
    pub item_category_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    #[serde(default)]
    pub notes: String,
    pub price: Decimal,
    /// Name of the item's category, when the category was loaded.
    #[serde(default)]
    pub category_name: Option<String>,
    pub shopping_list_id: Uuid,
    pub item_category_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCategoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCategoryResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListResponse {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub user_id: Uuid,
    #[serde(default)]
    pub items: Vec<ItemResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub user_name: String,
    pub email: String,
    #[serde(default)]
    pub image_name: Option<String>,
}

/// Public view of a user. Credentials never leave the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub image_name: String,
}

/// Envelope for one page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub entities: Vec<T>,
    /// Number of rows in the store, not in this page.
    pub total_count: u64,
    pub limit: i64,
    pub skip: i64,
    pub next_link: Option<String>,
}

impl<T> PaginatedResponse<T> {
    /// `skip` for the following page, or `None` when this page reaches the end.
    pub fn next_skip(&self) -> Option<i64> {
        let next = self.skip.checked_add(self.entities.len() as i64)?;
        if self.entities.is_empty() || next < 0 || next as u64 >= self.total_count {
            return None;
        }
        Some(next)
    }

    pub fn with_next_link(mut self, link: Option<String>) -> Self {
        self.next_link = link;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(skip: i64, len: usize, total: u64) -> PaginatedResponse<u32> {
        PaginatedResponse {
            entities: vec![0; len],
            total_count: total,
            limit: 10,
            skip,
            next_link: None,
        }
    }

    #[test]
    fn test_next_skip_when_more_rows() {
        assert_eq!(page(0, 10, 25).next_skip(), Some(10));
        assert_eq!(page(10, 10, 25).next_skip(), Some(20));
    }

    #[test]
    fn test_next_skip_at_end() {
        assert_eq!(page(20, 5, 25).next_skip(), None);
        assert_eq!(page(0, 0, 0).next_skip(), None);
        assert_eq!(page(30, 0, 25).next_skip(), None);
    }

    #[test]
    fn test_envelope_wire_shape() {
        let json = serde_json::to_value(page(0, 1, 1)).unwrap();
        assert!(json.get("entities").is_some());
        assert!(json.get("totalCount").is_some());
        assert!(json.get("nextLink").is_some());
        assert_eq!(json["skip"], 0);
        assert_eq!(json["limit"], 10);
    }

    #[test]
    fn test_item_request_notes_optional() {
        let json = r#"{
            "name": "Milk",
            "quantity": 2,
            "price": "3.50",
            "shoppingListId": "00000000-0000-0000-0000-000000000001",
            "itemCategoryId": "00000000-0000-0000-0000-000000000002"
        }"#;
        let request: ItemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.notes, None);
        assert_eq!(request.price, Decimal::new(350, 2));
    }

    #[test]
    fn test_user_response_has_no_credentials() {
        let response = UserResponse {
            id: Uuid::nil(),
            user_name: "bob".to_string(),
            email: "bob@example.com".to_string(),
            image_name: "Default.jpg".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.to_lowercase().contains("password"));
    }
}
