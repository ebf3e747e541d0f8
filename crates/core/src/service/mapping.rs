//! Field correspondences between DTOs and entities.
//!
//! One impl per (source, destination) pair, checked at compile time.

use crate::entity::{Item, ItemCategory, ShoppingList, User, DEFAULT_IMAGE_NAME};

use super::dto::{
    ItemCategoryRequest, ItemCategoryResponse, ItemRequest, ItemResponse, ShoppingListRequest,
    ShoppingListResponse, UserRequest, UserResponse,
};

/// Request shape → new entity (id left nil).
pub trait IntoEntity<E> {
    fn into_entity(self) -> E;
}

/// Entity → response shape.
pub trait FromEntity<E> {
    fn from_entity(entity: E) -> Self;
}

/// Response shape → entity keyed by the response id.
pub trait ToEntity<E> {
    fn to_entity(&self) -> E;
}

impl IntoEntity<Item> for ItemRequest {
    fn into_entity(self) -> Item {
        Item::new(
            self.name,
            self.quantity,
            self.price.round_dp(2),
            self.shopping_list_id,
            self.item_category_id,
        )
        .with_notes(self.notes.unwrap_or_default())
    }
}

impl FromEntity<Item> for ItemResponse {
    fn from_entity(item: Item) -> Self {
        let category_name = item.category_name().map(str::to_string);
        Self {
            id: item.id,
            name: item.name,
            quantity: item.quantity,
            notes: item.notes,
            price: item.price,
            category_name,
            shopping_list_id: item.shopping_list_id,
            item_category_id: item.item_category_id,
        }
    }
}

impl ToEntity<Item> for ItemResponse {
    fn to_entity(&self) -> Item {
        Item::new(
            self.name.clone(),
            self.quantity,
            self.price.round_dp(2),
            self.shopping_list_id,
            self.item_category_id,
        )
        .with_notes(self.notes.clone())
        .with_id(self.id)
    }
}

impl IntoEntity<ItemCategory> for ItemCategoryRequest {
    fn into_entity(self) -> ItemCategory {
        ItemCategory::new(self.name)
    }
}

impl FromEntity<ItemCategory> for ItemCategoryResponse {
    fn from_entity(category: ItemCategory) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

impl ToEntity<ItemCategory> for ItemCategoryResponse {
    fn to_entity(&self) -> ItemCategory {
        ItemCategory::new(self.name.clone()).with_id(self.id)
    }
}

impl IntoEntity<ShoppingList> for ShoppingListRequest {
    fn into_entity(self) -> ShoppingList {
        let mut list = ShoppingList::new(self.user_id);
        list.name = self.name;
        list
    }
}

impl FromEntity<ShoppingList> for ShoppingListResponse {
    fn from_entity(list: ShoppingList) -> Self {
        Self {
            id: list.id,
            name: list.name,
            user_id: list.user_id,
            items: list.items.into_iter().map(ItemResponse::from_entity).collect(),
        }
    }
}

impl ToEntity<ShoppingList> for ShoppingListResponse {
    fn to_entity(&self) -> ShoppingList {
        let mut list = ShoppingList::new(self.user_id).with_id(self.id);
        list.name = self.name.clone();
        list
    }
}

impl IntoEntity<User> for UserRequest {
    fn into_entity(self) -> User {
        let mut user = User::new(self.user_name, self.email);
        if let Some(image_name) = self.image_name {
            user.image_name = image_name;
        }
        user
    }
}

impl FromEntity<User> for UserResponse {
    fn from_entity(user: User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name,
            email: user.email,
            image_name: user.image_name,
        }
    }
}

impl ToEntity<User> for UserResponse {
    fn to_entity(&self) -> User {
        let mut user = User::new(self.user_name.clone(), self.email.clone()).with_id(self.id);
        user.image_name = if self.image_name.is_empty() {
            DEFAULT_IMAGE_NAME.to_string()
        } else {
            self.image_name.clone()
        };
        user
    }
}
