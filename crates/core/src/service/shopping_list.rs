use uuid::Uuid;

use crate::entity::{Filter, Includes, Item, ItemCategory, ShoppingList, User};
use crate::storage::{Repository, Result};

use super::{
    FromEntity, GenericService, ItemCategoryRequest, ItemCategoryResponse, ItemRequest,
    ItemResponse, ShoppingListRequest, ShoppingListResponse, UserRequest, UserResponse,
};

pub type ItemService<R> = GenericService<Item, ItemRequest, ItemResponse, R>;

pub type CategoryService<R> =
    GenericService<ItemCategory, ItemCategoryRequest, ItemCategoryResponse, R>;

pub type ShoppingListService<R> =
    GenericService<ShoppingList, ShoppingListRequest, ShoppingListResponse, R>;

pub type UserService<R> = GenericService<User, UserRequest, UserResponse, R>;

impl<R> GenericService<ShoppingList, ShoppingListRequest, ShoppingListResponse, R>
where
    R: Repository<ShoppingList>,
{
    /// Every list owned by `user_id`. Not paginated.
    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<Vec<ShoppingListResponse>> {
        let lists = self
            .repository()
            .get_where(Some(Filter::eq("user_id", user_id)), Includes::NONE, false)
            .await?;
        Ok(lists
            .into_iter()
            .map(ShoppingListResponse::from_entity)
            .collect())
    }
}
