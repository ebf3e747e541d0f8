//! Services bridge wire-level request/response shapes and entities.

mod dto;
mod generic;
mod mapping;
mod shopping_list;

pub use dto::{
    ItemCategoryRequest, ItemCategoryResponse, ItemRequest, ItemResponse, PaginatedResponse,
    ShoppingListRequest, ShoppingListResponse, UserRequest, UserResponse,
};
pub use generic::GenericService;
pub use mapping::{FromEntity, IntoEntity, ToEntity};
pub use shopping_list::{CategoryService, ItemService, ShoppingListService, UserService};
