//! Per-entity table access, constraints and relation loading.

use uuid::Uuid;

use shoplist_core::entity::{Entity, Includes, Item, ItemCategory, ShoppingList, User};
use shoplist_core::storage::{RepositoryError, Result};

#[derive(Debug, Clone, Default)]
pub(super) struct Tables {
    pub categories: Vec<ItemCategory>,
    pub lists: Vec<ShoppingList>,
    pub items: Vec<Item>,
    pub users: Vec<User>,
}

/// An entity stored in [`Tables`].
pub(super) trait MemoryTable: Entity {
    fn rows(tables: &Tables) -> &Vec<Self>;

    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self>;

    /// Foreign key and uniqueness checks for a row about to be written.
    fn check_row(&self, tables: &Tables) -> Result<()>;

    /// Removes the rows of other tables that depend on `id`.
    fn cascade(tables: &mut Tables, id: Uuid);

    fn load(&mut self, tables: &Tables, includes: Includes);
}

fn missing_reference(kind: &str, field: &str, id: Uuid) -> RepositoryError {
    RepositoryError::InvalidData(format!(
        "Foreign key constraint violation for {kind}: {field} {id} does not exist"
    ))
}

fn plain<E: Entity>(row: &E) -> E {
    let mut row = row.clone();
    row.clear_relations();
    row
}

fn with_category(item: &Item, tables: &Tables) -> Item {
    let mut item = plain(item);
    item.load(tables, Includes::CATEGORY);
    item
}

impl MemoryTable for Item {
    fn rows(tables: &Tables) -> &Vec<Self> {
        &tables.items
    }

    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.items
    }

    fn check_row(&self, tables: &Tables) -> Result<()> {
        if !tables.lists.iter().any(|l| l.id == self.shopping_list_id) {
            return Err(missing_reference(
                Self::KIND,
                "shopping_list_id",
                self.shopping_list_id,
            ));
        }
        if !tables.categories.iter().any(|c| c.id == self.item_category_id) {
            return Err(missing_reference(
                Self::KIND,
                "item_category_id",
                self.item_category_id,
            ));
        }
        Ok(())
    }

    fn cascade(_tables: &mut Tables, _id: Uuid) {}

    fn load(&mut self, tables: &Tables, includes: Includes) {
        if includes.contains(Includes::CATEGORY) {
            self.category = tables
                .categories
                .iter()
                .find(|c| c.id == self.item_category_id)
                .map(plain);
        }
        if includes.contains(Includes::SHOPPING_LIST) {
            self.shopping_list = tables
                .lists
                .iter()
                .find(|l| l.id == self.shopping_list_id)
                .map(plain);
        }
    }
}

impl MemoryTable for ItemCategory {
    fn rows(tables: &Tables) -> &Vec<Self> {
        &tables.categories
    }

    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.categories
    }

    fn check_row(&self, _tables: &Tables) -> Result<()> {
        Ok(())
    }

    fn cascade(tables: &mut Tables, id: Uuid) {
        tables.items.retain(|i| i.item_category_id != id);
    }

    fn load(&mut self, tables: &Tables, includes: Includes) {
        if includes.contains(Includes::ITEMS) {
            self.items = tables
                .items
                .iter()
                .filter(|i| i.item_category_id == self.id)
                .map(plain)
                .collect();
        }
    }
}

impl MemoryTable for ShoppingList {
    fn rows(tables: &Tables) -> &Vec<Self> {
        &tables.lists
    }

    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.lists
    }

    fn check_row(&self, tables: &Tables) -> Result<()> {
        if !tables.users.iter().any(|u| u.id == self.user_id) {
            return Err(missing_reference(Self::KIND, "user_id", self.user_id));
        }
        Ok(())
    }

    fn cascade(tables: &mut Tables, id: Uuid) {
        tables.items.retain(|i| i.shopping_list_id != id);
    }

    fn load(&mut self, tables: &Tables, includes: Includes) {
        if includes.contains(Includes::ITEMS) {
            // Items of a list always carry their category
            self.items = tables
                .items
                .iter()
                .filter(|i| i.shopping_list_id == self.id)
                .map(|i| with_category(i, tables))
                .collect();
        }
        if includes.contains(Includes::USER) {
            self.user = tables.users.iter().find(|u| u.id == self.user_id).map(plain);
        }
    }
}

impl MemoryTable for User {
    fn rows(tables: &Tables) -> &Vec<Self> {
        &tables.users
    }

    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.users
    }

    fn check_row(&self, tables: &Tables) -> Result<()> {
        let email = self.email.to_lowercase();
        if tables
            .users
            .iter()
            .any(|u| u.id != self.id && u.email.to_lowercase() == email)
        {
            return Err(RepositoryError::AlreadyExists {
                entity_type: Self::KIND,
                id: self.email.clone(),
            });
        }
        Ok(())
    }

    fn cascade(tables: &mut Tables, id: Uuid) {
        let owned: Vec<Uuid> = tables
            .lists
            .iter()
            .filter(|l| l.user_id == id)
            .map(|l| l.id)
            .collect();
        tables.lists.retain(|l| l.user_id != id);
        for list_id in owned {
            ShoppingList::cascade(tables, list_id);
        }
    }

    fn load(&mut self, tables: &Tables, includes: Includes) {
        if includes.contains(Includes::SHOPPING_LISTS) {
            self.shopping_lists = tables
                .lists
                .iter()
                .filter(|l| l.user_id == self.id)
                .map(plain)
                .collect();
        }
    }
}
