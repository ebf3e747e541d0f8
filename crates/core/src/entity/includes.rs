use std::fmt;
use std::ops::BitOr;

/// Set of navigation relations to load alongside an entity.
///
/// Each entity type has a fixed default set (see [`crate::entity::Entity::DEFAULT_INCLUDES`]);
/// callers can ask for more by passing extra relations, which are unioned
/// with the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Includes(u8);

impl Includes {
    pub const NONE: Self = Self(0);
    /// `Item.category`
    pub const CATEGORY: Self = Self(1);
    /// `Item.shopping_list`
    pub const SHOPPING_LIST: Self = Self(1 << 1);
    /// `ShoppingList.items` / `ItemCategory.items`
    pub const ITEMS: Self = Self(1 << 2);
    /// `ShoppingList.user`
    pub const USER: Self = Self(1 << 3);
    /// `User.shopping_lists`
    pub const SHOPPING_LISTS: Self = Self(1 << 4);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Includes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for Includes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Includes, &str); 5] = [
            (Includes::CATEGORY, "category"),
            (Includes::SHOPPING_LIST, "shopping_list"),
            (Includes::ITEMS, "items"),
            (Includes::USER, "user"),
            (Includes::SHOPPING_LISTS, "shopping_lists"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}
