use crate::menu::repo_types::{Menu, MenuItem};
use crate::storage::{self, Collection, DocumentStore, StoreError};

/// Key of the single menu record in the `pizzaMenu` collection.
pub const MENU_KEY: &str = "menu";

impl Menu {
    pub async fn load(store: &dyn DocumentStore) -> Result<Option<Menu>, StoreError> {
        storage::load(store, Collection::PizzaMenu, MENU_KEY).await
    }
}

pub fn default_menu() -> Menu {
    let item = |name: &str, description: &str, price: f64| MenuItem {
        name: name.into(),
        description: description.into(),
        price,
    };
    Menu {
        items: vec![
            item("Margherita", "Tomato, mozzarella, fresh basil", 8.5),
            item("Marinara", "Tomato, garlic, oregano, olive oil", 7.0),
            item("Pepperoni", "Tomato, mozzarella, spicy pepperoni", 10.0),
            item("Quattro Formaggi", "Mozzarella, gorgonzola, parmesan, fontina", 11.5),
            item("Capricciosa", "Tomato, mozzarella, ham, mushrooms, artichokes, olives", 12.0),
        ],
    }
}

/// Writes [`default_menu`] unless a menu already exists. Returns whether it wrote.
pub async fn seed_default(store: &dyn DocumentStore) -> Result<bool, StoreError> {
    match storage::insert(store, Collection::PizzaMenu, MENU_KEY, &default_menu()).await {
        Ok(()) => Ok(true),
        Err(StoreError::AlreadyExists { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
