use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// The catalog; cart items refer to entries by position in `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub items: Vec<MenuItem>,
}

impl Menu {
    pub fn item(&self, item_id: u64) -> Option<&MenuItem> {
        usize::try_from(item_id).ok().and_then(|i| self.items.get(i))
    }
}
