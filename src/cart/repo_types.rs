use serde::{Deserialize, Serialize};

/// One line in a user's cart, keyed by `id` in the `cart` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub email: String, // owner
    pub item_id: u64,  // position in the menu
    pub quantity: u32,
}
