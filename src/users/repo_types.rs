use serde::{Deserialize, Serialize};

/// User record, keyed by `email` in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub hashed_password: String, // keyed digest, never returned to clients
    pub street_address: String,
    #[serde(default, alias = "cartItems")]
    pub cart_item_ids: Vec<String>, // ids in the `cart` collection, insertion order
}
