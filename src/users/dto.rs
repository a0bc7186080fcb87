use serde::Serialize;

use crate::users::repo_types::User;

/// User as returned to its owner: everything but the password digest.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub street_address: String,
    pub cart_item_ids: Vec<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            street_address: u.street_address,
            cart_item_ids: u.cart_item_ids,
        }
    }
}
