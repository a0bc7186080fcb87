use serde::Serialize;

use crate::cart::repo_types::CartItem;
use crate::menu::repo_types::MenuItem;

/// Cart line priced against the menu.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: String,
    pub email: String,
    pub item_id: u64,
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
}

pub fn line_total(unit_price: f64, quantity: u32) -> f64 {
    (unit_price * f64::from(quantity) * 100.0).round() / 100.0
}

impl CartItemView {
    pub fn new(item: CartItem, menu_item: &MenuItem) -> Self {
        Self {
            total: line_total(menu_item.price, item.quantity),
            id: item.id,
            email: item.email,
            item_id: item.item_id,
            name: menu_item.name.clone(),
            description: menu_item.description.clone(),
            quantity: item.quantity,
            unit_price: menu_item.price,
        }
    }
}
