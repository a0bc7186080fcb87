use axum::{extract::FromRef, http::StatusCode};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::services::TokenService,
    cart::{dto::CartItemView, repo_types::CartItem},
    dispatch::{Operation, Reply, RequestContext},
    error::ApiError,
    menu::repo_types::Menu,
    state::AppState,
    storage::new_record_id,
    users::repo_types::User,
    validate,
};

pub async fn handle(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    match ctx.operation {
        Operation::Create => add_item(state, ctx).await,
        Operation::Read => get_item(state, ctx).await,
        Operation::Update => update_item(state, ctx).await,
        Operation::Delete => delete_item(state, ctx).await,
    }
}

/// Loads a cart item and checks the caller holds a token for its owner.
async fn owned_item(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
    missing: &str,
) -> Result<CartItem, ApiError> {
    let item = match CartItem::find(state.store.as_ref(), id).await {
        Ok(Some(item)) => item,
        Ok(None) => return Err(ApiError::not_found(missing)),
        Err(e) => return Err(ApiError::store(e, "Could not read the cart.")),
    };
    if !TokenService::from_ref(state).verify(ctx.token(), &item.email).await {
        return Err(ApiError::Forbidden);
    }
    Ok(item)
}

async fn load_menu(state: &AppState) -> Result<Menu, ApiError> {
    match Menu::load(state.store.as_ref()).await {
        Ok(Some(menu)) => Ok(menu),
        Ok(None) => Err(ApiError::not_found("The menu is not available.")),
        Err(e) => Err(ApiError::store(e, "Could not read the menu.")),
    }
}

/// POST /shoppingCart { email, itemId, quantity }
///
/// Writes the cart item, then appends its id to the user. If the second
/// write fails the cart item is left in place and the error is reported.
#[instrument(skip(state, ctx))]
pub async fn add_item(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let email = validate::email(ctx.body_str("email"));
    let item_id = validate::item_id(ctx.body_value("itemId"));
    let quantity = validate::quantity(ctx.body_value("quantity"));
    let (Some(email), Some(item_id), Some(quantity)) = (email, item_id, quantity) else {
        return Err(ApiError::validation("Missing required field."));
    };

    if !TokenService::from_ref(state).verify(ctx.token(), &email).await {
        return Err(ApiError::Forbidden);
    }

    let store = state.store.as_ref();
    let mut user = match User::find(store, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err(ApiError::not_found("The specified user does not exist.")),
        Err(e) => return Err(ApiError::store(e, "Could not read the user.")),
    };

    if load_menu(state).await?.item(item_id).is_none() {
        return Err(ApiError::validation("The specified menu item does not exist."));
    }

    let max = state.config.max_cart_items;
    if user.cart_item_ids.len() >= max {
        warn!(%email, max, "cart is full");
        return Err(ApiError::Conflict(format!(
            "Maximum number of cart items reached ({max}). Checkout or delete them to add items."
        )));
    }

    let item = CartItem {
        id: new_record_id(),
        email: email.clone(),
        item_id,
        quantity,
    };
    item.insert(store)
        .await
        .map_err(|e| ApiError::store(e, "Could not create new cart."))?;

    user.cart_item_ids.push(item.id.clone());
    if let Err(e) = user.save(store).await {
        error!(error = %e, %email, cart_id = %item.id, "cart item created but user not updated");
        return Err(ApiError::consistency(
            "Could not update user with the new cart item.",
        ));
    }

    info!(%email, cart_id = %item.id, item_id, quantity, "cart item added");
    Reply::json(item)
}

/// GET /shoppingCart?id=  (token for the item's owner)
#[instrument(skip(state, ctx))]
pub async fn get_item(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(id) = validate::fixed_id(ctx.query_str("id")) else {
        return Err(ApiError::validation("Missing required field."));
    };
    let item = owned_item(state, ctx, &id, "The specified cart ID does not exist.").await?;

    let menu = load_menu(state).await?;
    let Some(menu_item) = menu.item(item.item_id) else {
        error!(cart_id = %item.id, item_id = item.item_id, "cart item refers to missing menu entry");
        return Err(ApiError::not_found("The menu item for this cart entry no longer exists."));
    };
    Reply::json(CartItemView::new(item, menu_item))
}

/// PUT /shoppingCart { id, quantity }  (token for the item's owner)
#[instrument(skip(state, ctx))]
pub async fn update_item(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(id) = validate::fixed_id(ctx.body_str("id")) else {
        return Err(ApiError::validation("Missing required fields."));
    };
    let Some(quantity) = validate::quantity(ctx.body_value("quantity")) else {
        return Err(ApiError::validation("Missing fields to update."));
    };
    let mut item = owned_item(state, ctx, &id, "Cart ID does not exist.").await?;

    if item.quantity == quantity {
        return Ok(Reply::with_status(
            StatusCode::ACCEPTED,
            json!({ "Info": "No changes made." }),
        ));
    }

    item.quantity = quantity;
    item.save(state.store.as_ref())
        .await
        .map_err(|e| ApiError::store(e, "Could not update the cart."))?;
    info!(cart_id = %item.id, quantity, "cart item updated");
    Reply::json(item)
}

/// DELETE /shoppingCart?id=  (token for the item's owner)
///
/// Deletes the cart item, then removes its id from the owner. An id missing
/// from the owner's list is reported as an inconsistency.
#[instrument(skip(state, ctx))]
pub async fn delete_item(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(id) = validate::fixed_id(ctx.query_str("id")) else {
        return Err(ApiError::validation("Missing required field."));
    };
    let item = owned_item(state, ctx, &id, "The specified cart ID does not exist.").await?;

    let store = state.store.as_ref();
    CartItem::remove(store, &item.id)
        .await
        .map_err(|e| ApiError::store(e, "Could not delete the cart data."))?;

    let mut user = match User::find(store, &item.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return Err(ApiError::consistency(
                "Could not find the user who created the cart, \
                 so could not remove the cart data on the user object.",
            ))
        }
        Err(e) => return Err(ApiError::store(e, "Could not update the user.")),
    };

    let Some(pos) = user.cart_item_ids.iter().position(|c| *c == item.id) else {
        return Err(ApiError::consistency(
            "Could not find the cart data on the user's object, so could not remove it.",
        ));
    };
    user.cart_item_ids.remove(pos);
    if let Err(e) = user.save(store).await {
        error!(error = %e, email = %item.email, cart_id = %item.id, "cart item deleted but user not updated");
        return Err(ApiError::consistency("Could not update the user."));
    }

    info!(cart_id = %item.id, email = %item.email, "cart item deleted");
    Ok(Reply::ok())
}
