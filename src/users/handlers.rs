use axum::extract::FromRef;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::services::TokenService,
    cart::repo_types::CartItem,
    dispatch::{Operation, Reply, RequestContext},
    error::ApiError,
    state::AppState,
    storage::StoreError,
    users::{dto::PublicUser, repo_types::User},
    validate,
};

pub async fn handle(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    match ctx.operation {
        Operation::Create => register(state, ctx).await,
        Operation::Read => get_user(state, ctx).await,
        Operation::Update => update_user(state, ctx).await,
        Operation::Delete => delete_user(state, ctx).await,
    }
}

/// POST /users { firstName, lastName, email, password, streetAddress }
#[instrument(skip(state, ctx))]
pub async fn register(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let first_name = validate::name(ctx.body_str("firstName"));
    let last_name = validate::name(ctx.body_str("lastName"));
    let email = validate::email(ctx.body_str("email"));
    let password = validate::password(ctx.body_str("password"));
    let street_address = validate::street_address(ctx.body_str("streetAddress"));
    let (Some(first_name), Some(last_name), Some(email), Some(password), Some(street_address)) =
        (first_name, last_name, email, password, street_address)
    else {
        return Err(ApiError::validation("Missing required fields."));
    };

    let store = state.store.as_ref();
    match User::find(store, &email).await {
        Ok(None) => {}
        Ok(Some(_)) => {
            warn!(%email, "email already registered");
            return Err(already_exists());
        }
        Err(e) => return Err(ApiError::store(e, "Could not create the new user.")),
    }

    let hashed_password = match TokenService::from_ref(state).hash(&password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(ApiError::Internal("Could not hash the user's password.".into()));
        }
    };

    let user = User {
        first_name,
        last_name,
        email,
        hashed_password,
        street_address,
        cart_item_ids: Vec::new(),
    };
    match user.insert(store).await {
        Ok(()) => {}
        // lost a race with a concurrent registration
        Err(StoreError::AlreadyExists { .. }) => return Err(already_exists()),
        Err(e) => return Err(ApiError::store(e, "Could not create the new user.")),
    }

    info!(email = %user.email, "user registered");
    Ok(Reply::ok())
}

fn already_exists() -> ApiError {
    ApiError::Conflict("A user with that email address already exists.".into())
}

/// GET /users?email=  (token for that email required)
#[instrument(skip(state, ctx))]
pub async fn get_user(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(email) = validate::email(ctx.query_str("email")) else {
        return Err(ApiError::validation("Missing required field."));
    };
    if !TokenService::from_ref(state).verify(ctx.token(), &email).await {
        return Err(ApiError::Forbidden);
    }

    match User::find(state.store.as_ref(), &email).await {
        Ok(Some(user)) => Reply::json(PublicUser::from(user)),
        Ok(None) => Err(ApiError::not_found("The specified user does not exist.")),
        Err(e) => Err(ApiError::store(e, "Could not read the user.")),
    }
}

/// PUT /users { email, firstName?, lastName?, password?, streetAddress? }
#[instrument(skip(state, ctx))]
pub async fn update_user(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(email) = validate::email(ctx.body_str("email")) else {
        return Err(ApiError::validation("Missing required field."));
    };
    let first_name = validate::name(ctx.body_str("firstName"));
    let last_name = validate::name(ctx.body_str("lastName"));
    let password = validate::password(ctx.body_str("password"));
    let street_address = validate::street_address(ctx.body_str("streetAddress"));
    if first_name.is_none() && last_name.is_none() && password.is_none() && street_address.is_none()
    {
        return Err(ApiError::validation("Missing fields to update."));
    }

    let tokens = TokenService::from_ref(state);
    if !tokens.verify(ctx.token(), &email).await {
        return Err(ApiError::Forbidden);
    }

    let store = state.store.as_ref();
    let mut user = match User::find(store, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err(ApiError::not_found("The specified user does not exist.")),
        Err(e) => return Err(ApiError::store(e, "Could not update the user.")),
    };

    if let Some(v) = first_name {
        user.first_name = v;
    }
    if let Some(v) = last_name {
        user.last_name = v;
    }
    if let Some(v) = street_address {
        user.street_address = v;
    }
    if let Some(v) = password {
        user.hashed_password = tokens.hash(&v).map_err(|e| {
            error!(error = %e, "hash_password failed");
            ApiError::Internal("Could not hash the user's password.".into())
        })?;
    }

    user.save(store)
        .await
        .map_err(|e| ApiError::store(e, "Could not update the user."))?;
    info!(%email, "user updated");
    Ok(Reply::ok())
}

/// DELETE /users?email=  (token for that email required)
///
/// Removes the user first, then each of their cart items. Cart items that
/// fail to delete are reported but the user stays deleted.
#[instrument(skip(state, ctx))]
pub async fn delete_user(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(email) = validate::email(ctx.query_str("email")) else {
        return Err(ApiError::validation("Missing required field."));
    };
    if !TokenService::from_ref(state).verify(ctx.token(), &email).await {
        return Err(ApiError::Forbidden);
    }

    let store = state.store.as_ref();
    let user = match User::find(store, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err(ApiError::not_found("Could not find the specified user.")),
        Err(e) => return Err(ApiError::store(e, "Could not delete specified user.")),
    };

    User::remove(store, &email)
        .await
        .map_err(|e| ApiError::store(e, "Could not delete specified user."))?;

    let mut failed = 0usize;
    for cart_id in &user.cart_item_ids {
        if let Err(e) = CartItem::remove(store, cart_id).await {
            error!(error = %e, %email, %cart_id, "cascade delete of cart item failed");
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(ApiError::consistency(
            "Errors encountered while attempting to delete the user's cart data. \
             All cart data may not have been deleted.",
        ));
    }

    info!(%email, cart_items = user.cart_item_ids.len(), "user deleted");
    Ok(Reply::ok())
}
