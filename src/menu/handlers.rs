use axum::extract::FromRef;
use tracing::{info, instrument};

use crate::{
    auth::services::TokenService,
    dispatch::{Operation, Reply, RequestContext},
    error::ApiError,
    menu::repo_types::Menu,
    state::AppState,
};

/// The menu is read-only; writes are not offered.
pub async fn handle(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    match ctx.operation {
        Operation::Read => get_menu(state, ctx).await,
        Operation::Create | Operation::Update | Operation::Delete => Err(ApiError::Unavailable),
    }
}

/// GET /pizzaMenu  (any live token)
#[instrument(skip(state, ctx))]
pub async fn get_menu(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    if !TokenService::from_ref(state).is_active(ctx.token()).await {
        return Err(ApiError::Forbidden);
    }
    match Menu::load(state.store.as_ref()).await {
        Ok(Some(menu)) => {
            info!(items = menu.items.len(), "menu served");
            Reply::json(menu)
        }
        Ok(None) => Err(ApiError::not_found("The menu is not available.")),
        Err(e) => Err(ApiError::store(e, "Could not read the menu.")),
    }
}
