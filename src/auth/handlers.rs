use axum::extract::FromRef;
use tracing::{info, instrument, warn};

use crate::{
    auth::services::{TokenError, TokenService},
    dispatch::{Operation, Reply, RequestContext},
    error::ApiError,
    state::AppState,
    users::repo_types::User,
    validate,
};

pub async fn handle(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    match ctx.operation {
        Operation::Create => login(state, ctx).await,
        Operation::Read => get_token(state, ctx).await,
        Operation::Update => extend(state, ctx).await,
        Operation::Delete => revoke(state, ctx).await,
    }
}

/// POST /tokens { email, password }
#[instrument(skip(state, ctx))]
pub async fn login(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let email = validate::email(ctx.body_str("email"));
    let password = validate::password(ctx.body_str("password"));
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::validation("Missing required field(s)."));
    };

    let user = match User::find(state.store.as_ref(), &email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%email, "login unknown email");
            return Err(ApiError::validation("Could not find the specified user."));
        }
        Err(e) => return Err(ApiError::store(e, "Could not look up the user.")),
    };

    let tokens = TokenService::from_ref(state);
    if !tokens.password_matches(&password, &user.hashed_password) {
        warn!(%email, "login invalid password");
        return Err(ApiError::validation(
            "Password did not match the specified user's password.",
        ));
    }

    let token = tokens
        .issue(&email)
        .await
        .map_err(|e| ApiError::store(e, "Could not create new token."))?;

    info!(%email, token_id = %token.id, "user logged in");
    Reply::json(token)
}

/// GET /tokens?id=
///
/// Token metadata is readable by anyone holding the id.
#[instrument(skip(state, ctx))]
pub async fn get_token(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(id) = validate::fixed_id(ctx.query_str("id")) else {
        return Err(ApiError::validation("Missing required field."));
    };

    match TokenService::from_ref(state).lookup(&id).await {
        Ok(Some(token)) => Reply::json(token),
        Ok(None) => Err(ApiError::not_found("Token not found.")),
        Err(e) => Err(ApiError::store(e, "Could not read the token.")),
    }
}

/// PUT /tokens { id, extend: true }
#[instrument(skip(state, ctx))]
pub async fn extend(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let id = validate::fixed_id(ctx.body_str("id"));
    let extend = validate::extend_flag(ctx.body_value("extend"));
    let (Some(id), true) = (id, extend) else {
        return Err(ApiError::validation(
            "Missing required fields or fields are invalid.",
        ));
    };

    match TokenService::from_ref(state).extend(&id).await {
        Ok(token) => {
            info!(token_id = %token.id, expires = token.expires, "token extended");
            Ok(Reply::ok())
        }
        Err(TokenError::NotFound) => Err(ApiError::not_found("Specified token does not exist.")),
        Err(TokenError::Expired) => {
            warn!(token_id = %id, "extend on expired token");
            Err(ApiError::validation(
                "The token has already expired and cannot be extended.",
            ))
        }
        Err(TokenError::Store(e)) => Err(ApiError::store(
            e,
            "Could not update the token's expiration.",
        )),
    }
}

/// DELETE /tokens?id=
///
/// No ownership check: holding the id is enough to revoke it.
#[instrument(skip(state, ctx))]
pub async fn revoke(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(id) = validate::fixed_id(ctx.query_str("id")) else {
        return Err(ApiError::validation("Missing required field."));
    };

    match TokenService::from_ref(state).revoke(&id).await {
        Ok(()) => {
            info!(token_id = %id, "token revoked");
            Ok(Reply::ok())
        }
        Err(e) if e.is_not_found() => {
            Err(ApiError::not_found("Could not find the specified token."))
        }
        Err(e) => Err(ApiError::store(e, "Could not delete specified token.")),
    }
}
