use axum::extract::FromRef;
use tracing::{error, info, instrument};

use crate::{
    auth::services::TokenService,
    cart::{dto::line_total, repo_types::CartItem},
    checkout::dto::{CheckoutOrder, OrderLine},
    dispatch::{Operation, Reply, RequestContext},
    error::ApiError,
    menu::repo_types::Menu,
    state::AppState,
    users::repo_types::User,
    validate,
};

pub async fn handle(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    match ctx.operation {
        Operation::Create => check_out(state, ctx).await,
        Operation::Read | Operation::Update | Operation::Delete => Err(ApiError::MethodNotAllowed),
    }
}

/// POST /checkOut { email }  (token for that email)
///
/// Prices the user's cart and passes it to the payment gateway. The cart is
/// left as is; clearing it is up to the caller once payment settles.
#[instrument(skip(state, ctx))]
pub async fn check_out(state: &AppState, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let Some(email) = validate::email(ctx.body_str("email")) else {
        return Err(ApiError::validation("Missing required field."));
    };
    if !TokenService::from_ref(state).verify(ctx.token(), &email).await {
        return Err(ApiError::Forbidden);
    }

    let order = build_order(state, &email).await?;
    let settlement = state.gateway.settle(&order).await.map_err(|e| {
        error!(error = %e, %email, "payment gateway failed");
        ApiError::Internal("Payment could not be processed.".into())
    })?;

    info!(%email, reference = %settlement.reference, amount = settlement.amount, "checked out");
    Reply::json(settlement)
}

async fn build_order(state: &AppState, email: &str) -> Result<CheckoutOrder, ApiError> {
    let store = state.store.as_ref();
    let user = match User::find(store, email).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err(ApiError::not_found("The specified user does not exist.")),
        Err(e) => return Err(ApiError::store(e, "Could not read the user.")),
    };
    if user.cart_item_ids.is_empty() {
        return Err(ApiError::validation("The shopping cart is empty."));
    }

    let menu = match Menu::load(store).await {
        Ok(Some(menu)) => menu,
        Ok(None) => return Err(ApiError::not_found("The menu is not available.")),
        Err(e) => return Err(ApiError::store(e, "Could not read the menu.")),
    };

    let mut lines = Vec::with_capacity(user.cart_item_ids.len());
    for cart_id in &user.cart_item_ids {
        let item = match CartItem::find(store, cart_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                return Err(ApiError::consistency(format!(
                    "Cart item {cart_id} is listed on the user but does not exist."
                )))
            }
            Err(e) => return Err(ApiError::store(e, "Could not read the cart.")),
        };
        let Some(menu_item) = menu.item(item.item_id) else {
            return Err(ApiError::validation(format!(
                "Cart item {cart_id} refers to a menu item that no longer exists."
            )));
        };
        lines.push(OrderLine {
            cart_id: item.id,
            item_id: item.item_id,
            name: menu_item.name.clone(),
            quantity: item.quantity,
            unit_price: menu_item.price,
            total: line_total(menu_item.price, item.quantity),
        });
    }

    let amount = (lines.iter().map(|l| l.total).sum::<f64>() * 100.0).round() / 100.0;
    Ok(CheckoutOrder {
        email: user.email,
        street_address: user.street_address,
        lines,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{storage::Collection, test_support::TestApp};

    #[tokio::test]
    async fn checkout_prices_cart_and_keeps_it() {
        let app = TestApp::new().await;
        let token = app.signed_up("pay@example.com").await;
        let first = app.add_to_cart(&token, "pay@example.com", 0, 2).await;
        app.add_to_cart(&token, "pay@example.com", 2, 1).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/checkOut",
                Some(&token),
                Some(json!({ "email": "pay@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["amount"], 27.0);
        assert_eq!(body["reference"].as_str().unwrap().len(), 20);

        assert!(app.record(Collection::Cart, &first).await.is_some());
    }

    #[tokio::test]
    async fn empty_cart_cannot_check_out() {
        let app = TestApp::new().await;
        let token = app.signed_up("empty@example.com").await;
        let (status, body) = app
            .send(
                Method::POST,
                "/checkOut",
                Some(&token),
                Some(json!({ "email": "empty@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["Error"], "The shopping cart is empty.");
    }

    #[tokio::test]
    async fn checkout_requires_owner_token_and_post() {
        let app = TestApp::new().await;
        app.register("victim@example.com").await;
        let token = app.signed_up("thief@example.com").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/checkOut",
                Some(&token),
                Some(json!({ "email": "victim@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send(Method::GET, "/checkOut", Some(&token), None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
