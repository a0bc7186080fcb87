use std::collections::HashMap;

use axum::{
    extract::{rejection::BytesRejection, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::{auth, cart, checkout, error::ApiError, menu, state::AppState, users};

/// The closed set of operations a resource can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::POST => Some(Operation::Create),
            Method::GET => Some(Operation::Read),
            Method::PUT => Some(Operation::Update),
            Method::DELETE => Some(Operation::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Tokens,
    PizzaMenu,
    ShoppingCart,
    CheckOut,
}

impl Resource {
    /// Route table, keyed by the path with surrounding slashes removed.
    pub fn from_path(trimmed: &str) -> Option<Self> {
        match trimmed {
            "users" => Some(Resource::Users),
            "tokens" => Some(Resource::Tokens),
            "pizzaMenu" => Some(Resource::PizzaMenu),
            "shoppingCart" => Some(Resource::ShoppingCart),
            "checkOut" => Some(Resource::CheckOut),
            _ => None,
        }
    }
}

pub fn trim_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Everything a handler may look at, fixed before the handler runs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub operation: Operation,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub payload: Map<String, Value>,
}

impl RequestContext {
    pub fn query_str(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn body_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn body_value(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Bearer token from the `token` header.
    pub fn token(&self) -> Option<&str> {
        self.headers.get("token").and_then(|v| v.to_str().ok())
    }
}

/// Empty, malformed and non-object bodies all read as `{}`.
pub fn parse_payload(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Successful handler outcome; serialized as JSON by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: Value::Object(Map::new()),
        }
    }

    pub fn json(body: impl serde::Serialize) -> Result<Self, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Internal(format!("could not encode response: {e}")))?;
        Ok(Self::with_status(StatusCode::OK, body))
    }

    pub fn with_status(status: StatusCode, body: Value) -> Self {
        let body = if body.is_object() {
            body
        } else {
            Value::Object(Map::new())
        };
        Self { status, body }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Single entry point for every request: normalize, route, run, serialize.
#[instrument(skip(state, headers, body), fields(path = %uri.path()))]
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let path = trim_path(uri.path());
    let Some(resource) = Resource::from_path(path) else {
        debug!(%path, "no route");
        return ApiError::not_found("Not found.").into_response();
    };
    let Some(operation) = Operation::from_method(&method) else {
        return ApiError::MethodNotAllowed.into_response();
    };

    let query = Query::<HashMap<String, String>>::try_from_uri(&uri)
        .map(|Query(q)| q)
        .unwrap_or_default();
    // An unreadable body (over the size limit, aborted) reads as `{}` like a malformed one.
    let payload = match body {
        Ok(body) => parse_payload(&body),
        Err(e) => {
            warn!(status = %e.status(), error = %e, "request body dropped");
            Map::new()
        }
    };
    let ctx = RequestContext {
        operation,
        query,
        headers,
        payload,
    };
    debug!(?resource, ?operation, "dispatching");

    let outcome = match resource {
        Resource::Users => users::handlers::handle(&state, &ctx).await,
        Resource::Tokens => auth::handlers::handle(&state, &ctx).await,
        Resource::PizzaMenu => menu::handlers::handle(&state, &ctx).await,
        Resource::ShoppingCart => cart::handlers::handle(&state, &ctx).await,
        Resource::CheckOut => checkout::handlers::handle(&state, &ctx).await,
    };
    match outcome {
        Ok(reply) => reply.into_response(),
        Err(err) => err.into_response(),
    }
}
