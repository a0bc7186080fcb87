use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{
    app::build_app,
    auth::{repo_types::Token, services::now_millis},
    checkout::gateway::PendingSettlementGateway,
    config::{AppConfig, AuthConfig, Environment},
    menu,
    state::AppState,
    storage::{new_record_id, Collection, DocumentStore, FileStore, StoreError},
};

pub const PASSWORD: &str = "Sup3r$ecret";

/// File store that can be told to fail specific writes.
pub struct FlakyStore {
    inner: FileStore,
    failing_updates: Mutex<HashSet<Collection>>,
    failing_deletes: Mutex<HashSet<Collection>>,
}

impl FlakyStore {
    pub fn fail_updates(&self, collection: Collection) {
        self.failing_updates.lock().unwrap().insert(collection);
    }

    pub fn fail_deletes(&self, collection: Collection) {
        self.failing_deletes.lock().unwrap().insert(collection);
    }

    fn injected(set: &Mutex<HashSet<Collection>>, collection: Collection) -> Result<(), StoreError> {
        if set.lock().unwrap().contains(&collection) {
            return Err(StoreError::Io(std::io::Error::other("injected failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(&self, c: Collection, key: &str, value: &Value) -> Result<(), StoreError> {
        self.inner.create(c, key, value).await
    }

    async fn read(&self, c: Collection, key: &str) -> Result<Value, StoreError> {
        self.inner.read(c, key).await
    }

    async fn update(&self, c: Collection, key: &str, value: &Value) -> Result<(), StoreError> {
        Self::injected(&self.failing_updates, c)?;
        self.inner.update(c, key, value).await
    }

    async fn delete(&self, c: Collection, key: &str) -> Result<(), StoreError> {
        Self::injected(&self.failing_deletes, c)?;
        self.inner.delete(c, key).await
    }
}

pub struct TestApp {
    _dir: TempDir,
    pub state: AppState,
    pub router: Router,
    pub store: Arc<FlakyStore>,
}

pub fn test_config(data_dir: PathBuf) -> AppConfig {
    AppConfig {
        env: Environment::Staging,
        host: "127.0.0.1".into(),
        port: 0,
        data_dir,
        auth: AuthConfig {
            hashing_secret: "test-secret".into(),
            token_ttl_minutes: 60,
        },
        max_cart_items: 3,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(test_config(dir.path().to_path_buf()));
        let store = Arc::new(FlakyStore {
            inner: FileStore::open(dir.path()).await.unwrap(),
            failing_updates: Mutex::default(),
            failing_deletes: Mutex::default(),
        });
        menu::repo::seed_default(store.as_ref()).await.unwrap();

        let state = AppState::from_parts(
            config,
            store.clone(),
            Arc::new(PendingSettlementGateway),
        );
        let router = build_app(state.clone());
        Self {
            _dir: dir,
            state,
            router,
            store,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header("token", token);
        }
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        self.send_raw(req.body(body).unwrap()).await
    }

    pub async fn send_raw(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        assert_eq!(
            res.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json"),
        );
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn register(&self, email: &str) {
        let (status, body) = self
            .send(
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "firstName": "Test",
                    "lastName": "User",
                    "email": email,
                    "password": PASSWORD,
                    "streetAddress": "1 Test Street",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/tokens",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Registers and logs in; returns the token id.
    pub async fn signed_up(&self, email: &str) -> String {
        self.register(email).await;
        self.login(email).await
    }

    pub async fn add_to_cart(&self, token: &str, email: &str, item_id: u64, quantity: u32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/shoppingCart",
                Some(token),
                Some(json!({ "email": email, "itemId": item_id, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn plant_expired_token(&self, email: &str) -> Token {
        let token = Token {
            id: new_record_id(),
            email: email.into(),
            expires: now_millis() - 1,
        };
        token.insert(self.store.as_ref()).await.unwrap();
        token
    }

    pub async fn record(&self, collection: Collection, key: &str) -> Option<Value> {
        match self.store.read(collection, key).await {
            Ok(v) => Some(v),
            Err(e) if e.is_not_found() => None,
            Err(e) => panic!("read {collection}/{key}: {e}"),
        }
    }
}
