use std::sync::Arc;

use axum::extract::FromRef;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::auth::{password, repo_types::Token};
use crate::config::{AuthConfig, MAX_TOKEN_TTL_MINUTES};
use crate::state::AppState;
use crate::storage::{new_record_id, DocumentStore, StoreError};

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token not found")]
    NotFound,
    #[error("token already expired")]
    Expired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Password hashing plus the bearer-token lifecycle, configured from
/// [`AuthConfig`].
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn DocumentStore>,
    secret: String,
    ttl: Duration,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.store.clone(), &state.config.auth)
    }
}

impl TokenService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: &AuthConfig) -> Self {
        Self {
            store,
            secret: auth.hashing_secret.clone(),
            ttl: Duration::minutes(auth.token_ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES)),
        }
    }

    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.whole_milliseconds()).unwrap_or(i64::MAX)
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        password::hash_password(&self.secret, plain)
    }

    pub fn password_matches(&self, plain: &str, digest: &str) -> bool {
        password::verify_password(&self.secret, plain, digest)
    }

    pub async fn lookup(&self, id: &str) -> Result<Option<Token>, StoreError> {
        Token::find(self.store.as_ref(), id).await
    }

    pub async fn issue(&self, email: &str) -> Result<Token, StoreError> {
        let token = Token {
            id: new_record_id(),
            email: email.to_string(),
            expires: now_millis() + self.ttl_millis(),
        };
        token.insert(self.store.as_ref()).await?;
        debug!(token_id = %token.id, %email, "token issued");
        Ok(token)
    }

    /// Pushes expiry to now + TTL. An expired token is left untouched.
    pub async fn extend(&self, id: &str) -> Result<Token, TokenError> {
        let mut token = self.lookup(id).await?.ok_or(TokenError::NotFound)?;
        let now = now_millis();
        if !token.is_live_at(now) {
            return Err(TokenError::Expired);
        }
        token.expires = now + self.ttl_millis();
        token.save(self.store.as_ref()).await?;
        debug!(token_id = %token.id, expires = token.expires, "token extended");
        Ok(token)
    }

    pub async fn revoke(&self, id: &str) -> Result<(), StoreError> {
        Token::remove(self.store.as_ref(), id).await?;
        debug!(token_id = %id, "token revoked");
        Ok(())
    }

    /// True iff the token exists, belongs to `email` and has not expired.
    /// Lookup failures of any kind count as false.
    pub async fn verify(&self, token_id: Option<&str>, email: &str) -> bool {
        match self.live_token(token_id).await {
            Some(token) => token.email == email,
            None => false,
        }
    }

    /// True iff the token exists and has not expired, whoever owns it.
    pub async fn is_active(&self, token_id: Option<&str>) -> bool {
        self.live_token(token_id).await.is_some()
    }

    async fn live_token(&self, token_id: Option<&str>) -> Option<Token> {
        let id = token_id?.trim();
        match self.lookup(id).await {
            Ok(Some(token)) if token.is_live_at(now_millis()) => Some(token),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "token lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, RECORD_ID_LEN};
    use std::collections::HashSet;

    async fn service() -> (tempfile::TempDir, TokenService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let auth = AuthConfig {
            hashing_secret: "test-secret".into(),
            token_ttl_minutes: 60,
        };
        (dir, TokenService::new(store, &auth))
    }

    async fn plant_expired(svc: &TokenService, email: &str) -> Token {
        let token = Token {
            id: new_record_id(),
            email: email.into(),
            expires: now_millis() - 1_000,
        };
        token.insert(svc.store.as_ref()).await.unwrap();
        token
    }

    #[tokio::test]
    async fn issue_persists_token_with_one_hour_expiry() {
        let (_dir, svc) = service().await;
        let before = now_millis();
        let token = svc.issue("a@b.com").await.unwrap();
        let after = now_millis();

        assert_eq!(token.id.len(), RECORD_ID_LEN);
        assert_eq!(token.email, "a@b.com");
        assert!(token.expires >= before + 3_600_000);
        assert!(token.expires <= after + 3_600_000);
        assert_eq!(svc.lookup(&token.id).await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn issued_ids_do_not_collide() {
        let (_dir, svc) = service().await;
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let token = svc.issue("a@b.com").await.unwrap();
            assert!(seen.insert(token.id));
        }
    }

    #[tokio::test]
    async fn verify_accepts_owner_of_live_token() {
        let (_dir, svc) = service().await;
        let token = svc.issue("a@b.com").await.unwrap();
        assert!(svc.verify(Some(&token.id), "a@b.com").await);
        assert!(svc.is_active(Some(&token.id)).await);
    }

    #[tokio::test]
    async fn verify_rejects_unknown_foreign_and_expired() {
        let (_dir, svc) = service().await;
        let token = svc.issue("a@b.com").await.unwrap();
        let expired = plant_expired(&svc, "a@b.com").await;

        assert!(!svc.verify(Some("ZZZZZZZZZZZZZZZZZZZZ"), "a@b.com").await);
        assert!(!svc.verify(Some(&token.id), "other@b.com").await);
        assert!(!svc.verify(Some(&token.id), "A@b.com").await);
        assert!(!svc.verify(Some(&expired.id), "a@b.com").await);
        assert!(!svc.is_active(Some(&expired.id)).await);
    }

    #[tokio::test]
    async fn verify_never_errors_on_garbage_ids() {
        let (_dir, svc) = service().await;
        assert!(!svc.verify(None, "a@b.com").await);
        assert!(!svc.verify(Some(""), "a@b.com").await);
        assert!(!svc.verify(Some("../users/a@b.com"), "a@b.com").await);
        assert!(!svc.is_active(Some("..")).await);
    }

    #[tokio::test]
    async fn extend_resets_expiry_of_live_token() {
        let (_dir, svc) = service().await;
        let token = svc.issue("a@b.com").await.unwrap();
        let mut stored = token.clone();
        stored.expires = now_millis() + 5_000;
        stored.save(svc.store.as_ref()).await.unwrap();

        let before = now_millis();
        let extended = svc.extend(&token.id).await.unwrap();
        assert!(extended.expires >= before + 3_600_000);
        assert_eq!(svc.lookup(&token.id).await.unwrap(), Some(extended));
    }

    #[tokio::test]
    async fn extend_refuses_expired_token_without_touching_it() {
        let (_dir, svc) = service().await;
        let expired = plant_expired(&svc, "a@b.com").await;
        assert!(matches!(svc.extend(&expired.id).await, Err(TokenError::Expired)));
        assert_eq!(svc.lookup(&expired.id).await.unwrap(), Some(expired));
    }

    #[tokio::test]
    async fn extend_and_revoke_unknown_are_not_found() {
        let (_dir, svc) = service().await;
        assert!(matches!(
            svc.extend("ZZZZZZZZZZZZZZZZZZZZ").await,
            Err(TokenError::NotFound)
        ));
        assert!(svc
            .revoke("ZZZZZZZZZZZZZZZZZZZZ")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn revoked_token_no_longer_verifies() {
        let (_dir, svc) = service().await;
        let token = svc.issue("a@b.com").await.unwrap();
        svc.revoke(&token.id).await.unwrap();
        assert!(!svc.verify(Some(&token.id), "a@b.com").await);
    }

    #[tokio::test]
    async fn hashing_uses_configured_secret() {
        let (_dir, svc) = service().await;
        let digest = svc.hash("Passw0rd!x").unwrap();
        assert_eq!(digest, password::hash_password("test-secret", "Passw0rd!x").unwrap());
        assert!(svc.password_matches("Passw0rd!x", &digest));
    }

    #[tokio::test]
    async fn oversized_ttl_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let auth = AuthConfig {
            hashing_secret: "test-secret".into(),
            token_ttl_minutes: i64::MAX,
        };
        let svc = TokenService::new(store, &auth);
        assert_eq!(svc.ttl_millis(), MAX_TOKEN_TTL_MINUTES * 60 * 1000);
    }
}
