use crate::auth::repo_types::Token;
use crate::storage::{self, Collection, DocumentStore, StoreError};

impl Token {
    /// Find a token by id.
    pub async fn find(store: &dyn DocumentStore, id: &str) -> Result<Option<Token>, StoreError> {
        storage::load(store, Collection::Tokens, id).await
    }

    /// Persist a freshly issued token.
    pub async fn insert(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        storage::insert(store, Collection::Tokens, &self.id, self).await
    }

    pub async fn save(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        storage::replace(store, Collection::Tokens, &self.id, self).await
    }

    pub async fn remove(store: &dyn DocumentStore, id: &str) -> Result<(), StoreError> {
        store.delete(Collection::Tokens, id).await
    }
}
