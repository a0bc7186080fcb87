use crate::cart::repo_types::CartItem;
use crate::storage::{self, Collection, DocumentStore, StoreError};

impl CartItem {
    pub async fn find(store: &dyn DocumentStore, id: &str) -> Result<Option<CartItem>, StoreError> {
        storage::load(store, Collection::Cart, id).await
    }

    pub async fn insert(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        storage::insert(store, Collection::Cart, &self.id, self).await
    }

    pub async fn save(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        storage::replace(store, Collection::Cart, &self.id, self).await
    }

    pub async fn remove(store: &dyn DocumentStore, id: &str) -> Result<(), StoreError> {
        store.delete(Collection::Cart, id).await
    }
}
