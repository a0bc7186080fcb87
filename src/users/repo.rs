use crate::storage::{self, Collection, DocumentStore, StoreError};
use crate::users::repo_types::User;

impl User {
    /// Find a user by email (exact, case-sensitive).
    pub async fn find(store: &dyn DocumentStore, email: &str) -> Result<Option<User>, StoreError> {
        storage::load(store, Collection::Users, email).await
    }

    /// Create a new user; fails with `AlreadyExists` if the email is taken.
    pub async fn insert(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        storage::insert(store, Collection::Users, &self.email, self).await
    }

    pub async fn save(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        storage::replace(store, Collection::Users, &self.email, self).await
    }

    pub async fn remove(store: &dyn DocumentStore, email: &str) -> Result<(), StoreError> {
        store.delete(Collection::Users, email).await
    }
}
