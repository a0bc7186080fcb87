use std::{
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Length of generated token and cart item keys.
pub const RECORD_ID_LEN: usize = 20;

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Fresh random key, uniform over `[A-Za-z0-9]`. Uniqueness is not checked.
pub fn new_record_id() -> String {
    random_string(RECORD_ID_LEN)
}

/// Named group of records; each maps to one directory under the data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Tokens,
    Cart,
    PizzaMenu,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Tokens,
        Collection::Cart,
        Collection::PizzaMenu,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Tokens => "tokens",
            Collection::Cart => "cart",
            Collection::PizzaMenu => "pizzaMenu",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {collection}/{key} already exists")]
    AlreadyExists { collection: Collection, key: String },
    #[error("record {collection}/{key} not found")]
    NotFound { collection: Collection, key: String },
    #[error("invalid record key {0:?}")]
    InvalidKey(String),
    #[error("record {collection}/{key} is not valid json: {source}")]
    Corrupt {
        collection: Collection,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Missing, or a key no record could ever be stored under.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::InvalidKey(_))
    }
}

/// CRUD over JSON records addressed by collection + key.
///
/// Operations on different keys are independent. Concurrent writers to the
/// same key are not coordinated: the last completed write wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, collection: Collection, key: &str, value: &Value)
        -> Result<(), StoreError>;
    async fn read(&self, collection: Collection, key: &str) -> Result<Value, StoreError>;
    async fn update(&self, collection: Collection, key: &str, value: &Value)
        -> Result<(), StoreError>;
    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;
}

/// Typed read; `Ok(None)` when the record does not exist.
pub async fn load<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.read(collection, key).await {
        Ok(raw) => serde_json::from_value(raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                collection,
                key: key.to_string(),
                source,
            }),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn insert<T: Serialize + ?Sized>(
    store: &dyn DocumentStore,
    collection: Collection,
    key: &str,
    record: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_value(record).map_err(StoreError::Encode)?;
    store.create(collection, key, &raw).await
}

pub async fn replace<T: Serialize + ?Sized>(
    store: &dyn DocumentStore,
    collection: Collection,
    key: &str,
    record: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_value(record).map_err(StoreError::Encode)?;
    store.update(collection, key, &raw).await
}

/// One `<key>.json` file per record under `<root>/<collection>/`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the collection directories if needed.
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        for collection in Collection::ALL {
            tokio::fs::create_dir_all(root.join(collection.dir_name())).await?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, collection: Collection, key: &str) -> Result<PathBuf, StoreError> {
        check_key(key)?;
        Ok(self
            .root
            .join(collection.dir_name())
            .join(format!("{key}.json")))
    }

    fn scratch_path(&self, collection: Collection, key: &str) -> PathBuf {
        let suffix = random_string(8);
        self.root
            .join(collection.dir_name())
            .join(format!(".{key}.{suffix}.tmp"))
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn encode(value: &Value) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(StoreError::Encode)
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn create(
        &self,
        collection: Collection,
        key: &str,
        value: &Value,
    ) -> Result<(), StoreError> {
        let path = self.record_path(collection, key)?;
        let body = encode(value)?;

        // Publish with a hard link: it refuses to clobber and the record
        // only becomes visible once fully written.
        let scratch = self.scratch_path(collection, key);
        tokio::fs::write(&scratch, &body).await?;
        let linked = tokio::fs::hard_link(&scratch, &path).await;
        let _ = tokio::fs::remove_file(&scratch).await;
        match linked {
            Ok(()) => {
                debug!(%collection, key, "record created");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::AlreadyExists {
                collection,
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, collection: Collection, key: &str) -> Result<Value, StoreError> {
        let path = self.record_path(collection, key)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    collection,
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
            collection,
            key: key.to_string(),
            source,
        })
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        value: &Value,
    ) -> Result<(), StoreError> {
        let path = self.record_path(collection, key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StoreError::NotFound {
                collection,
                key: key.to_string(),
            });
        }
        let body = encode(value)?;

        let scratch = self.scratch_path(collection, key);
        tokio::fs::write(&scratch, &body).await?;
        if let Err(e) = tokio::fs::rename(&scratch, &path).await {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(e.into());
        }
        debug!(%collection, key, "record updated");
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(collection, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%collection, key, "record deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                collection,
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
