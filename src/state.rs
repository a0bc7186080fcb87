use crate::checkout::gateway::{PaymentGateway, PendingSettlementGateway};
use crate::config::AppConfig;
use crate::menu;
use crate::storage::{DocumentStore, FileStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = FileStore::open(&config.data_dir)
            .await
            .with_context(|| format!("open data dir {}", config.data_dir.display()))?;
        info!(data_dir = %store.root().display(), env = config.env.name(), "store opened");
        let store = Arc::new(store) as Arc<dyn DocumentStore>;

        if menu::repo::seed_default(store.as_ref())
            .await
            .context("seed pizza menu")?
        {
            info!("default pizza menu written");
        }

        let gateway = Arc::new(PendingSettlementGateway) as Arc<dyn PaymentGateway>;

        Ok(Self {
            config,
            store,
            gateway,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
        }
    }
}
