use crate::domain::{ConfigurationError, PoolConfig};
use crate::engine::Pool;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

const MAX_NAME_LEN: usize = 64;

/// Named live pools. Each pool sits behind its own mutex, so deposit events
/// on one pool are serialized while different pools proceed independently.
#[derive(Default)]
pub struct PoolRegistry {
    pools: RwLock<HashMap<String, Arc<Mutex<Pool>>>>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("pool {0} already exists")]
    AlreadyExists(String),
    #[error("invalid pool name {0:?}: use 1-64 characters from [a-z0-9_-]")]
    InvalidName(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and register a fresh pool under `name`.
    pub async fn create(
        &self,
        name: &str,
        config: PoolConfig,
    ) -> Result<Arc<Mutex<Pool>>, RegistryError> {
        if !is_valid_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let pool = Pool::new(config)?;

        let mut pools = self.pools.write().await;
        if pools.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        let handle = Arc::new(Mutex::new(pool));
        pools.insert(name.to_string(), handle.clone());
        info!(pool = name, "pool created");
        Ok(handle)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Mutex<Pool>>> {
        self.pools.read().await.get(name).cloned()
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
