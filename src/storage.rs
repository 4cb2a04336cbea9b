// --- File: src/storage.rs ---

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;

#[derive(Error, Debug)]
pub enum StorageError {
    #[cfg(feature = "sqlite")]
    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Encryption/Decryption failed: {0}")]
    Encryption(String),
    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// The host application's user records, reduced to the one field this
/// service reads and writes: the serialized Google credential.
pub trait UserStore: Send + Sync {
    fn load_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, StorageError>>;

    /// Overwrites any previously stored credential (last write wins).
    fn save_credentials<'a>(
        &'a self,
        user_id: &'a str,
        serialized: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>>;
}

/// Process-local user store, used when no `DATABASE_URL` is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    credentials: RwLock<HashMap<String, String>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("user store lock poisoned".to_string())
}

impl UserStore for MemoryUserStore {
    fn load_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        let result = self
            .credentials
            .read()
            .map(|map| map.get(user_id).cloned())
            .map_err(poisoned);
        future::ready(result).boxed()
    }

    fn save_credentials<'a>(
        &'a self,
        user_id: &'a str,
        serialized: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self
            .credentials
            .write()
            .map(|mut map| {
                map.insert(user_id.to_string(), serialized.to_string());
            })
            .map_err(poisoned);
        future::ready(result).boxed()
    }
}

/// Picks the user store the configuration asks for: SQLite when
/// `DATABASE_URL` is set, otherwise a process-local map.
pub async fn user_store_from_config(config: &AppConfig) -> Result<Arc<dyn UserStore>, StorageError> {
    match (&config.database_url, &config.encryption_key) {
        #[cfg(feature = "sqlite")]
        (Some(url), Some(key)) => {
            let store = crate::utils::sqlx_helper::create_sqlite_user_store(url, key.clone()).await?;
            info!("using SQLite user store");
            Ok(Arc::new(store))
        }
        (Some(_), _) => Err(StorageError::Unavailable(
            "DATABASE_URL set but the SQLite store is not available".to_string(),
        )),
        (None, _) => {
            warn!("DATABASE_URL not set; stored credentials live only as long as the process");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn memory_store_overwrites() {
        let store = MemoryUserStore::new();
        assert_eq!(store.load_credentials("alice").await.unwrap(), None);

        store.save_credentials("alice", "{\"token\":\"one\"}").await.unwrap();
        store.save_credentials("alice", "{\"token\":\"two\"}").await.unwrap();
        store.save_credentials("bob", "{\"token\":\"b\"}").await.unwrap();

        assert_eq!(
            store.load_credentials("alice").await.unwrap().as_deref(),
            Some("{\"token\":\"two\"}")
        );
        assert_eq!(
            store.load_credentials("bob").await.unwrap().as_deref(),
            Some("{\"token\":\"b\"}")
        );
    }
}
