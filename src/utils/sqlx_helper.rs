// --- File: src/utils/sqlx_helper.rs ---

use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use tracing::{debug, error};

use crate::storage::{StorageError, UserStore};
use crate::utils::crypto::{decrypt, encrypt};

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        google_calendar_credentials BLOB
    )
"#;

/// SQLite-backed user store. The credential string is stored AES-256-GCM encrypted.
#[derive(Clone, Debug)]
pub struct SqliteUserStore {
    pool: SqlitePool,
    encryption_key: Vec<u8>,
}

impl SqliteUserStore {
    /// Wraps an existing pool and makes sure the `users` table exists.
    pub async fn new(pool: SqlitePool, encryption_key: Vec<u8>) -> Result<Self, StorageError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&pool).await?;
        Ok(Self {
            pool,
            encryption_key,
        })
    }
}

/// Connects to `database_url` (e.g. `sqlite://users.db?mode=rwc`) and prepares the schema.
pub async fn create_sqlite_user_store(
    database_url: &str,
    encryption_key: Vec<u8>,
) -> Result<SqliteUserStore, StorageError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    SqliteUserStore::new(pool, encryption_key).await
}

impl UserStore for SqliteUserStore {
    fn load_credentials<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        async move {
            let row = sqlx::query("SELECT google_calendar_credentials FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

            let Some(sealed) = row.and_then(|r| r.get::<Option<Vec<u8>>, _>(0)) else {
                debug!(user_id, "no stored Google credentials");
                return Ok(None);
            };

            let plain = decrypt(&self.encryption_key, &sealed).map_err(StorageError::Encryption)?;
            String::from_utf8(plain)
                .map(Some)
                .map_err(|e| StorageError::Encryption(format!("invalid UTF-8: {e}")))
        }
        .boxed()
    }

    fn save_credentials<'a>(
        &'a self,
        user_id: &'a str,
        serialized: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        async move {
            let sealed =
                encrypt(&self.encryption_key, serialized.as_bytes()).map_err(StorageError::Encryption)?;

            let result = sqlx::query(
                r#"
                INSERT INTO users (id, google_calendar_credentials)
                VALUES (?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    google_calendar_credentials = excluded.google_calendar_credentials
                "#,
            )
            .bind(user_id)
            .bind(sealed)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(e) => {
                    error!(user_id, error = %e, "failed to save Google credentials");
                    Err(StorageError::Database(e))
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store(key: [u8; 32]) -> SqliteUserStore {
        // One connection: every connection to `sqlite::memory:` is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteUserStore::new(pool, key.to_vec()).await.unwrap()
    }

    #[actix_web::test]
    async fn saves_loads_and_overwrites() {
        let store = memory_store([3u8; 32]).await;
        assert_eq!(store.load_credentials("alice").await.unwrap(), None);

        store.save_credentials("alice", r#"{"token":"a1"}"#).await.unwrap();
        store.save_credentials("alice", r#"{"token":"a2"}"#).await.unwrap();
        assert_eq!(
            store.load_credentials("alice").await.unwrap().as_deref(),
            Some(r#"{"token":"a2"}"#)
        );
    }

    #[actix_web::test]
    async fn credentials_are_encrypted_at_rest() {
        let store = memory_store([4u8; 32]).await;
        store.save_credentials("bob", r#"{"token":"visible?"}"#).await.unwrap();

        let raw: Vec<u8> = sqlx::query("SELECT google_calendar_credentials FROM users WHERE id = ?")
            .bind("bob")
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get(0);
        assert!(!String::from_utf8_lossy(&raw).contains("visible?"));

        let wrong_key = SqliteUserStore {
            pool: store.pool.clone(),
            encryption_key: vec![5u8; 32],
        };
        assert!(matches!(
            wrong_key.load_credentials("bob").await,
            Err(StorageError::Encryption(_))
        ));
    }
}
