//! SQLite-backed key/value store.
//!
//! Values travel in a stable envelope so entries written by older client
//! versions keep reading back:
//!
//! ```json
//! {"payload": "<base64 bytes>", "expiration": 1735689600000}
//! ```
//!
//! `expiration` is epoch milliseconds and omitted for entries that never
//! expire. An entry is absent from the instant the current time reaches its
//! expiration.

use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    serde::{Deserialize, Serialize},
    sqlx::sqlite::{SqliteConnectOptions, SqlitePool},
    tracing::debug,
};

use crate::error::{Error, Result};

/// Stored value wrapper. The wire shape is part of the client contract.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<u64>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Persistent key/value store with optional per-entry expiration.
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    /// Open (or create) a store at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Build over an existing pool (shared database file, in-memory tests).
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key      TEXT PRIMARY KEY,
                envelope TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    /// Store a value. `expiration` is an absolute epoch-millisecond deadline;
    /// `None` means the entry never expires.
    pub async fn set(&self, key: &str, value: &[u8], expiration: Option<u64>) -> Result<()> {
        let envelope = Envelope {
            payload: BASE64.encode(value),
            expiration,
        };
        let json = serde_json::to_string(&envelope).map_err(|e| Error::Envelope {
            key: key.to_owned(),
            source: e,
        })?;
        sqlx::query(
            "INSERT INTO kv_entries (key, envelope) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET envelope = excluded.envelope",
        )
        .bind(key)
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a value. Expired entries read as absent and are removed.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row =
            sqlx::query_scalar::<_, String>("SELECT envelope FROM kv_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        let Some(json) = row else {
            return Ok(None);
        };

        let envelope: Envelope = serde_json::from_str(&json).map_err(|e| Error::Envelope {
            key: key.to_owned(),
            source: e,
        })?;

        if envelope.expiration.is_some_and(|at| now_ms() >= at) {
            debug!(key, "removing expired entry");
            self.delete(key).await?;
            return Ok(None);
        }

        let bytes = BASE64
            .decode(&envelope.payload)
            .map_err(|e| Error::Payload {
                key: key.to_owned(),
                source: e,
            })?;
        Ok(Some(bytes))
    }

    /// Remove a key. Returns whether an entry existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// String convenience over [`KvStore::set`].
    pub async fn set_string(&self, key: &str, value: &str, expiration: Option<u64>) -> Result<()> {
        self.set(key, value.as_bytes(), expiration).await
    }

    /// String convenience over [`KvStore::get`].
    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key).await? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| Error::NotUtf8 {
                    key: key.to_owned(),
                }),
        }
    }
}
