//! `SQLite`-backed document store.
//!
//! Documents live in a single `documents(key, body, updated_at)` table. Each
//! batch runs in one `IMMEDIATE` transaction: touched rows are read, the ops
//! are applied in memory, and the written bodies are upserted before commit.
//! All database work runs on the blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::connection::{self, ConnectionConfig, ConnectionPool};
use crate::errors::{Result, StoreError};
use crate::keys::DocKey;
use crate::migrations::run_migrations;
use crate::ops::{WriteOp, apply_batch};
use crate::subscriptions::{DocumentChange, Subscriptions};
use crate::traits::DocumentStore;

/// Persistent [`DocumentStore`] over a pooled `SQLite` database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
    subscriptions: Arc<Subscriptions>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and run migrations.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        Self::from_pool(connection::new_file(path, config)?)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::from_pool(connection::new_in_memory(&ConnectionConfig::default())?)
    }

    fn from_pool(pool: ConnectionPool) -> Result<Self> {
        {
            let conn = pool.get()?;
            let _ = run_migrations(&conn)?;
        }
        Ok(Self {
            pool,
            subscriptions: Arc::new(Subscriptions::new()),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("blocking task failed: {e}")))?
    }
}

fn read_doc(conn: &Connection, key: &DocKey) -> Result<Option<Value>> {
    Ok(conn
        .query_row(
            "SELECT body FROM documents WHERE key = ?1",
            [key.as_str()],
            |row| row.get::<_, Value>(0),
        )
        .optional()?)
}

fn commit(conn: &mut Connection, ops: &[WriteOp]) -> Result<Vec<(DocKey, Value)>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let written = apply_batch(ops, |key| read_doc(&tx, key))?;
    let now = Utc::now().to_rfc3339();
    for (key, body) in &written {
        let _ = tx.execute(
            "INSERT INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![key.as_str(), body, now],
        )?;
    }
    tx.commit()?;
    Ok(written.into_iter().collect())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Value>> {
        let key = key.clone();
        self.blocking(move |conn| read_doc(conn, &key)).await
    }

    async fn list(&self, collection: &DocKey) -> Result<Vec<(DocKey, Value)>> {
        let collection = collection.clone();
        self.blocking(move |conn| {
            let prefix = format!("{collection}/");
            let mut stmt = conn.prepare(
                "SELECT key, body FROM documents WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            )?;
            let rows = stmt.query_map([prefix.as_str()], |row| {
                Ok((DocKey::new(row.get::<_, String>(0)?), row.get::<_, Value>(1)?))
            })?;
            let mut out = Vec::new();
            for row in rows {
                let (key, body) = row?;
                if key.is_child_of(&collection) {
                    out.push((key, body));
                }
            }
            Ok(out)
        })
        .await
    }

    #[instrument(skip_all, fields(ops = ops.len()))]
    async fn commit_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        let written = self.blocking(move |conn| commit(conn, &ops)).await?;
        debug!(documents = written.len(), "batch committed");
        for (key, body) in &written {
            self.subscriptions.publish(key, body);
        }
        Ok(())
    }

    fn subscribe(&self, key: &DocKey) -> broadcast::Receiver<DocumentChange> {
        self.subscriptions.subscribe(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
