//! SQLite subscription store.
//!
//! One table keyed by `(chat_id, url)`. Each method runs a single statement,
//! so calls from pollers and the front end can interleave freely.

use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use stockwatch_core::error::{Result, StockWatchError};
use stockwatch_core::traits::SubscriptionStore;
use stockwatch_core::types::{SubscriberId, Subscription};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tracked_links (
    chat_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (chat_id, url)
);";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(store_err)?;
        tracing::debug!("Subscription store opened: {}", path.display());
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(store_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| StockWatchError::store(e.to_string()))
    }

    /// Total number of subscription rows.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM tracked_links", [], |row| row.get(0))
            .map_err(store_err)?;
        Ok(usize::try_from(n).unwrap_or_default())
    }
}

fn store_err(e: rusqlite::Error) -> StockWatchError {
    StockWatchError::Store(e.to_string())
}

#[async_trait]
impl SubscriptionStore for SqliteStore {
    fn name(&self) -> &str { "sqlite" }

    async fn insert(&self, subscriber: SubscriberId, resource: &str, display_name: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO tracked_links (chat_id, url, title) VALUES (?1, ?2, ?3)",
            params![subscriber.0, resource, display_name],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete(&self, subscriber: SubscriberId, resource: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM tracked_links WHERE chat_id = ?1 AND url = ?2",
            params![subscriber.0, resource],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT chat_id, url, title FROM tracked_links ORDER BY chat_id, url")
            .map_err(store_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Subscription {
                    subscriber: SubscriberId(row.get(0)?),
                    resource: row.get(1)?,
                    display_name: row.get(2)?,
                })
            })
            .map_err(store_err)?;

        Ok(rows.filter_map(readable).collect())
    }

    async fn list_by_subscriber(&self, subscriber: SubscriberId) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT url, title FROM tracked_links WHERE chat_id = ?1 ORDER BY url")
            .map_err(store_err)?;

        let rows = stmt
            .query_map(params![subscriber.0], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(store_err)?;
        Ok(rows.filter_map(readable).collect())
    }
}

/// A row that fails to decode is skipped rather than failing the batch.
fn readable<T>(row: rusqlite::Result<T>) -> Option<T> {
    match row {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Skipping unreadable subscription row: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let s = SubscriberId(100);

        store.insert(s, "http://x/item", "Item").await.unwrap();
        store.insert(s, "http://x/item", "Renamed").await.unwrap();

        let rows = store.list_by_subscriber(s).await.unwrap();
        assert_eq!(rows, vec![("http://x/item".to_string(), "Item".to_string())]);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_ok() {
        let store = SqliteStore::in_memory().unwrap();
        store.delete(SubscriberId(1), "http://x/none").await.unwrap();

        store.insert(SubscriberId(1), "http://x/a", "A").await.unwrap();
        store.delete(SubscriberId(1), "http://x/a").await.unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_all_and_by_subscriber() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(SubscriberId(2), "http://x/a", "A").await.unwrap();
        store.insert(SubscriberId(-1), "http://x/b", "B").await.unwrap();
        store.insert(SubscriberId(2), "http://x/0", "Zero").await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].subscriber, SubscriberId(-1));
        assert_eq!(all[1].resource, "http://x/0");
        assert_eq!(all[1].pair().subscriber, SubscriberId(2));

        let mine = store.list_by_subscriber(SubscriberId(2)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(store.list_by_subscriber(SubscriberId(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_skipped() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(SubscriberId(5), "http://x/good", "Good").await.unwrap();
        store
            .conn()
            .unwrap()
            .execute("INSERT INTO tracked_links (chat_id, url, title) VALUES (5, X'FF00', 'Bad')", [])
            .unwrap();
        assert_eq!(store.count().unwrap(), 2);

        let mine = store.list_by_subscriber(SubscriberId(5)).await.unwrap();
        assert_eq!(mine, vec![("http://x/good".to_string(), "Good".to_string())]);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tracked_links.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(SubscriberId(7), "http://x/item", "Item").await.unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let all = reopened.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "Item");
    }
}
