// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scoped string secret stores.
//!
//! ## Table Layout
//!
//! - `secrets`: `scope/key` -> value (UTF-8)

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

const SECRETS: TableDefinition<&str, &str> = TableDefinition::new("secrets");

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("store task failed: {0}")]
    Task(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Get/set string store, scoped to one application.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> SecretStoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> SecretStoreResult<()>;
}

/// Secret store in an embedded redb file.
#[derive(Clone)]
pub struct RedbSecretStore {
    db: Arc<Database>,
    scope: String,
}

impl RedbSecretStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path, scope: &str) -> SecretStoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SECRETS)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            scope: scope.to_string(),
        })
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("{}/{}", self.scope, key)
    }

    fn get_blocking(db: &Database, key: &str) -> SecretStoreResult<Option<String>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SECRETS)?;
        Ok(table.get(key)?.map(|value| value.value().to_string()))
    }

    fn set_blocking(db: &Database, key: &str, value: &str) -> SecretStoreResult<()> {
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SECRETS)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for RedbSecretStore {
    async fn get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        let db = self.db.clone();
        let key = self.scoped_key(key);
        tokio::task::spawn_blocking(move || Self::get_blocking(&db, &key))
            .await
            .map_err(|e| SecretStoreError::Task(e.to_string()))?
    }

    async fn set(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        let db = self.db.clone();
        let key = self.scoped_key(key);
        let value = value.to_string();
        tokio::task::spawn_blocking(move || Self::set_blocking(&db, &key, &value))
            .await
            .map_err(|e| SecretStoreError::Task(e.to_string()))?
    }
}

/// Process-local store, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| SecretStoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| SecretStoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(scope: &str) -> (RedbSecretStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbSecretStore::open(&dir.path().join("secrets.redb"), scope).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn set_then_get() {
        let (store, _dir) = temp_store("wallet");
        assert_eq!(store.get("walletSession").await.unwrap(), None);

        store.set("walletSession", "first").await.unwrap();
        store.set("walletSession", "second").await.unwrap();
        assert_eq!(store.get("walletSession").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secrets.redb");
        {
            let store = RedbSecretStore::open(&path, "wallet").unwrap();
            store.set("k", "v").await.unwrap();
        }
        let store = RedbSecretStore::open(&path, "wallet").unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn scopes_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.redb");
        let a = RedbSecretStore::open(&path, "a").unwrap();
        a.set("k", "from-a").await.unwrap();
        let b = RedbSecretStore {
            db: a.db.clone(),
            scope: "b".into(),
        };
        assert_eq!(b.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
