//! Flat-JSON-file store backends.
//!
//! `users.json` holds the account mapping, `kb.json` the knowledge items —
//! the same layout the HTTP layer serves for local demos. Malformed files
//! are logged and read as empty; this is the documented store contract,
//! not silent data loss.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::domain::KnowledgeItem;
use crate::error::StoreError;
use crate::store::traits::{AccountMap, AccountStore, KnowledgeStore};

/// Account store backed by a single JSON file.
pub struct JsonAccountStore {
    path: PathBuf,
}

impl JsonAccountStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl AccountStore for JsonAccountStore {
    async fn read(&self) -> AccountMap {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Account store unreadable, treating as empty");
                return AccountMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Account store malformed, treating as empty");
                AccountMap::new()
            }
        }
    }

    async fn write(&self, accounts: &AccountMap) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(accounts)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| StoreError::WriteRejected(e.to_string()))
    }
}

/// Knowledge store backed by a single JSON file holding an array of items.
pub struct JsonKnowledgeStore {
    path: PathBuf,
}

impl JsonKnowledgeStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl KnowledgeStore for JsonKnowledgeStore {
    async fn read(&self) -> Vec<KnowledgeItem> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Knowledge store unreadable, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Knowledge store malformed, treating as empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Account;

    #[tokio::test]
    async fn missing_account_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonAccountStore::new(dir.path().join("absent.json"));
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_account_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonAccountStore::new(&path);
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn account_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let store = JsonAccountStore::new(&path);

        let mut accounts = AccountMap::new();
        accounts.insert("user123".to_string(), Account::default());
        store.write(&accounts).await.unwrap();

        let read_back = store.read().await;
        assert!(read_back.contains_key("user123"));
    }

    #[tokio::test]
    async fn write_to_unwritable_path_is_rejected() {
        let store = JsonAccountStore::new("/nonexistent-dir/users.json");
        let result = store.write(&AccountMap::new()).await;
        assert!(matches!(result, Err(StoreError::WriteRejected(_))));
    }

    #[tokio::test]
    async fn knowledge_file_reads_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"[{"id": "kb1", "title": "Card activation", "content": "Activate in the app.", "keywords": ["activate"], "tags": ["cards"]}]"#,
        )
        .unwrap();

        let store = JsonKnowledgeStore::new(&path);
        let items = store.read().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "kb1");
    }

    #[tokio::test]
    async fn malformed_knowledge_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, "[{").unwrap();
        let store = JsonKnowledgeStore::new(&path);
        assert!(store.read().await.is_empty());
    }
}
