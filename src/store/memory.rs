//! In-memory store backends for tests and demos.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Account, KnowledgeItem};
use crate::error::StoreError;
use crate::store::traits::{AccountMap, AccountStore, KnowledgeStore};

/// Account store held entirely in memory.
pub struct MemoryAccountStore {
    accounts: RwLock<AccountMap>,
    reject_writes: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new(accounts: AccountMap) -> Self {
        Self {
            accounts: RwLock::new(accounts),
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Seed a store with a single user.
    pub fn with_user(user_id: &str, account: Account) -> Self {
        let mut accounts = AccountMap::new();
        accounts.insert(user_id.to_string(), account);
        Self::new(accounts)
    }

    /// Make subsequent writes fail, to exercise persistence-failure paths.
    pub fn reject_writes(&self) {
        self.reject_writes.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new(AccountMap::new())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn read(&self) -> AccountMap {
        self.accounts.read().await.clone()
    }

    async fn write(&self, accounts: &AccountMap) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("writes rejected".to_string()));
        }
        *self.accounts.write().await = accounts.clone();
        Ok(())
    }
}

/// Fixed in-memory knowledge store.
pub struct MemoryKnowledgeStore {
    items: Vec<KnowledgeItem>,
}

impl MemoryKnowledgeStore {
    pub fn new(items: Vec<KnowledgeItem>) -> Self {
        Self { items }
    }
}

impl Default for MemoryKnowledgeStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn read(&self) -> Vec<KnowledgeItem> {
        self.items.clone()
    }
}
