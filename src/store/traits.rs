//! Store traits — the only persistence interface the pipeline sees.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{Account, KnowledgeItem};
use crate::error::StoreError;

/// The full account mapping, keyed by user id.
///
/// A `BTreeMap` keeps iteration order deterministic, which matters for the
/// unscoped card-status search (first match across all users wins).
pub type AccountMap = BTreeMap<String, Account>;

/// Key-value account store.
///
/// Reads are infallible by contract: malformed or missing contents come
/// back as an empty mapping. Writes can be rejected; the action dispatcher
/// surfaces that as a persistence failure distinct from validation
/// failures. No concurrency control is provided; concurrent writers can
/// race. A transactional backend would slot in behind this trait.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Read the full account mapping.
    async fn read(&self) -> AccountMap;

    /// Replace the full account mapping.
    async fn write(&self, accounts: &AccountMap) -> Result<(), StoreError>;
}

/// Read-only knowledge-base store.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Read all knowledge items. Malformed contents read as an empty list.
    async fn read(&self) -> Vec<KnowledgeItem>;
}
