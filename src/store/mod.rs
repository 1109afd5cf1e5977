//! Persistence seams — account and knowledge stores.
//!
//! The pipeline treats both as external collaborators behind async traits:
//! a key-value account store (`userId → Account`) and a read-only document
//! store for knowledge items. Backends: flat JSON files for local runs,
//! in-memory maps for tests and demos.

pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::{JsonAccountStore, JsonKnowledgeStore};
pub use memory::{MemoryAccountStore, MemoryKnowledgeStore};
pub use traits::{AccountMap, AccountStore, KnowledgeStore};
