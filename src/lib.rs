//! Card Assist — credit card assistant message pipeline.

pub mod actions;
pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod server;
pub mod store;
pub mod webhook;
