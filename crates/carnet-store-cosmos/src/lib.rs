//! Azure Cosmos DB (SQL API) backend for the carnet document store.
//!
//! Talks to the Cosmos DB REST gateway with [`reqwest`], signing each request
//! with the account master key. Implements
//! [`DocumentStore`](carnet_core::store::DocumentStore).

mod auth;
mod sql;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{CosmosConfig, CosmosStore};
