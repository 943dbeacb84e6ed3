//! Core types and trait definitions for the carnet backend.
//!
//! This crate holds the document model, the [`store::DocumentStore`]
//! abstraction, the in-process [`memory::MemoryStore`] and the
//! [`lookup::LookupService`] that resolves a matricula into profiles, events
//! and promotional notices. It has no HTTP dependencies.

// Native `async fn` in traits; the trait signatures spell out `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod document;
pub mod error;
pub mod lookup;
pub mod memory;
pub mod promotion;
pub mod query;
pub mod store;

pub use error::{Error, LookupError, Result};
