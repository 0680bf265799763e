//! Core types, storage traits, and the orchestration logic for the
//! Collection Instrument Register.
//!
//! This crate is free of HTTP and database dependencies. Backends
//! (`cir-store-sqlite`, `cir-blob`, `cir-pubsub`) implement the traits in
//! [`store`]; the HTTP layer (`cir-api`) drives a [`processor::CiProcessor`].

// Native `async fn` in traits; the returned futures carry explicit `Send`
// bounds in the trait signatures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod location;
pub mod metadata;
pub mod processor;
pub mod store;
pub mod transaction;
pub mod version;

pub use error::{Error, Result};
