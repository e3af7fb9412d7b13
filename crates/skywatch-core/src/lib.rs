//! Core types and operations for the Skywatch observation store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; storage backends implement
//! [`store::ObservationStore`] and the ingestion operations in [`ingest`]
//! run on top of any of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod body;
pub mod coords;
pub mod diff;
pub mod error;
pub mod extract;
pub mod freshness;
pub mod ingest;
pub mod observation;
pub mod report;
pub mod resolve;
pub mod store;

pub use error::{Error, Result, Retryable};
