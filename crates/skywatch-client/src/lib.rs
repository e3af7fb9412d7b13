//! Client side of Skywatch: submits structured observations to the server.
//!
//! Source-specific parsing lives behind
//! [`skywatch_core::extract::ObservationExtractor`]; this crate ships the
//! [`extract::JsonExtractor`] for documents that are already structured.

pub mod client;
pub mod error;
pub mod extract;
pub mod submitted;
pub mod sync;

pub use client::{ApiClient, ApiConfig, Submitter};
pub use error::{Error, Result};
pub use submitted::SubmittedSet;
pub use sync::{SyncSummary, sync};
