//! HTTP boundary for the embedding service.
//!
//! Translates transport-level requests into scheduler submissions and maps
//! resolved errors back to failure statuses. This is the only layer where
//! errors become user-visible.

pub mod requests;
pub mod responses;
mod routes;

pub use routes::{build_router, AppState};
