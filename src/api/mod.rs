//! HTTP API Module
//!
//! Provides the REST API for consistency-model writes, reads, and the event log,
//! plus static asset serving for the classroom UI.

mod http;

pub use http::{AppState, HttpServer};
