//! GradeSim - Consistency Models in a Classroom Gradebook
//!
//! A small HTTP service that demonstrates strong, weak, and eventual
//! consistency using a gradebook: attendance is written strongly, task scores
//! reach a lagging replica after a fixed delay, and final scores are
//! recomputed by a periodic batch job.
//!
//! # Architecture
//!
//! One owned [`store::Gradebook`] holds four in-memory maps and the event log.
//! It is shared by the HTTP handlers, the weak-model [`consistency::Replicator`]
//! and the eventual-model [`consistency::BatchProcessor`]. Nothing is persisted.

pub mod config;
pub mod error;
pub mod events;
pub mod store;
pub mod consistency;
pub mod api;

pub use config::GradeSimConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::GradeSimConfig;
    pub use crate::error::{Error, Result};
    pub use crate::events::{EventEntry, EventKind};
    pub use crate::store::{Gradebook, StudentView};
    pub use crate::consistency::{BatchProcessor, Replicator};
    pub use crate::api::HttpServer;
}
