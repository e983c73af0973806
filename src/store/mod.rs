//! State Store Module
//!
//! In-memory gradebook: the authoritative attendance and task-score maps,
//! the lagging task-score replica, the batch-computed final scores, and the
//! event log.

mod gradebook;
mod view;

pub use gradebook::{Gradebook, SourceRecord, DEMO_STUDENT_ID};
pub use view::{score_json, StudentView};
