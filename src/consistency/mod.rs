//! Consistency Models
//!
//! The three write/visibility policies the simulator demonstrates:
//!
//! - **Strong** (`strong`): attendance is written before the response and is
//!   visible to every later read.
//! - **Weak** (`weak`): task scores are acknowledged at once and reach the
//!   replica that readers see only after a fixed delay.
//! - **Eventual** (`eventual`): final scores are recomputed for every student
//!   by a periodic batch job from the authoritative maps.

pub mod strong;
pub mod weak;
pub mod eventual;

pub use strong::{record_attendance, AttendanceReceipt};
pub use weak::{Replicator, ScoreReceipt};
pub use eventual::{compute_final_score, BatchProcessor, BatchReport};
