//! Weak consistency: task scores
//!
//! A score is written to the authoritative map and acknowledged at once. A
//! one-shot task copies it to the replica after the replication delay.
//!
//! Deferred writes are neither ordered nor cancellable: when several are in
//! flight for the same student, whichever fires last decides the replica
//! value, regardless of submission order.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::config::format_short;
use crate::events::EventKind;
use crate::store::{score_json, Gradebook};

/// Response to a task-score write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReceipt {
    pub message: String,
    pub score_received: Value,
}

/// Schedules delayed copies of task scores onto the replica
pub struct Replicator {
    book: Arc<Gradebook>,
    delay: Duration,
    /// Last sequence number handed out
    last_seq: AtomicU64,
    /// Deferred writes that have not fired yet
    in_flight: Arc<AtomicUsize>,
}

impl Replicator {
    /// Create a replicator using the gradebook's replication delay
    pub fn new(book: Arc<Gradebook>) -> Self {
        let delay = book.replication_delay();
        Self {
            book,
            delay,
            last_seq: AtomicU64::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Accept a task score: authoritative write now, replica write later
    pub async fn submit(&self, student_id: &str, score: Option<f64>) -> ScoreReceipt {
        let seq = self.last_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let score_value = score.map(score_json).unwrap_or(Value::Null);

        self.book.set_task_score(student_id, score).await;
        self.book
            .record_event(
                EventKind::WeakWriteStart,
                "Nilai Tugas diterima oleh server.",
                json!({ "studentId": student_id, "score": score_value.clone(), "db": "Strong", "seq": seq }),
            )
            .await;

        // detached: the receipt never waits on the replica write
        drop(self.schedule(student_id.to_string(), score, seq, self.delay));

        ScoreReceipt {
            message: format!(
                "Nilai Tugas diterima (Weak Consistency). Anda mungkin melihat nilai lama saat ini selama {}.",
                format_short(self.delay)
            ),
            score_received: score_value,
        }
    }

    /// Spawn the deferred replica write for one submission
    pub fn schedule(&self, student_id: String, score: Option<f64>, seq: u64, delay: Duration) -> JoinHandle<()> {
        let book = Arc::clone(&self.book);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            "Replication #{} for {} scheduled in {:?}",
            seq, student_id, delay
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            book.set_replica_score(&student_id, score).await;
            book.record_event(
                EventKind::WeakReplicationEnd,
                "Nilai Tugas direplikasi ke replika klien.",
                json!({
                    "studentId": student_id,
                    "score": score.map(score_json).unwrap_or(Value::Null),
                    "db": "Weak Replica",
                    "seq": seq,
                }),
            )
            .await;

            in_flight.fetch_sub(1, Ordering::SeqCst);
        })
    }

    /// Deferred writes scheduled but not yet applied
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
