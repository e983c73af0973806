//! Eventual consistency: final-score batch
//!
//! A periodic job that recomputes every student's final score from the
//! authoritative attendance and task-score maps. The replica is never read.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::RwLock;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::events::EventKind;
use crate::store::{Gradebook, SourceRecord};

/// Weight of attendance in the final score
pub const ATTENDANCE_WEIGHT: f64 = 40.0;
/// Weight of the task score in the final score
pub const TASK_WEIGHT: f64 = 0.6;

/// Outcome of one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Students recomputed
    pub processed: usize,
    /// Students whose final score string changed
    pub updated: usize,
}

/// `attendance * 40 + task_score * 0.6`, two decimals; a missing score counts as 0
pub fn compute_final_score(is_present: bool, task_score: Option<f64>) -> String {
    let attendance = if is_present { 1.0 } else { 0.0 };
    let score = attendance * ATTENDANCE_WEIGHT + task_score.unwrap_or(0.0) * TASK_WEIGHT;
    format_two_decimals(score)
}

/// Two decimals, exact ties rounded away from zero (`1.125` -> `1.13`).
///
/// `{:.2}` rounds exact ties to even. A value ties at the third decimal only
/// when it is an odd number of eighths, so that case is handled by hand.
fn format_two_decimals(value: f64) -> String {
    let eighths = value.abs() * 8.0;
    if eighths.fract() == 0.0 && eighths < 1e15 && (eighths as u64) % 2 == 1 {
        let hundredths = (eighths as u64 * 125 + 5) / 10;
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}{}.{:02}", sign, hundredths / 100, hundredths % 100);
    }
    format!("{:.2}", value)
}

/// Periodic final-score recomputation
pub struct BatchProcessor {
    book: Arc<Gradebook>,
    interval: Duration,
    shutdown: RwLock<bool>,
}

impl BatchProcessor {
    /// Create a processor using the gradebook's batch interval
    pub fn new(book: Arc<Gradebook>) -> Self {
        let interval = book.batch_interval();
        Self {
            book,
            interval,
            shutdown: RwLock::new(false),
        }
    }

    /// Recompute all final scores once
    pub async fn run_once(&self) -> BatchReport {
        self.book
            .record_event(EventKind::EventualBatchStart, "Menjalankan Batch Calculation...", json!({}))
            .await;

        let records = self.book.source_records().await;
        let processed = records.len();
        let scores = records
            .into_iter()
            .map(|SourceRecord { student_id, is_present, task_score }| {
                (student_id, compute_final_score(is_present, task_score))
            })
            .collect();
        let updated = self.book.publish_final_scores(scores).await;

        self.book
            .record_event(
                EventKind::EventualBatchEnd,
                format!("Perhitungan Nilai Akhir selesai. {} data diperbarui.", updated),
                json!({ "updatedCount": updated, "db": "Eventual Result" }),
            )
            .await;

        tracing::debug!("Batch recomputed {} students, {} changed", processed, updated);
        BatchReport { processed, updated }
    }

    /// Run the batch every interval until stopped. The first run happens one
    /// full interval after start.
    pub async fn start(&self) {
        tracing::info!("Eventual batch job started, interval {:?}", self.interval);

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if *self.shutdown.read().await {
                break;
            }

            self.run_once().await;
        }

        tracing::info!("Eventual batch job stopped");
    }

    /// Stop the loop before its next run
    pub async fn stop(&self) {
        *self.shutdown.write().await = true;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsistencyConfig;
    use crate::consistency::{record_attendance, Replicator};

    fn setup(batch_ms: u64) -> Arc<Gradebook> {
        Arc::new(Gradebook::new(&ConsistencyConfig {
            replication_delay_ms: 60_000,
            batch_interval_ms: batch_ms,
        }))
    }

    #[test]
    fn test_compute_final_score() {
        assert_eq!(compute_final_score(true, Some(75.0)), "85.00");
        assert_eq!(compute_final_score(false, Some(75.0)), "45.00");
        assert_eq!(compute_final_score(true, None), "40.00");
        assert_eq!(compute_final_score(false, None), "0.00");
        assert_eq!(compute_final_score(true, Some(82.5)), "89.50");
    }

    #[test]
    fn test_final_score_ties_round_up() {
        // 1.875 * 0.6 == 1.125 and 0.625 * 0.6 == 0.375 exactly
        assert_eq!(compute_final_score(false, Some(1.875)), "1.13");
        assert_eq!(compute_final_score(false, Some(0.625)), "0.38");
        assert_eq!(compute_final_score(true, Some(1.875)), "41.13");

        assert_eq!(format_two_decimals(0.125), "0.13");
        assert_eq!(format_two_decimals(-0.125), "-0.13");
        // not a tie in binary, stays below
        assert_eq!(format_two_decimals(1.005), "1.00");
        assert_eq!(format_two_decimals(2.675), "2.67");
        assert_eq!(format_two_decimals(0.5), "0.50");
    }

    #[tokio::test]
    async fn test_batch_uses_authoritative_not_replica() {
        let book = setup(5_000);
        let replicator = Replicator::new(Arc::clone(&book));
        let batch = BatchProcessor::new(Arc::clone(&book));

        record_attendance(&book, "MHS060", true).await;
        replicator.submit("MHS060", Some(75.0)).await;
        assert_eq!(book.replica_score("MHS060").await, None);

        let report = batch.run_once().await;
        assert_eq!(report, BatchReport { processed: 1, updated: 1 });
        assert_eq!(book.final_score("MHS060").await.as_deref(), Some("85.00"));
    }

    #[tokio::test]
    async fn test_second_run_without_writes_changes_nothing() {
        let book = setup(5_000);
        book.seed_demo().await;
        let batch = BatchProcessor::new(Arc::clone(&book));

        assert_eq!(batch.run_once().await.updated, 1);
        assert_eq!(batch.run_once().await.updated, 0);
        assert_eq!(book.final_score("MHS001").await.as_deref(), Some("45.00"));

        record_attendance(&book, "MHS001", true).await;
        assert_eq!(batch.run_once().await.updated, 1);
        assert_eq!(book.final_score("MHS001").await.as_deref(), Some("85.00"));
    }

    #[tokio::test]
    async fn test_students_without_attendance_are_skipped() {
        let book = setup(5_000);
        book.set_task_score("MHS070", Some(100.0)).await;
        let batch = BatchProcessor::new(Arc::clone(&book));

        assert_eq!(batch.run_once().await.processed, 0);
        assert_eq!(book.final_score("MHS070").await, None);
    }

    #[tokio::test]
    async fn test_batch_logs_start_and_end() {
        let book = setup(5_000);
        book.seed_demo().await;
        BatchProcessor::new(Arc::clone(&book)).run_once().await;

        let events = book.events().await;
        assert_eq!(events[0].kind, EventKind::EventualBatchEnd);
        assert_eq!(events[0].details["updatedCount"], 1);
        assert_eq!(events[0].message, "Perhitungan Nilai Akhir selesai. 1 data diperbarui.");
        assert_eq!(events[1].kind, EventKind::EventualBatchStart);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_loop() {
        let book = setup(5_000);
        book.seed_demo().await;
        let batch = Arc::new(BatchProcessor::new(Arc::clone(&book)));

        let runner = Arc::clone(&batch);
        let handle = tokio::spawn(async move { runner.start().await });

        // nothing computed before the first full interval
        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(book.final_score("MHS001").await, None);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(book.final_score("MHS001").await.as_deref(), Some("45.00"));

        // later writes are picked up by the next tick
        record_attendance(&book, "MHS001", true).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(book.final_score("MHS001").await.as_deref(), Some("85.00"));

        batch.stop().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(handle.is_finished());
    }
}
