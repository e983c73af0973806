//! Gradebook
//!
//! Owned simulator state shared between HTTP handlers, deferred replication
//! tasks, and the batch job. Each map has its own lock and no operation holds
//! a write lock on more than one map at a time.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::ConsistencyConfig;
use crate::events::{EventEntry, EventKind, EventLog};
use crate::store::view::StudentView;

/// Student seeded at startup when demo data is enabled
pub const DEMO_STUDENT_ID: &str = "MHS001";

/// Authoritative inputs of one final-score computation
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub student_id: String,
    pub is_present: bool,
    pub task_score: Option<f64>,
}

/// In-memory gradebook
pub struct Gradebook {
    /// Strong: attendance, visible immediately
    attendance: RwLock<HashMap<String, bool>>,
    /// Strong: task scores as written
    task_scores: RwLock<HashMap<String, Option<f64>>>,
    /// Weak: task scores as seen by readers, updated after the replication delay
    replica_scores: RwLock<HashMap<String, Option<f64>>>,
    /// Eventual: final scores from the last batch, two-decimal strings
    final_scores: RwLock<HashMap<String, String>>,
    /// Event log
    events: RwLock<EventLog>,
    /// Replication delay, used for read placeholders
    replication_delay: Duration,
    /// Batch interval, used for read placeholders
    batch_interval: Duration,
}

impl Gradebook {
    /// Create an empty gradebook
    pub fn new(consistency: &ConsistencyConfig) -> Self {
        Self {
            attendance: RwLock::new(HashMap::new()),
            task_scores: RwLock::new(HashMap::new()),
            replica_scores: RwLock::new(HashMap::new()),
            final_scores: RwLock::new(HashMap::new()),
            events: RwLock::new(EventLog::default()),
            replication_delay: consistency.replication_delay(),
            batch_interval: consistency.batch_interval(),
        }
    }

    /// Seed the demo student: absent, task score 75 already replicated
    pub async fn seed_demo(&self) {
        self.attendance.write().await.insert(DEMO_STUDENT_ID.to_string(), false);
        self.task_scores.write().await.insert(DEMO_STUDENT_ID.to_string(), Some(75.0));
        self.replica_scores.write().await.insert(DEMO_STUDENT_ID.to_string(), Some(75.0));
        tracing::debug!("Seeded demo student {}", DEMO_STUDENT_ID);
    }

    pub fn replication_delay(&self) -> Duration {
        self.replication_delay
    }

    pub fn batch_interval(&self) -> Duration {
        self.batch_interval
    }

    // ============ Attendance ============

    /// Write attendance and return the value now stored
    pub async fn set_attendance(&self, student_id: &str, is_present: bool) -> bool {
        let mut attendance = self.attendance.write().await;
        attendance.insert(student_id.to_string(), is_present);
        attendance[student_id]
    }

    pub async fn attendance(&self, student_id: &str) -> Option<bool> {
        self.attendance.read().await.get(student_id).copied()
    }

    /// Number of students with an attendance record (the batch population)
    pub async fn known_students(&self) -> usize {
        self.attendance.read().await.len()
    }

    // ============ Task scores ============

    pub async fn set_task_score(&self, student_id: &str, score: Option<f64>) {
        self.task_scores.write().await.insert(student_id.to_string(), score);
    }

    pub async fn task_score(&self, student_id: &str) -> Option<f64> {
        self.task_scores.read().await.get(student_id).copied().flatten()
    }

    pub async fn set_replica_score(&self, student_id: &str, score: Option<f64>) {
        self.replica_scores.write().await.insert(student_id.to_string(), score);
    }

    pub async fn replica_score(&self, student_id: &str) -> Option<f64> {
        self.replica_scores.read().await.get(student_id).copied().flatten()
    }

    // ============ Final scores ============

    /// Authoritative inputs for every student with an attendance record
    pub async fn source_records(&self) -> Vec<SourceRecord> {
        let attendance = self.attendance.read().await;
        let task_scores = self.task_scores.read().await;

        let mut records: Vec<SourceRecord> = attendance
            .iter()
            .map(|(id, present)| SourceRecord {
                student_id: id.clone(),
                is_present: *present,
                task_score: task_scores.get(id).copied().flatten(),
            })
            .collect();
        records.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        records
    }

    /// Store computed final scores, returning how many differ from before
    pub async fn publish_final_scores(&self, scores: Vec<(String, String)>) -> usize {
        let mut finals = self.final_scores.write().await;
        let mut changed = 0;
        for (student_id, score) in scores {
            if finals.get(&student_id) != Some(&score) {
                changed += 1;
            }
            finals.insert(student_id, score);
        }
        changed
    }

    pub async fn final_score(&self, student_id: &str) -> Option<String> {
        self.final_scores.read().await.get(student_id).cloned()
    }

    // ============ Events ============

    /// Append to the event log
    pub async fn record_event(&self, kind: EventKind, message: impl Into<String>, details: Value) {
        self.events.write().await.record(kind, message, details);
    }

    /// The whole event log, newest first
    pub async fn events(&self) -> Vec<EventEntry> {
        self.events.read().await.snapshot()
    }

    // ============ Reads ============

    /// Assemble the per-student view across all four maps
    pub async fn view(&self, student_id: &str) -> StudentView {
        let is_present = self.attendance(student_id).await.unwrap_or(false);
        let replica = self.replica_score(student_id).await;
        let final_score = self.final_score(student_id).await;

        StudentView::assemble(
            student_id,
            is_present,
            replica,
            final_score,
            self.replication_delay,
            self.batch_interval,
        )
    }
}
