//! Strong consistency: attendance

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::events::EventKind;
use crate::store::Gradebook;

/// Response to an attendance write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceReceipt {
    pub message: String,
    /// "Hadir" or "Tidak Hadir", read back from the store
    pub status: String,
}

/// Write attendance synchronously and report the stored value
pub async fn record_attendance(book: &Gradebook, student_id: &str, is_present: bool) -> AttendanceReceipt {
    let stored = book.set_attendance(student_id, is_present).await;

    book.record_event(
        EventKind::StrongWrite,
        "Kehadiran dicatat segera.",
        json!({ "studentId": student_id, "isPresent": is_present, "db": "Strong" }),
    )
    .await;

    AttendanceReceipt {
        message: "Kehadiran dicatat segera (Strong Consistency).".to_string(),
        status: if stored { "Hadir" } else { "Tidak Hadir" }.to_string(),
    }
}
