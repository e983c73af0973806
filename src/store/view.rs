//! Student View
//!
//! What a reader sees for one student. Each field is labeled with the model
//! it was read under; missing values degrade to placeholder strings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::format_short;

/// Per-student read across strong, weak and eventual state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentView {
    #[serde(rename = "studentId")]
    pub student_id: String,
    /// Strong attendance label
    pub kehadiran: String,
    /// Replica task score (number) or a staleness placeholder (string)
    pub nilai_tugas: Value,
    /// Final score string or a pending-batch placeholder
    pub nilai_akhir: String,
}

impl StudentView {
    pub(crate) fn assemble(
        student_id: &str,
        is_present: bool,
        replica_score: Option<f64>,
        final_score: Option<String>,
        replication_delay: Duration,
        batch_interval: Duration,
    ) -> Self {
        let kehadiran = if is_present {
            "Hadir (Strong)"
        } else {
            "Tidak Hadir (Strong)"
        };

        let nilai_tugas = match replica_score {
            Some(score) => score_json(score),
            None => Value::String(format!(
                "N/A (Weak - tertinggal hingga {})",
                format_short(replication_delay)
            )),
        };

        let nilai_akhir = final_score.unwrap_or_else(|| {
            format!("N/A (Eventual - tunggu batch {})", format_short(batch_interval))
        });

        Self {
            student_id: student_id.to_string(),
            kehadiran: kehadiran.to_string(),
            nilai_tugas,
            nilai_akhir,
        }
    }
}

/// JSON number for a score, integral scores without a fractional part
pub fn score_json(score: f64) -> Value {
    if score.fract() == 0.0 && score.abs() < i64::MAX as f64 {
        Value::from(score as i64)
    } else {
        serde_json::Number::from_f64(score)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholders_for_unknown_student() {
        let view = StudentView::assemble(
            "X",
            false,
            None,
            None,
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        assert_eq!(view.kehadiran, "Tidak Hadir (Strong)");
        assert_eq!(view.nilai_tugas, json!("N/A (Weak - tertinggal hingga 1m)"));
        assert_eq!(view.nilai_akhir, "N/A (Eventual - tunggu batch 5s)");
    }

    #[test]
    fn test_values_when_present() {
        let view = StudentView::assemble(
            "X",
            true,
            Some(82.5),
            Some("89.50".to_string()),
            Duration::from_secs(15),
            Duration::from_secs(5),
        );
        assert_eq!(view.kehadiran, "Hadir (Strong)");
        assert_eq!(view.nilai_tugas, json!(82.5));
        assert_eq!(view.nilai_akhir, "89.50");

        let wire = serde_json::to_value(&view).unwrap();
        assert_eq!(wire["studentId"], "X");
    }

    #[test]
    fn test_score_json() {
        assert_eq!(score_json(75.0), json!(75));
        assert_eq!(score_json(0.5), json!(0.5));
        assert_eq!(score_json(f64::NAN), Value::Null);
    }
}
