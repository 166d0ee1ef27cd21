use serde::{Deserialize, Serialize};

use crate::sets::Question;

/// Persisted outcome of one completed session. Created once at session
/// end and never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionResult {
    /// Session day, YYYY-MM-DD.
    pub date: String,
    pub grade_set: String,
    pub mode: String,
    /// Quiz sessions: percentage 0..=100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    /// Matching sessions: elapsed milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    /// Quiz sessions: questions answered incorrectly, in encounter order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missed: Vec<Question>,
}

impl SessionResult {
    pub fn quiz(date: String, grade_set: String, score: u32, missed: Vec<Question>) -> Self {
        Self {
            date,
            grade_set,
            mode: "quiz".to_string(),
            score: Some(score),
            time_ms: None,
            missed,
        }
    }

    pub fn matching(date: String, grade_set: String, time_ms: u64) -> Self {
        Self {
            date,
            grade_set,
            mode: "matching".to_string(),
            score: None,
            time_ms: Some(time_ms),
            missed: Vec::new(),
        }
    }

    /// Display column: "1:07" for a timed run, "85%" for a scored one.
    pub fn outcome_label(&self) -> String {
        match (self.time_ms, self.score) {
            (Some(ms), _) => format_mm_ss(ms),
            (None, Some(score)) => format!("{score}%"),
            (None, None) => "-".to_string(),
        }
    }
}

/// minutes:seconds with zero-padded seconds, the format the timer shows.
pub fn format_mm_ss(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{minutes}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_mm_ss(0), "0:00");
        assert_eq!(format_mm_ss(999), "0:00");
        assert_eq!(format_mm_ss(7_000), "0:07");
        assert_eq!(format_mm_ss(67_000), "1:07");
        assert_eq!(format_mm_ss(600_000), "10:00");
    }

    #[test]
    fn quiz_results_serialize_without_time() {
        let result = SessionResult::quiz("2025-04-01".into(), "grade5-set1".into(), 50, Vec::new());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"score\":50"));
        assert!(!json.contains("time_ms"));
        assert!(!json.contains("missed"));
    }

    #[test]
    fn matching_results_roundtrip() {
        let result = SessionResult::matching("2025-04-01".into(), "grade5-set1".into(), 67_000);
        let json = serde_json::to_string(&result).unwrap();
        let back: SessionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.time_ms, Some(67_000));
        assert_eq!(back.score, None);
        assert_eq!(back.outcome_label(), "1:07");
    }
}
