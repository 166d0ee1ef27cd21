use serde::{Deserialize, Serialize};

use crate::session::result::SessionResult;
use crate::session::Level;
use crate::sets::Question;

pub const SCHEMA_VERSION: u32 = 1;

/// The whole result history, persisted as one document per append.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryData {
    pub schema_version: u32,
    pub results: Vec<SessionResult>,
}

impl Default for HistoryData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            results: Vec::new(),
        }
    }
}

impl HistoryData {
    /// The n fastest timed runs, ascending; ties keep insertion order.
    pub fn top_by_time(&self, n: usize) -> Vec<&SessionResult> {
        let mut timed: Vec<&SessionResult> =
            self.results.iter().filter(|r| r.time_ms.is_some()).collect();
        timed.sort_by_key(|r| r.time_ms);
        timed.truncate(n);
        timed
    }

    /// All results, newest append first.
    pub fn recent_first(&self) -> Vec<&SessionResult> {
        self.results.iter().rev().collect()
    }
}

/// Saved mid-quiz state, overwritten after every answer. At most one
/// exists; it is removed on completion and on explicit interruption.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub schema_version: u32,
    pub grade_set: String,
    pub level: Level,
    pub voice: String,
    pub current_index: usize,
    pub correct_count: usize,
    pub missed: Vec<Question>,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(id: &str, ms: u64) -> SessionResult {
        SessionResult::matching("2025-04-01".into(), id.into(), ms)
    }

    #[test]
    fn top_by_time_sorts_ascending_with_stable_ties() {
        let history = HistoryData {
            schema_version: SCHEMA_VERSION,
            results: vec![
                timed("first-90", 90_000),
                timed("first-60", 60_000),
                timed("second-60", 60_000),
                timed("first-30", 30_000),
                SessionResult::quiz("2025-04-01".into(), "scored".into(), 80, Vec::new()),
                timed("first-120", 120_000),
                timed("first-45", 45_000),
            ],
        };

        let top = history.top_by_time(5);
        let sets: Vec<&str> = top.iter().map(|r| r.grade_set.as_str()).collect();
        assert_eq!(
            sets,
            vec!["first-30", "first-45", "first-60", "second-60", "first-90"]
        );
    }

    #[test]
    fn top_by_time_skips_scored_results() {
        let history = HistoryData {
            schema_version: SCHEMA_VERSION,
            results: vec![SessionResult::quiz(
                "2025-04-01".into(),
                "scored".into(),
                100,
                Vec::new(),
            )],
        };
        assert!(history.top_by_time(5).is_empty());
    }

    #[test]
    fn recent_first_reverses_insertion_order() {
        let history = HistoryData {
            schema_version: SCHEMA_VERSION,
            results: vec![timed("a", 1), timed("b", 2), timed("c", 3)],
        };
        let recent: Vec<&str> = history
            .recent_first()
            .iter()
            .map(|r| r.grade_set.as_str())
            .collect();
        assert_eq!(recent, vec!["c", "b", "a"]);
    }
}
