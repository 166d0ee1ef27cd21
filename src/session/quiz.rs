use crate::sets::Question;
use crate::session::Level;
use crate::store::schema::ProgressSnapshot;

/// Where the controller is after an `answer` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizStep {
    /// Awaiting the answer for `index`.
    Awaiting { index: usize },
    Finished,
}

/// Sequential quiz: one question at a time in fixed order, self-assessed.
/// The index only ever moves forward, one step per answer.
pub struct QuizSession {
    questions: Vec<Question>,
    grade_set: String,
    level: Level,
    current_index: usize,
    correct_count: usize,
    missed: Vec<Question>,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>, grade_set: String, level: Level) -> Self {
        Self {
            questions,
            grade_set,
            level,
            current_index: 0,
            correct_count: 0,
            missed: Vec::new(),
        }
    }

    /// Restore a saved session verbatim. The caller is responsible for
    /// re-resolving the snapshot's voice before resuming playback.
    pub fn from_snapshot(snapshot: ProgressSnapshot) -> Self {
        Self {
            questions: snapshot.questions,
            grade_set: snapshot.grade_set,
            level: snapshot.level,
            current_index: snapshot.current_index,
            correct_count: snapshot.correct_count,
            missed: snapshot.missed,
        }
    }

    pub fn snapshot(&self, voice: &str) -> ProgressSnapshot {
        ProgressSnapshot {
            schema_version: crate::store::schema::SCHEMA_VERSION,
            grade_set: self.grade_set.clone(),
            level: self.level,
            voice: voice.to_string(),
            current_index: self.current_index,
            correct_count: self.correct_count,
            missed: self.missed.clone(),
            questions: self.questions.clone(),
        }
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn index(&self) -> usize {
        self.current_index
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn missed(&self) -> &[Question] {
        &self.missed
    }

    pub fn grade_set(&self) -> &str {
        &self.grade_set
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    /// Record the player's self-assessment for the current question and
    /// advance. Answering a finished session is a no-op.
    pub fn answer(&mut self, correct: bool) -> QuizStep {
        if self.is_finished() {
            return QuizStep::Finished;
        }

        if correct {
            self.correct_count += 1;
        } else {
            self.missed.push(self.questions[self.current_index].clone());
        }
        self.current_index += 1;

        if self.is_finished() {
            QuizStep::Finished
        } else {
            QuizStep::Awaiting {
                index: self.current_index,
            }
        }
    }

    /// Percentage of correct answers, rounded; 0 for an empty set.
    pub fn score(&self) -> u32 {
        if self.questions.is_empty() {
            return 0;
        }
        (self.correct_count as f64 / self.questions.len() as f64 * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str, prompt: &str, reading: &str) -> Question {
        Question {
            id: id.to_string(),
            prompt: prompt.to_string(),
            reading: reading.to_string(),
            image: String::new(),
        }
    }

    fn two_questions() -> Vec<Question> {
        vec![q("1", "apple", "りんご"), q("2", "dog", "犬")]
    }

    #[test]
    fn hard_level_scenario() {
        let mut session = QuizSession::new(two_questions(), "test".into(), Level::Hard);
        assert_eq!(session.level().delay().as_millis(), 1000);

        assert_eq!(session.answer(true), QuizStep::Awaiting { index: 1 });
        assert_eq!(session.answer(false), QuizStep::Finished);

        assert_eq!(session.correct_count(), 1);
        assert_eq!(session.missed().len(), 1);
        assert_eq!(session.missed()[0].id, "2");
        assert_eq!(session.score(), 50);
    }

    #[test]
    fn index_reaches_len_and_counts_balance() {
        let questions = vec![q("1", "a", "b"), q("2", "c", "d"), q("3", "e", "f")];
        let total = questions.len();
        let mut session = QuizSession::new(questions, "test".into(), Level::Normal);

        for i in 0..total {
            assert!(!session.is_finished());
            session.answer(i % 2 == 0);
        }

        assert!(session.is_finished());
        assert_eq!(session.index(), total);
        assert_eq!(session.correct_count() + session.missed().len(), total);
    }

    #[test]
    fn empty_set_scores_zero() {
        let session = QuizSession::new(Vec::new(), "test".into(), Level::Normal);
        assert!(session.is_finished());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn score_rounds() {
        let questions = vec![q("1", "a", "b"), q("2", "c", "d"), q("3", "e", "f")];
        let mut session = QuizSession::new(questions, "test".into(), Level::Normal);
        session.answer(true);
        session.answer(true);
        session.answer(false);
        // 2/3 = 66.66..% rounds to 67
        assert_eq!(session.score(), 67);
    }

    #[test]
    fn answering_after_finish_is_a_no_op() {
        let mut session = QuizSession::new(vec![q("1", "a", "b")], "test".into(), Level::Easy);
        session.answer(true);
        assert!(session.is_finished());

        assert_eq!(session.answer(true), QuizStep::Finished);
        assert_eq!(session.index(), 1);
        assert_eq!(session.correct_count(), 1);
    }

    #[test]
    fn snapshot_roundtrip_restores_verbatim() {
        let mut session = QuizSession::new(two_questions(), "grade5-set1".into(), Level::Hard);
        session.answer(false);

        let snapshot = session.snapshot("en-us");
        assert_eq!(snapshot.voice, "en-us");
        assert_eq!(snapshot.current_index, 1);

        let restored = QuizSession::from_snapshot(snapshot);
        assert_eq!(restored.index(), 1);
        assert_eq!(restored.correct_count(), 0);
        assert_eq!(restored.missed().len(), 1);
        assert_eq!(restored.grade_set(), "grade5-set1");
        assert_eq!(restored.level(), Level::Hard);
        assert_eq!(restored.current().unwrap().id, "2");
    }
}
