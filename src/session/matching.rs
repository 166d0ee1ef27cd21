use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::sets::Question;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPhase {
    /// Cards are laid out but the clock has not started.
    Ready,
    Playing,
    Finished,
}

/// What a match submission did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched { remaining: usize },
    Mismatch,
    /// No cue is active (early click, or already matched); nothing happens.
    Ignored,
}

/// Matching game: every question is a card, a random unmatched question's
/// cue plays, and the player picks the card it belongs to. Matched cards
/// leave the pool; the run is scored by elapsed time.
pub struct MatchSession {
    pool: Vec<Question>,
    display_order: Vec<Question>,
    active: Option<Question>,
    phase: MatchPhase,
    started_at: Option<Instant>,
    elapsed: Duration,
    rng: SmallRng,
}

impl MatchSession {
    /// The display order is an independent shuffle; it only affects where
    /// cards sit on screen, never which cue plays.
    pub fn new(questions: Vec<Question>, mut rng: SmallRng) -> Self {
        let mut display_order = questions.clone();
        display_order.shuffle(&mut rng);
        Self {
            pool: questions,
            display_order,
            active: None,
            phase: MatchPhase::Ready,
            started_at: None,
            elapsed: Duration::ZERO,
            rng,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn display_order(&self) -> &[Question] {
        &self.display_order
    }

    pub fn active(&self) -> Option<&Question> {
        self.active.as_ref()
    }

    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    /// A card is cleared once its question has left the pool.
    pub fn is_cleared(&self, id: &str) -> bool {
        !self.pool.iter().any(|q| q.id == id)
    }

    pub fn start(&mut self, now: Instant) {
        if self.phase != MatchPhase::Ready {
            return;
        }
        self.started_at = Some(now);
        self.phase = MatchPhase::Playing;
    }

    /// Choose the next cue uniformly at random from the pool, or finish
    /// when the pool is drained. The picked question stays in the pool
    /// until it is matched.
    pub fn pick(&mut self, now: Instant) -> Option<Question> {
        if self.phase != MatchPhase::Playing {
            return None;
        }
        if self.pool.is_empty() {
            self.finish(now);
            return None;
        }
        let index = self.rng.gen_range(0..self.pool.len());
        let question = self.pool[index].clone();
        self.active = Some(question.clone());
        Some(question)
    }

    /// Evaluate a card selection against the active cue.
    pub fn submit_match(&mut self, candidate_id: &str) -> MatchOutcome {
        if self.phase != MatchPhase::Playing {
            return MatchOutcome::Ignored;
        }
        let Some(active) = self.active.as_ref() else {
            return MatchOutcome::Ignored;
        };

        if active.id == candidate_id {
            let id = active.id.clone();
            self.pool.retain(|q| q.id != id);
            self.active = None;
            MatchOutcome::Matched {
                remaining: self.pool.len(),
            }
        } else {
            MatchOutcome::Mismatch
        }
    }

    fn finish(&mut self, now: Instant) {
        self.elapsed = self
            .started_at
            .map(|start| now.duration_since(start))
            .unwrap_or(Duration::ZERO);
        self.active = None;
        self.phase = MatchPhase::Finished;
    }

    /// Running time while playing, final time once finished.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.phase {
            MatchPhase::Ready => Duration::ZERO,
            MatchPhase::Playing => self
                .started_at
                .map(|start| now.duration_since(start))
                .unwrap_or(Duration::ZERO),
            MatchPhase::Finished => self.elapsed,
        }
    }
}
