pub mod matching;
pub mod quiz;
pub mod result;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Difficulty selects the gap between the spoken prompt and its reading
/// in quiz mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Easy,
    Normal,
    Hard,
}

impl Level {
    pub fn delay(self) -> Duration {
        match self {
            Level::Easy => Duration::from_millis(3000),
            Level::Normal => Duration::from_millis(2000),
            Level::Hard => Duration::from_millis(1000),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Easy => "easy",
            Level::Normal => "normal",
            Level::Hard => "hard",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "easy" => Some(Level::Easy),
            "normal" => Some(Level::Normal),
            "hard" => Some(Level::Hard),
            _ => None,
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Level::Easy => Level::Normal,
            Level::Normal => Level::Hard,
            Level::Hard => Level::Easy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Quiz,
    Matching,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Quiz => "quiz",
            Mode::Matching => "matching",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quiz" => Some(Mode::Quiz),
            "matching" => Some(Mode::Matching),
            _ => None,
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Mode::Quiz => Mode::Matching,
            Mode::Matching => Mode::Quiz,
        }
    }
}
