use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::error::Error;
use crate::sets::SetCatalog;
use crate::session::matching::{MatchOutcome, MatchPhase, MatchSession};
use crate::session::quiz::{QuizSession, QuizStep};
use crate::session::result::SessionResult;
use crate::session::{Level, Mode};
use crate::speech::backend::{Cue, CuePlayer, SpeechBackend};
use crate::speech::sequencer::Sequencer;
use crate::speech::{resolve_voice, Segment};
use crate::store::json_store::JsonStore;
use crate::store::schema::HistoryData;
use crate::ui::theme::Theme;

/// How long a matched card stays highlighted before the next cue plays.
const HIGHLIGHT_DELAY: Duration = Duration::from_millis(500);
/// How long a wrongly picked card shows its error state.
const SHAKE_DELAY: Duration = Duration::from_millis(400);

/// Keys assigned to cards in display order. q and r stay free for the
/// screen-level bindings.
const CARD_KEYS: &str = "123456789abcdefghijklmnop";

pub fn card_key(index: usize) -> Option<char> {
    CARD_KEYS.chars().nth(index)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Setup,
    Quiz,
    Matching,
    Result,
    History,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalAction {
    Dismiss,
    InterruptQuiz,
    QuitMatching,
}

pub struct Modal {
    pub message: String,
    pub offer_cancel: bool,
    pub action: ModalAction,
}

/// A running matching game plus its presentational timers. The deadlines
/// live here, not in the session, so dropping this struct on quit also
/// discards every scheduled follow-up.
pub struct MatchingView {
    pub set_id: String,
    pub session: MatchSession,
    /// When set, the next pick fires once this deadline passes.
    pub pending_pick_at: Option<Instant>,
    /// Card kept visually emphasized until the pending pick fires.
    pub highlight: Option<String>,
    pub shake: Option<(String, Instant)>,
}

/// Setup-screen selections, cycled field by field.
pub struct SetupState {
    pub set_ids: Vec<String>,
    pub voices: Vec<String>,
    pub selected_field: usize,
    pub set_index: usize,
    pub mode: Mode,
    pub level: Level,
    pub voice_index: usize,
}

pub const SETUP_FIELDS: usize = 4;

impl SetupState {
    fn new(set_ids: Vec<String>, voices: Vec<String>, config: &Config) -> Self {
        let voice_index = resolve_voice_index(&voices, &config.voice);
        Self {
            set_ids,
            voices,
            selected_field: 0,
            set_index: 0,
            mode: Mode::Quiz,
            level: Level::from_name(&config.level).unwrap_or(Level::Normal),
            voice_index,
        }
    }

    pub fn selected_set(&self) -> Option<&str> {
        self.set_ids.get(self.set_index).map(String::as_str)
    }

    pub fn selected_voice(&self) -> Option<&str> {
        self.voices.get(self.voice_index).map(String::as_str)
    }

    pub fn select_set(&mut self, id: &str) -> bool {
        match self.set_ids.iter().position(|s| s == id) {
            Some(index) => {
                self.set_index = index;
                true
            }
            None => false,
        }
    }

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % SETUP_FIELDS;
    }

    pub fn prev_field(&mut self) {
        self.selected_field = if self.selected_field == 0 {
            SETUP_FIELDS - 1
        } else {
            self.selected_field - 1
        };
    }

    pub fn cycle_value(&mut self, forward: bool) {
        match self.selected_field {
            0 => self.set_index = cycle_index(self.set_index, self.set_ids.len(), forward),
            1 => self.mode = self.mode.cycle(),
            2 => {
                self.level = if forward {
                    self.level.cycle()
                } else {
                    // three levels, so two forward steps go one back
                    self.level.cycle().cycle()
                };
            }
            3 => self.voice_index = cycle_index(self.voice_index, self.voices.len(), forward),
            _ => {}
        }
    }
}

fn cycle_index(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (index + 1) % len
    } else if index == 0 {
        len - 1
    } else {
        index - 1
    }
}

fn resolve_voice_index(voices: &[String], configured: &str) -> usize {
    if !configured.is_empty()
        && let Some(index) = voices.iter().position(|v| v == configured)
    {
        return index;
    }
    crate::speech::PREFERRED_VOICES
        .iter()
        .find_map(|p| voices.iter().position(|v| v == p))
        .unwrap_or(0)
}

pub struct App {
    pub screen: AppScreen,
    pub config: Config,
    pub theme: Theme,
    pub catalog: SetCatalog,
    pub setup: SetupState,
    pub quiz: Option<QuizSession>,
    pub matching: Option<MatchingView>,
    pub last_result: Option<SessionResult>,
    pub result_saved: bool,
    pub history: HistoryData,
    pub modal: Option<Modal>,
    pub has_saved_progress: bool,
    pub speaking: bool,
    pub should_quit: bool,
    voice: String,
    current_seq: u64,
    store: Option<JsonStore>,
    backend: Arc<dyn SpeechBackend>,
    sequencer: Sequencer,
    cues: CuePlayer,
    rng: SmallRng,
}

impl App {
    pub fn new(
        config: Config,
        store: Option<JsonStore>,
        backend: Arc<dyn SpeechBackend>,
        sequencer: Sequencer,
        cues: CuePlayer,
    ) -> Self {
        let theme = Theme::load(&config.theme).unwrap_or_default();
        let catalog = SetCatalog::new(Some(PathBuf::from(&config.sets_dir)));
        let history = store.as_ref().map(|s| s.load_history()).unwrap_or_default();
        let has_saved_progress = store.as_ref().is_some_and(|s| s.load_progress().is_some());
        let setup = SetupState::new(catalog.available(), backend.voices(), &config);

        Self {
            screen: AppScreen::Setup,
            config,
            theme,
            catalog,
            setup,
            quiz: None,
            matching: None,
            last_result: None,
            result_saved: false,
            history,
            modal: None,
            has_saved_progress,
            speaking: false,
            should_quit: false,
            voice: String::new(),
            current_seq: 0,
            store,
            backend,
            sequencer,
            cues,
            rng: SmallRng::from_entropy(),
        }
    }

    // --- modal plumbing -------------------------------------------------

    fn notice(&mut self, message: impl Into<String>) {
        self.modal = Some(Modal {
            message: message.into(),
            offer_cancel: false,
            action: ModalAction::Dismiss,
        });
    }

    fn fail(&mut self, err: Error) {
        self.notice(err.to_string());
    }

    fn confirm(&mut self, message: impl Into<String>, action: ModalAction) {
        self.modal = Some(Modal {
            message: message.into(),
            offer_cancel: true,
            action,
        });
    }

    pub fn modal_confirm(&mut self) {
        if let Some(modal) = self.modal.take() {
            match modal.action {
                ModalAction::Dismiss => {}
                ModalAction::InterruptQuiz => self.interrupt_quiz(),
                ModalAction::QuitMatching => self.quit_matching(),
            }
        }
    }

    pub fn modal_dismiss(&mut self) {
        self.modal = None;
    }

    // --- session start --------------------------------------------------

    pub fn start_session(&mut self) {
        let Some(set_id) = self.setup.selected_set().map(str::to_string) else {
            self.fail(Error::Configuration(
                "Choose a question set first".to_string(),
            ));
            return;
        };
        let Some(voice) = self.setup.selected_voice().map(str::to_string) else {
            self.fail(Error::Configuration(
                "No speech voice is available. Install espeak-ng or pick a voice.".to_string(),
            ));
            return;
        };

        let questions = match self.catalog.load(&set_id) {
            Ok(questions) => questions,
            Err(err) => {
                self.fail(err);
                return;
            }
        };

        self.voice = voice;
        self.remember_choices();

        match self.setup.mode {
            Mode::Quiz => self.start_quiz(set_id, questions),
            Mode::Matching => self.start_matching(set_id, questions),
        }
    }

    /// Carry the working selections back into the config file so the next
    /// launch starts from them.
    fn remember_choices(&mut self) {
        self.config.voice = self.voice.clone();
        self.config.level = self.setup.level.as_str().to_string();
        let _ = self.config.save();
    }

    fn start_quiz(&mut self, set_id: String, questions: Vec<crate::sets::Question>) {
        let session = QuizSession::new(questions, set_id, self.setup.level);
        self.quiz = Some(session);
        self.screen = AppScreen::Quiz;

        if self.quiz.as_ref().is_some_and(QuizSession::is_finished) {
            self.finish_quiz();
        } else {
            self.speak_current_question();
        }
    }

    fn start_matching(&mut self, set_id: String, questions: Vec<crate::sets::Question>) {
        let rng = SmallRng::from_rng(&mut self.rng).expect("rng fork");
        self.matching = Some(MatchingView {
            set_id,
            session: MatchSession::new(questions, rng),
            pending_pick_at: None,
            highlight: None,
            shake: None,
        });
        self.screen = AppScreen::Matching;
    }

    // --- quiz mode ------------------------------------------------------

    fn speak_current_question(&mut self) {
        let segments = {
            let Some(quiz) = self.quiz.as_ref() else {
                return;
            };
            let Some(question) = quiz.current() else {
                return;
            };
            vec![
                Segment::new(question.prompt.clone()),
                Segment::after(question.reading.clone(), quiz.level().delay()),
            ]
        };
        self.current_seq =
            self.sequencer
                .play(segments, &self.voice, self.config.normalized_rate());
        self.speaking = true;
    }

    pub fn quiz_answer(&mut self, correct: bool) {
        let Some(quiz) = self.quiz.as_mut() else {
            return;
        };
        if quiz.is_finished() {
            return;
        }

        let step = quiz.answer(correct);
        let snapshot = quiz.snapshot(&self.voice);
        if let Some(ref store) = self.store {
            let _ = store.save_progress(&snapshot);
            self.has_saved_progress = true;
        }

        match step {
            QuizStep::Awaiting { .. } => self.speak_current_question(),
            QuizStep::Finished => self.finish_quiz(),
        }
    }

    fn finish_quiz(&mut self) {
        let Some(quiz) = self.quiz.take() else {
            return;
        };
        self.sequencer.cancel();
        self.speaking = false;
        if let Some(ref store) = self.store {
            let _ = store.clear_progress();
        }
        self.has_saved_progress = false;

        let result = SessionResult::quiz(
            today(),
            quiz.grade_set().to_string(),
            quiz.score(),
            quiz.missed().to_vec(),
        );
        self.last_result = Some(result);
        self.result_saved = false;
        self.screen = AppScreen::Result;
    }

    /// Explicit abandonment: speech stops, the saved snapshot is removed,
    /// no Result is produced. Safe to call when nothing is running.
    pub fn interrupt_quiz(&mut self) {
        if self.quiz.is_none() {
            return;
        }
        self.sequencer.cancel();
        self.speaking = false;
        if let Some(ref store) = self.store {
            let _ = store.clear_progress();
        }
        self.has_saved_progress = false;
        self.quiz = None;
        self.screen = AppScreen::Setup;
    }

    pub fn request_interrupt_quiz(&mut self) {
        if self.quiz.is_some() {
            self.confirm(
                "Stop this session? Saved progress will be cleared.",
                ModalAction::InterruptQuiz,
            );
        }
    }

    /// Resume the saved quiz. The snapshot's voice is re-resolved by name;
    /// if it is gone the resume aborts and the snapshot stays on disk.
    pub fn resume_saved(&mut self) {
        let Some(snapshot) = self.store.as_ref().and_then(|s| s.load_progress()) else {
            self.has_saved_progress = false;
            self.notice("No saved session found");
            return;
        };

        match resolve_voice(self.backend.as_ref(), Some(&snapshot.voice)) {
            Some(voice) => {
                self.voice = voice;
                let session = QuizSession::from_snapshot(snapshot);
                self.quiz = Some(session);
                self.screen = AppScreen::Quiz;
                if self.quiz.as_ref().is_some_and(QuizSession::is_finished) {
                    self.finish_quiz();
                } else {
                    self.speak_current_question();
                }
            }
            None => self.fail(Error::Configuration(format!(
                "The saved session uses voice '{}', which is no longer available",
                snapshot.voice
            ))),
        }
    }

    // --- matching mode --------------------------------------------------

    pub fn matching_begin(&mut self, now: Instant) {
        let ready = self
            .matching
            .as_ref()
            .is_some_and(|v| v.session.phase() == MatchPhase::Ready);
        if !ready {
            return;
        }
        if let Some(view) = self.matching.as_mut() {
            view.session.start(now);
        }
        self.matching_pick(now);
    }

    fn matching_pick(&mut self, now: Instant) {
        let picked = {
            let Some(view) = self.matching.as_mut() else {
                return;
            };
            view.pending_pick_at = None;
            view.highlight = None;
            view.session.pick(now)
        };

        match picked {
            Some(question) => {
                self.current_seq = self.sequencer.play(
                    vec![Segment::new(question.prompt)],
                    &self.voice,
                    self.config.normalized_rate(),
                );
                self.speaking = true;
            }
            None => {
                let finished = self
                    .matching
                    .as_ref()
                    .is_some_and(|v| v.session.phase() == MatchPhase::Finished);
                if finished {
                    self.finish_matching(now);
                }
            }
        }
    }

    pub fn matching_select(&mut self, key: char, now: Instant) {
        let Some(view) = self.matching.as_mut() else {
            return;
        };

        let Some(candidate) = view
            .session
            .display_order()
            .iter()
            .enumerate()
            .find(|(index, _)| card_key(*index) == Some(key))
            .map(|(_, q)| q.id.clone())
        else {
            return;
        };
        // Clicks on already-cleared cards do nothing.
        if view.session.is_cleared(&candidate) {
            return;
        }

        match view.session.submit_match(&candidate) {
            MatchOutcome::Matched { .. } => {
                view.highlight = Some(candidate);
                view.pending_pick_at = Some(now + HIGHLIGHT_DELAY);
                self.speaking = false;
                self.cues.play(Cue::Success);
            }
            MatchOutcome::Mismatch => {
                view.shake = Some((candidate, now + SHAKE_DELAY));
                self.cues.play(Cue::Failure);
            }
            MatchOutcome::Ignored => {}
        }
    }

    fn finish_matching(&mut self, now: Instant) {
        let Some(view) = self.matching.take() else {
            return;
        };
        self.sequencer.cancel();
        self.speaking = false;

        let elapsed = view.session.elapsed(now);
        let result =
            SessionResult::matching(today(), view.set_id, elapsed.as_millis() as u64);
        self.last_result = Some(result);
        self.result_saved = false;
        self.screen = AppScreen::Result;
    }

    /// Abandon the matching game: speech and every pending follow-up die
    /// with the view. No Result. Safe to call when nothing is running.
    pub fn quit_matching(&mut self) {
        if self.matching.is_none() {
            return;
        }
        self.sequencer.cancel();
        self.speaking = false;
        self.matching = None;
        self.screen = AppScreen::Setup;
    }

    pub fn request_quit_matching(&mut self) {
        if self.matching.is_some() {
            self.confirm(
                "Quit the game and return to the menu?",
                ModalAction::QuitMatching,
            );
        }
    }

    // --- shared ---------------------------------------------------------

    /// Replay the current cue: the full prompt/reading pair in quiz mode,
    /// the active prompt alone in matching mode.
    pub fn repeat_cue(&mut self) {
        match self.screen {
            AppScreen::Quiz => self.speak_current_question(),
            AppScreen::Matching => {
                let segment = self
                    .matching
                    .as_ref()
                    .and_then(|v| v.session.active())
                    .map(|q| Segment::new(q.prompt.clone()));
                if let Some(segment) = segment {
                    self.current_seq = self.sequencer.play(
                        vec![segment],
                        &self.voice,
                        self.config.normalized_rate(),
                    );
                    self.speaking = true;
                }
            }
            _ => {}
        }
    }

    /// Due presentational deadlines fire here; everything else is a redraw.
    pub fn on_tick(&mut self, now: Instant) {
        let mut fire_pick = false;
        if let Some(view) = self.matching.as_mut() {
            if view.shake.as_ref().is_some_and(|(_, until)| now >= *until) {
                view.shake = None;
            }
            if view.pending_pick_at.is_some_and(|due| now >= due) {
                fire_pick = true;
            }
        }
        if fire_pick {
            self.matching_pick(now);
        }
    }

    /// Completion of a superseded sequence carries an old generation and
    /// is dropped here.
    pub fn on_speech_done(&mut self, generation: u64) {
        if generation == self.current_seq {
            self.speaking = false;
        }
    }

    pub fn save_result(&mut self) {
        if self.result_saved {
            self.notice("This record is already saved");
            return;
        }
        let Some(result) = self.last_result.clone() else {
            return;
        };
        match self.store.as_ref() {
            Some(store) => match store.append_result(result) {
                Ok(history) => {
                    self.history = history;
                    self.result_saved = true;
                    self.notice("Record saved");
                }
                Err(err) => self.notice(format!("Could not save the record: {err}")),
            },
            None => self.notice("No data directory is available"),
        }
    }

    /// Top times for the result screen, with the just-finished run ranked
    /// alongside saved history even before it is saved.
    pub fn result_board(&self, n: usize) -> Vec<SessionResult> {
        let mut combined = self.history.clone();
        if !self.result_saved
            && let Some(ref result) = self.last_result
        {
            combined.results.push(result.clone());
        }
        combined.top_by_time(n).into_iter().cloned().collect()
    }

    pub fn show_history(&mut self) {
        if let Some(ref store) = self.store {
            self.history = store.load_history();
        }
        self.screen = AppScreen::History;
    }

    pub fn back_to_setup(&mut self) {
        self.has_saved_progress = self
            .store
            .as_ref()
            .is_some_and(|s| s.load_progress().is_some());
        self.screen = AppScreen::Setup;
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::Question;
    use tempfile::TempDir;

    struct SilentBackend;

    impl SpeechBackend for SilentBackend {
        fn voices(&self) -> Vec<String> {
            vec!["en".to_string()]
        }
        fn speak(&self, _text: &str, _voice: &str, _rate: f32) -> anyhow::Result<()> {
            Ok(())
        }
        fn stop(&self) {}
    }

    fn make_app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().join("data")).unwrap();
        let backend: Arc<dyn SpeechBackend> = Arc::new(SilentBackend);
        let sequencer = Sequencer::new(Arc::clone(&backend), |_| {});
        let cues = CuePlayer::new(dir.path().join("sounds"));
        let mut config = Config::default();
        config.sets_dir = dir.path().join("sets").to_string_lossy().to_string();
        let app = App::new(config, Some(store), backend, sequencer, cues);
        (dir, app)
    }

    fn questions(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| Question {
                id: i.to_string(),
                prompt: format!("word{i}"),
                reading: format!("reading{i}"),
                image: String::new(),
            })
            .collect()
    }

    fn start_quiz(app: &mut App, n: usize) {
        app.voice = "en".to_string();
        app.start_quiz("test-set".to_string(), questions(n));
    }

    #[test]
    fn quiz_answers_persist_then_clear_snapshot() {
        let (_dir, mut app) = make_app();
        start_quiz(&mut app, 2);

        app.quiz_answer(true);
        assert!(app.has_saved_progress);

        app.quiz_answer(false);
        assert!(!app.has_saved_progress);
        assert_eq!(app.screen, AppScreen::Result);
        let result = app.last_result.as_ref().unwrap();
        assert_eq!(result.score, Some(50));
        assert_eq!(result.missed.len(), 1);
    }

    #[test]
    fn interrupt_is_idempotent_and_produces_no_result() {
        let (_dir, mut app) = make_app();
        start_quiz(&mut app, 3);
        app.quiz_answer(true);

        app.interrupt_quiz();
        assert_eq!(app.screen, AppScreen::Setup);
        assert!(app.quiz.is_none());
        assert!(!app.has_saved_progress);
        assert!(app.last_result.is_none());

        // Second call is a no-op.
        app.interrupt_quiz();
        assert!(app.last_result.is_none());
    }

    #[test]
    fn empty_quiz_finishes_immediately_with_zero_score() {
        let (_dir, mut app) = make_app();
        start_quiz(&mut app, 0);
        assert_eq!(app.screen, AppScreen::Result);
        assert_eq!(app.last_result.as_ref().unwrap().score, Some(0));
    }

    #[test]
    fn resume_with_missing_voice_fails_and_keeps_snapshot() {
        let (_dir, mut app) = make_app();
        start_quiz(&mut app, 2);
        app.voice = "gone-voice".to_string();
        app.quiz_answer(true); // persists a snapshot naming gone-voice
        app.quiz = None;
        app.screen = AppScreen::Setup;

        app.resume_saved();
        assert!(app.modal.is_some(), "configuration error surfaced");
        assert!(app.quiz.is_none());
        assert!(app.has_saved_progress, "snapshot stays for a retry");
    }

    #[test]
    fn resume_restores_position() {
        let (_dir, mut app) = make_app();
        start_quiz(&mut app, 3);
        app.quiz_answer(true);
        app.quiz = None; // simulate process exit without interrupt
        app.screen = AppScreen::Setup;

        app.resume_saved();
        assert_eq!(app.screen, AppScreen::Quiz);
        let quiz = app.quiz.as_ref().unwrap();
        assert_eq!(quiz.index(), 1);
        assert_eq!(quiz.correct_count(), 1);
    }

    #[test]
    fn matching_match_schedules_pick_and_tick_fires_it() {
        let (_dir, mut app) = make_app();
        app.voice = "en".to_string();
        let now = Instant::now();
        app.start_matching("test-set".to_string(), questions(2));
        app.matching_begin(now);

        let active = app
            .matching
            .as_ref()
            .unwrap()
            .session
            .active()
            .unwrap()
            .clone();
        let key = {
            let view = app.matching.as_ref().unwrap();
            let index = view
                .session
                .display_order()
                .iter()
                .position(|q| q.id == active.id)
                .unwrap();
            card_key(index).unwrap()
        };

        app.matching_select(key, now);
        let view = app.matching.as_ref().unwrap();
        assert_eq!(view.highlight.as_deref(), Some(active.id.as_str()));
        assert!(view.pending_pick_at.is_some());
        assert!(view.session.active().is_none());

        // Before the deadline nothing fires.
        app.on_tick(now + Duration::from_millis(100));
        assert!(app.matching.as_ref().unwrap().session.active().is_none());

        // After it, the next cue is picked.
        app.on_tick(now + Duration::from_millis(600));
        assert!(app.matching.as_ref().unwrap().session.active().is_some());
    }

    #[test]
    fn matching_drains_to_result() {
        let (_dir, mut app) = make_app();
        app.voice = "en".to_string();
        let mut now = Instant::now();
        app.start_matching("test-set".to_string(), questions(3));
        app.matching_begin(now);

        for _ in 0..3 {
            let active = app
                .matching
                .as_ref()
                .unwrap()
                .session
                .active()
                .unwrap()
                .clone();
            let key = {
                let view = app.matching.as_ref().unwrap();
                let index = view
                    .session
                    .display_order()
                    .iter()
                    .position(|q| q.id == active.id)
                    .unwrap();
                card_key(index).unwrap()
            };
            app.matching_select(key, now);
            now += Duration::from_millis(600);
            app.on_tick(now);
        }

        assert_eq!(app.screen, AppScreen::Result);
        let result = app.last_result.as_ref().unwrap();
        assert!(result.time_ms.is_some());
        assert!(result.time_ms.unwrap() >= 1000);
    }

    #[test]
    fn quit_matching_is_idempotent_and_drops_deadlines() {
        let (_dir, mut app) = make_app();
        app.voice = "en".to_string();
        let now = Instant::now();
        app.start_matching("test-set".to_string(), questions(2));
        app.matching_begin(now);

        app.quit_matching();
        assert_eq!(app.screen, AppScreen::Setup);
        assert!(app.matching.is_none());
        assert!(app.last_result.is_none());

        app.quit_matching();
        assert!(app.last_result.is_none());

        // A tick after quitting must not fire stale follow-ups.
        app.on_tick(now + Duration::from_secs(1));
        assert!(app.matching.is_none());
    }

    #[test]
    fn wrong_card_shakes_and_clears_after_deadline() {
        let (_dir, mut app) = make_app();
        app.voice = "en".to_string();
        let now = Instant::now();
        app.start_matching("test-set".to_string(), questions(2));
        app.matching_begin(now);

        let active_id = app
            .matching
            .as_ref()
            .unwrap()
            .session
            .active()
            .unwrap()
            .id
            .clone();
        let wrong_key = {
            let view = app.matching.as_ref().unwrap();
            let index = view
                .session
                .display_order()
                .iter()
                .position(|q| q.id != active_id)
                .unwrap();
            card_key(index).unwrap()
        };

        app.matching_select(wrong_key, now);
        let view = app.matching.as_ref().unwrap();
        assert!(view.shake.is_some());
        assert_eq!(view.session.remaining(), 2);

        app.on_tick(now + Duration::from_millis(500));
        assert!(app.matching.as_ref().unwrap().shake.is_none());
    }

    #[test]
    fn stale_speech_completion_is_dropped() {
        let (_dir, mut app) = make_app();
        app.current_seq = 5;
        app.speaking = true;

        app.on_speech_done(3);
        assert!(app.speaking, "old generation must not clear the flag");

        app.on_speech_done(5);
        assert!(!app.speaking);
    }

    #[test]
    fn save_result_appends_once() {
        let (_dir, mut app) = make_app();
        start_quiz(&mut app, 1);
        app.quiz_answer(true);

        app.save_result();
        assert!(app.result_saved);
        assert_eq!(app.history.results.len(), 1);

        app.save_result();
        assert_eq!(app.history.results.len(), 1, "no duplicate append");
    }

    #[test]
    fn result_board_ranks_unsaved_run() {
        let (_dir, mut app) = make_app();
        app.voice = "en".to_string();
        let now = Instant::now();
        app.start_matching("test-set".to_string(), Vec::new());
        app.matching_begin(now); // empty pool finishes immediately

        let board = app.result_board(5);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].time_ms, Some(0));
    }
}
