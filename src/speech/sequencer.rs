use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::speech::backend::SpeechBackend;
use crate::speech::Segment;

/// How often a sleeping worker re-checks whether it has been superseded.
const CANCEL_POLL: Duration = Duration::from_millis(25);

struct PlayRequest {
    generation: u64,
    segments: Vec<Segment>,
    voice: String,
    rate: f32,
}

/// Plays one or two segments in strict order on a worker thread and posts
/// exactly one completion per sequence that is not superseded.
///
/// Every `play` bumps a shared generation counter; the worker compares its
/// request's generation against the counter before each wait and each
/// utterance, so a cancelled sequence stops early and never reports
/// completion. A completion that races a cancel still carries its own
/// generation, letting the receiver discard it.
pub struct Sequencer {
    backend: Arc<dyn SpeechBackend>,
    generation: Arc<AtomicU64>,
    tx: mpsc::Sender<PlayRequest>,
}

impl Sequencer {
    pub fn new<F>(backend: Arc<dyn SpeechBackend>, on_done: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let generation = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel::<PlayRequest>();

        let worker_backend = Arc::clone(&backend);
        let worker_generation = Arc::clone(&generation);
        thread::spawn(move || {
            while let Ok(request) = rx.recv() {
                if run_sequence(&request, &worker_backend, &worker_generation) {
                    on_done(request.generation);
                }
            }
        });

        Self {
            backend,
            generation,
            tx,
        }
    }

    /// Start a new sequence, cancelling any in-flight one. Returns the
    /// generation the completion event will carry.
    pub fn play(&self, segments: Vec<Segment>, voice: &str, rate: f32) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.backend.stop();
        let _ = self.tx.send(PlayRequest {
            generation,
            segments,
            voice: voice.to_string(),
            rate,
        });
        generation
    }

    /// Stop any in-flight sequence without starting a new one. Its
    /// completion event will not fire.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.backend.stop();
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Returns true when the sequence ran to its end without being superseded.
/// A backend error ends the sequence but still counts as its completion,
/// keeping the one-completion-per-sequence contract.
fn run_sequence(
    request: &PlayRequest,
    backend: &Arc<dyn SpeechBackend>,
    generation: &AtomicU64,
) -> bool {
    let stale = || generation.load(Ordering::SeqCst) != request.generation;

    if stale() {
        return false;
    }

    for segment in &request.segments {
        let mut remaining = segment.lead;
        while !remaining.is_zero() {
            if stale() {
                return false;
            }
            let step = remaining.min(CANCEL_POLL);
            thread::sleep(step);
            remaining -= step;
        }
        if stale() {
            return false;
        }
        if backend
            .speak(&segment.text, &request.voice, request.rate)
            .is_err()
        {
            break;
        }
        if stale() {
            return false;
        }
    }

    !stale()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Records utterances; each one takes `per_utterance` of wall time.
    struct RecordingBackend {
        spoken: Mutex<Vec<String>>,
        per_utterance: Duration,
    }

    impl RecordingBackend {
        fn new(per_utterance: Duration) -> Arc<Self> {
            Arc::new(Self {
                spoken: Mutex::new(Vec::new()),
                per_utterance,
            })
        }

        fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }
    }

    impl SpeechBackend for RecordingBackend {
        fn voices(&self) -> Vec<String> {
            vec!["en".to_string()]
        }

        fn speak(&self, text: &str, _voice: &str, _rate: f32) -> anyhow::Result<()> {
            thread::sleep(self.per_utterance);
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn stop(&self) {}
    }

    fn collect_done() -> (mpsc::Receiver<u64>, impl Fn(u64) + Send + 'static) {
        let (tx, rx) = mpsc::channel();
        (rx, move |generation| {
            let _ = tx.send(generation);
        })
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn segments_play_in_order_with_one_completion() {
        let backend = RecordingBackend::new(Duration::from_millis(10));
        let (done, on_done) = collect_done();
        let sequencer = Sequencer::new(backend.clone(), on_done);

        let generation = sequencer.play(
            vec![Segment::new("apple"), Segment::new("りんご")],
            "en",
            0.9,
        );

        assert_eq!(done.recv_timeout(WAIT).unwrap(), generation);
        assert_eq!(backend.spoken(), vec!["apple", "りんご"]);
        assert!(done.try_recv().is_err(), "exactly one completion");
    }

    #[test]
    fn single_segment_completes_after_that_segment() {
        let backend = RecordingBackend::new(Duration::from_millis(5));
        let (done, on_done) = collect_done();
        let sequencer = Sequencer::new(backend.clone(), on_done);

        let generation = sequencer.play(vec![Segment::new("dog")], "en", 0.9);

        assert_eq!(done.recv_timeout(WAIT).unwrap(), generation);
        assert_eq!(backend.spoken(), vec!["dog"]);
    }

    #[test]
    fn lead_delay_is_waited_out_between_segments() {
        let backend = RecordingBackend::new(Duration::from_millis(1));
        let (done, on_done) = collect_done();
        let sequencer = Sequencer::new(backend.clone(), on_done);

        let lead = Duration::from_millis(150);
        let start = Instant::now();
        sequencer.play(
            vec![Segment::new("a"), Segment::after("b", lead)],
            "en",
            0.9,
        );

        done.recv_timeout(WAIT).unwrap();
        assert!(start.elapsed() >= lead);
        assert_eq!(backend.spoken(), vec!["a", "b"]);
    }

    #[test]
    fn superseded_sequence_reports_no_completion() {
        let backend = RecordingBackend::new(Duration::from_millis(1));
        let (done, on_done) = collect_done();
        let sequencer = Sequencer::new(backend.clone(), on_done);

        // Long lead keeps the first sequence in its cancellable wait while
        // the second one supersedes it.
        let first = sequencer.play(
            vec![Segment::new("x"), Segment::after("y", Duration::from_secs(10))],
            "en",
            0.9,
        );
        let second = sequencer.play(vec![Segment::new("z")], "en", 0.9);

        assert_eq!(done.recv_timeout(WAIT).unwrap(), second);
        assert!(done.try_recv().is_err(), "first sequence must not complete");
        assert_ne!(first, second);
        assert!(!backend.spoken().contains(&"y".to_string()));
    }

    #[test]
    fn cancel_suppresses_completion() {
        let backend = RecordingBackend::new(Duration::from_millis(1));
        let (done, on_done) = collect_done();
        let sequencer = Sequencer::new(backend.clone(), on_done);

        sequencer.play(
            vec![Segment::after("late", Duration::from_secs(10))],
            "en",
            0.9,
        );
        sequencer.cancel();

        assert!(done.recv_timeout(Duration::from_millis(300)).is_err());
        assert!(backend.spoken().is_empty());
    }

    #[test]
    fn generations_increase_per_play() {
        let backend = RecordingBackend::new(Duration::ZERO);
        let (_done, on_done) = collect_done();
        let sequencer = Sequencer::new(backend, on_done);

        let a = sequencer.play(vec![Segment::new("1")], "en", 0.9);
        let b = sequencer.play(vec![Segment::new("2")], "en", 0.9);
        assert!(b > a);
        assert_eq!(sequencer.current_generation(), b);
    }
}
