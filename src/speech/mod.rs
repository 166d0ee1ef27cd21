pub mod backend;
pub mod sequencer;

use std::time::Duration;

use crate::speech::backend::SpeechBackend;

/// Voice names tried in order when the config does not pin one.
pub const PREFERRED_VOICES: &[&str] = &["en-us", "en-US", "en", "english"];

/// One spoken unit of a sequence. `lead` is waited out after the previous
/// segment completes and before this one starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub lead: Duration,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lead: Duration::ZERO,
        }
    }

    pub fn after(text: impl Into<String>, lead: Duration) -> Self {
        Self {
            text: text.into(),
            lead,
        }
    }
}

/// Pick a usable voice name: the requested one if the backend knows it,
/// otherwise the first preferred match, otherwise the first available.
/// `None` means no voice can be used and the session must not start.
pub fn resolve_voice(backend: &dyn SpeechBackend, requested: Option<&str>) -> Option<String> {
    let voices = backend.voices();
    match requested {
        Some(name) if !name.is_empty() => voices.iter().find(|v| *v == name).cloned(),
        _ => PREFERRED_VOICES
            .iter()
            .find_map(|p| voices.iter().find(|v| v == p).cloned())
            .or_else(|| voices.first().cloned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::backend::SpeechBackend;

    struct FixedVoices(Vec<String>);

    impl SpeechBackend for FixedVoices {
        fn voices(&self) -> Vec<String> {
            self.0.clone()
        }
        fn speak(&self, _text: &str, _voice: &str, _rate: f32) -> anyhow::Result<()> {
            Ok(())
        }
        fn stop(&self) {}
    }

    fn backend(names: &[&str]) -> FixedVoices {
        FixedVoices(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn requested_voice_must_exist() {
        let b = backend(&["en", "fr"]);
        assert_eq!(resolve_voice(&b, Some("en")), Some("en".to_string()));
        assert_eq!(resolve_voice(&b, Some("de")), None);
    }

    #[test]
    fn unpinned_prefers_known_names_then_first() {
        let b = backend(&["zh", "en", "fr"]);
        assert_eq!(resolve_voice(&b, None), Some("en".to_string()));

        let b = backend(&["zh", "fr"]);
        assert_eq!(resolve_voice(&b, None), Some("zh".to_string()));
    }

    #[test]
    fn no_voices_means_none() {
        let b = backend(&[]);
        assert_eq!(resolve_voice(&b, None), None);
        assert_eq!(resolve_voice(&b, Some("en")), None);
    }

    #[test]
    fn empty_request_behaves_like_unpinned() {
        let b = backend(&["zh", "en"]);
        assert_eq!(resolve_voice(&b, Some("")), Some("en".to_string()));
    }
}
