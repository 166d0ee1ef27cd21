use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};

/// Seam between the sequencer and whatever actually produces sound.
/// `speak` blocks until the utterance has finished or `stop` killed it.
pub trait SpeechBackend: Send + Sync {
    fn voices(&self) -> Vec<String>;
    fn speak(&self, text: &str, voice: &str, rate: f32) -> Result<()>;
    /// Best-effort stop of the utterance currently inside `speak`.
    fn stop(&self);
}

/// Words-per-minute the rate factor scales. Matches the default speed of
/// both espeak-ng and macOS `say`.
const BASE_WPM: f32 = 175.0;

/// Shells out to a local TTS command. One child process at a time.
pub struct CommandBackend {
    program: String,
    current: Mutex<Option<Child>>,
}

impl CommandBackend {
    /// Look for a known TTS command on PATH.
    pub fn detect() -> Option<Self> {
        ["espeak-ng", "espeak", "say"]
            .iter()
            .find(|p| find_on_path(p))
            .map(|p| Self {
                program: p.to_string(),
                current: Mutex::new(None),
            })
    }

    #[cfg(test)]
    fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            current: Mutex::new(None),
        }
    }

    fn args(&self, text: &str, voice: &str, rate: f32) -> Vec<String> {
        let wpm = (BASE_WPM * rate).round() as u32;
        if self.program == "say" {
            vec![
                "-v".to_string(),
                voice.to_string(),
                "-r".to_string(),
                wpm.to_string(),
                text.to_string(),
            ]
        } else {
            vec![
                "-v".to_string(),
                voice.to_string(),
                "-s".to_string(),
                wpm.to_string(),
                text.to_string(),
            ]
        }
    }
}

impl SpeechBackend for CommandBackend {
    fn voices(&self) -> Vec<String> {
        if self.program == "say" {
            return list_say_voices();
        }
        // `espeak-ng --voices=en` prints a table; the VoiceName column is
        // the identifier accepted by -v.
        let output = Command::new(&self.program)
            .arg("--voices=en")
            .output()
            .ok();
        let Some(output) = output else {
            return Vec::new();
        };
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .skip(1)
            .filter_map(|line| line.split_whitespace().nth(3).map(|s| s.to_string()))
            .collect()
    }

    fn speak(&self, text: &str, voice: &str, rate: f32) -> Result<()> {
        let child = Command::new(&self.program)
            .args(self.args(text, voice, rate))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to run {}", self.program))?;

        *self.current.lock().expect("speech child lock") = Some(child);

        // Poll rather than wait() so stop() can take the child out from
        // under us without blocking on the same lock.
        loop {
            let mut guard = self.current.lock().expect("speech child lock");
            match guard.as_mut() {
                None => return Ok(()), // stopped
                Some(child) => {
                    if child.try_wait()?.is_some() {
                        *guard = None;
                        return Ok(());
                    }
                }
            }
            drop(guard);
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn stop(&self) {
        if let Some(mut child) = self.current.lock().expect("speech child lock").take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn list_say_voices() -> Vec<String> {
    let output = Command::new("say").arg("-v").arg("?").output().ok();
    let Some(output) = output else {
        return Vec::new();
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.split_whitespace().next().map(|s| s.to_string()))
        .collect()
}

fn find_on_path(program: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| dir.join(program).is_file())
}

/// Stands in when no TTS command exists on the machine. Sessions cannot
/// start without a voice, but history browsing still works.
pub struct NullBackend;

impl SpeechBackend for NullBackend {
    fn voices(&self) -> Vec<String> {
        Vec::new()
    }

    fn speak(&self, _text: &str, _voice: &str, _rate: f32) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    Success,
    Failure,
}

impl Cue {
    fn filename(self) -> &'static str {
        match self {
            Cue::Success => "success.wav",
            Cue::Failure => "failure.wav",
        }
    }
}

/// Fire-and-forget feedback sounds. Plays a wav from the sounds dir when
/// a player command exists, otherwise rings the terminal bell.
pub struct CuePlayer {
    player: Option<String>,
    sounds_dir: PathBuf,
}

impl CuePlayer {
    pub fn new(sounds_dir: PathBuf) -> Self {
        let player = ["paplay", "aplay", "afplay"]
            .iter()
            .find(|p| find_on_path(p))
            .map(|p| p.to_string());
        Self { player, sounds_dir }
    }

    pub fn play(&self, cue: Cue) {
        if let Some(ref player) = self.player {
            let path = self.sounds_dir.join(cue.filename());
            if path.exists() {
                let _ = Command::new(player)
                    .arg(&path)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn();
                return;
            }
        }
        let mut out = std::io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_scales_words_per_minute() {
        let backend = CommandBackend::with_program("espeak-ng");
        let args = backend.args("hello", "en", 0.9);
        assert_eq!(args, vec!["-v", "en", "-s", "158", "hello"]);
    }

    #[test]
    fn say_uses_rate_flag() {
        let backend = CommandBackend::with_program("say");
        let args = backend.args("hello", "Samantha", 1.0);
        assert_eq!(args, vec!["-v", "Samantha", "-r", "175", "hello"]);
    }
}
