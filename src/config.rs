use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Voice name passed to the TTS backend. Empty means pick one of the
    /// preferred voices automatically.
    #[serde(default)]
    pub voice: String,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_sets_dir")]
    pub sets_dir: String,
}

fn default_speech_rate() -> f32 {
    0.9
}
fn default_level() -> String {
    "normal".to_string()
}
fn default_theme() -> String {
    "dark".to_string()
}
fn default_sets_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vocadr")
        .join("sets")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voice: String::new(),
            speech_rate: default_speech_rate(),
            level: default_level(),
            theme: default_theme(),
            sets_dir: default_sets_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vocadr")
            .join("config.toml")
    }

    /// Clamp the rate to something the TTS commands accept.
    pub fn normalized_rate(&self) -> f32 {
        self.speech_rate.clamp(0.5, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.voice, "");
        assert!((config.speech_rate - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.level, "normal");
        assert!(config.sets_dir.contains("sets"));
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let config: Config = toml::from_str(
            r#"
voice = "en-us"
level = "hard"
"#,
        )
        .unwrap();
        assert_eq!(config.voice, "en-us");
        assert_eq!(config.level, "hard");
        assert!((config.speech_rate - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.voice, deserialized.voice);
        assert_eq!(config.sets_dir, deserialized.sets_dir);
    }

    #[test]
    fn rate_is_clamped() {
        let mut config = Config::default();
        config.speech_rate = 9.0;
        assert!((config.normalized_rate() - 2.0).abs() < f32::EPSILON);
        config.speech_rate = 0.0;
        assert!((config.normalized_rate() - 0.5).abs() < f32::EPSILON);
    }
}
