use std::fs;
use std::path::PathBuf;

use rust_embed::Embed;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Embed)]
#[folder = "assets/sets/"]
struct BundledSets;

/// One unit of drill content. `prompt` is always spoken first; `reading`
/// is the visible prompt in quiz mode and is spoken after the level delay;
/// `image` identifies the card face in matching mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(alias = "A")]
    pub prompt: String,
    #[serde(alias = "B")]
    pub reading: String,
    #[serde(default)]
    pub image: String,
}

/// Resolves set ids to question lists. User files in `sets_dir` shadow
/// bundled sets of the same id.
pub struct SetCatalog {
    sets_dir: Option<PathBuf>,
}

impl SetCatalog {
    pub fn new(sets_dir: Option<PathBuf>) -> Self {
        Self { sets_dir }
    }

    /// All known set ids, user sets first, sorted and deduplicated.
    pub fn available(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();

        if let Some(ref dir) = self.sets_dir
            && let Ok(entries) = fs::read_dir(dir)
        {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json")
                    && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                {
                    ids.push(stem.to_string());
                }
            }
        }

        for file in BundledSets::iter() {
            if let Some(stem) = file.strip_suffix(".json") {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        ids.dedup();
        ids
    }

    pub fn load(&self, id: &str) -> Result<Vec<Question>, Error> {
        let filename = format!("{id}.json");

        if let Some(ref dir) = self.sets_dir {
            let path = dir.join(&filename);
            if path.exists() {
                let content = fs::read_to_string(&path).map_err(|e| Error::load(id, e))?;
                return parse_set(id, &content);
            }
        }

        if let Some(file) = BundledSets::get(&filename) {
            let content = std::str::from_utf8(file.data.as_ref())
                .map_err(|e| Error::load(id, e))?
                .to_string();
            return parse_set(id, &content);
        }

        Err(Error::Configuration(format!("unknown question set '{id}'")))
    }

    /// Download a set into `sets_dir` so it shows up in `available()`.
    /// The id is taken from the final path segment of the URL.
    #[cfg(feature = "network")]
    pub fn fetch(&self, url: &str) -> Result<String, Error> {
        let id = url
            .rsplit('/')
            .next()
            .and_then(|name| name.strip_suffix(".json").or(Some(name)))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Configuration(format!("cannot derive a set id from '{url}'")))?
            .to_string();

        let body = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| Error::load(&id, e))?;

        // Validate before writing anything to disk.
        parse_set(&id, &body)?;

        let dir = self
            .sets_dir
            .clone()
            .ok_or_else(|| Error::Configuration("no sets directory configured".to_string()))?;
        fs::create_dir_all(&dir).map_err(|e| Error::load(&id, e))?;
        fs::write(dir.join(format!("{id}.json")), &body).map_err(|e| Error::load(&id, e))?;
        Ok(id)
    }
}

fn parse_set(id: &str, content: &str) -> Result<Vec<Question>, Error> {
    let questions: Vec<Question> =
        serde_json::from_str(content).map_err(|e| Error::load(id, e))?;

    for (i, q) in questions.iter().enumerate() {
        if q.id.is_empty() {
            return Err(Error::load(
                id,
                serde_json::Error::custom(format!("question {i} has an empty id")),
            ));
        }
        if questions[..i].iter().any(|prev| prev.id == q.id) {
            return Err(Error::load(
                id,
                serde_json::Error::custom(format!("duplicate question id '{}'", q.id)),
            ));
        }
    }

    Ok(questions)
}
