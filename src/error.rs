use thiserror::Error;

/// User-facing failures. Anything else (fs, terminal) travels as
/// `anyhow::Error` up to the binary boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A precondition the player can correct: no set chosen, no speech
    /// voice available, or a saved session referencing a voice that no
    /// longer exists. Surfaced via modal; no state is mutated.
    #[error("{0}")]
    Configuration(String),

    /// A question set could not be fetched or parsed.
    #[error("failed to load question set '{set}': {source}")]
    Load {
        set: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub fn load(set: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Load {
            set: set.into(),
            source: Box::new(source),
        }
    }
}
