use thiserror::Error;

/// Failures inside the engine. None of these ever reach a UI caller: every
/// play operation catches them at its boundary, logs, and stays silent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No output device, permission denied, or unsupported stream format.
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),

    /// The real-time renderer module could not be installed.
    #[error("Failed to load renderer module `{path}`: {reason}")]
    ModuleLoadFailed { path: String, reason: String },

    /// Something went wrong while producing a single tone or noise block.
    #[error("Render failure: {0}")]
    RenderFailure(String),
}

impl AudioError {
    pub fn module_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        AudioError::ModuleLoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
