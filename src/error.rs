use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::event::SessionId;

/// Failures a dialog turn can end in. All of them are absorbed by the reactor:
/// the user hears either nothing or a narrated message, and the engine returns
/// to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogFailure {
    /// Recognizer failed to initialize or start.
    RecognitionUnavailable,
    /// Recognizer produced no usable transcript. Silent.
    NoMatch,
    /// Transcript matched no known phrase or pattern.
    DecodeUnknown,
    /// Narration engine unusable; speech degrades to no-ops.
    NarrationUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("capture session {0:?} is already listening")]
    AlreadyListening(SessionId),

    #[error("speech recognition unavailable: {0}")]
    RecognitionUnavailable(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings store lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PhrasebookError {
    #[error("navigation prefix must not be empty")]
    EmptyNavigationPrefix,

    #[error("phrase {phrase:?} appears more than once in the {table} table")]
    DuplicatePhrase { table: &'static str, phrase: String },

    #[error("intent {0} cannot be bound to a fixed command phrase")]
    UnbindableIntent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
