//! # Playback Error Types
//!
//! Error types for music and sound effect operations. None of these are
//! fatal to the coordinator: every failure is logged at the boundary and the
//! playback intent is left as it was.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Fetch Errors
    // ========================================================================
    /// The effect resource answered with a non-success status.
    #[error("Fetching {url} failed with HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    /// The request never completed (connection refused, timeout, ...).
    #[error("Transport failure: {0}")]
    Transport(String),

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// The fetched bytes could not be decoded into audio.
    #[error("Cannot decode audio: {0}")]
    Decode(String),

    // ========================================================================
    // Music Backend Errors
    // ========================================================================
    /// A command was attempted before the player signalled readiness.
    #[error("Music backend is not ready")]
    BackendNotReady,

    /// The player rejected a command.
    #[error("Music backend command {command} failed: {message}")]
    BackendCommand {
        command: &'static str,
        message: String,
    },

    /// The player reported an error through its error callback.
    #[error("Player error {code}: {description}")]
    Player { code: i32, description: String },

    // ========================================================================
    // Audio Output Errors
    // ========================================================================
    /// The output context could not be created or used.
    #[error("Audio context unavailable: {0}")]
    AudioContext(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// A request carried a value that cannot be acted on.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Map a bridge failure that happened while fetching `url`.
    pub fn from_fetch(url: &str, err: BridgeError) -> Self {
        match err {
            BridgeError::HttpStatus { status, url } => PlaybackError::FetchStatus { url, status },
            BridgeError::Decode(message) => PlaybackError::Decode(message),
            other => PlaybackError::Transport(format!("{url}: {other}")),
        }
    }

    /// Map a bridge failure of a player command.
    pub fn from_command(command: &'static str, err: BridgeError) -> Self {
        PlaybackError::BackendCommand {
            command,
            message: err.to_string(),
        }
    }

    /// Returns `true` if a later attempt at the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::FetchStatus { status, .. } => *status >= 500 || *status == 429,
            PlaybackError::Transport(_)
            | PlaybackError::BackendNotReady
            | PlaybackError::BackendCommand { .. }
            | PlaybackError::AudioContext(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::FetchStatus { .. } | PlaybackError::Transport(_)
        )
    }

    /// Returns `true` if the audio data itself was unusable.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, PlaybackError::Decode(_))
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::HttpStatus { status, url } => PlaybackError::FetchStatus { url, status },
            BridgeError::Decode(message) => PlaybackError::Decode(message),
            BridgeError::NotAvailable(message) => PlaybackError::AudioContext(message),
            other => PlaybackError::Internal(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
