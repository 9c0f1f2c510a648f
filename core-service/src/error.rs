use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Malformed message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    #[error("Overlay service has stopped")]
    ServiceStopped,

    #[error("Overlay service task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
