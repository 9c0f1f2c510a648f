//! Streaming video player bridge.
//!
//! Background music comes from a third-party embeddable video player. The
//! player is constructed by the host ([`VideoPlayerHost`]) and reports its
//! lifecycle asynchronously through [`PlayerEvent`]s: a one-time `Ready`,
//! state changes, and error codes. Calling into a player before its `Ready`
//! event is undefined in the underlying API; the core guarantees it never
//! does.

use async_trait::async_trait;
use core_async::sync::mpsc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Suggested playback quality. Unknown labels are carried through verbatim
/// so newer player builds keep working.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlaybackQuality {
    Tiny,
    Small,
    Medium,
    Large,
    Hd720,
    Hd1080,
    HighRes,
    /// Let the player choose.
    Default,
    Other(String),
}

impl PlaybackQuality {
    pub fn as_str(&self) -> &str {
        match self {
            PlaybackQuality::Tiny => "tiny",
            PlaybackQuality::Small => "small",
            PlaybackQuality::Medium => "medium",
            PlaybackQuality::Large => "large",
            PlaybackQuality::Hd720 => "hd720",
            PlaybackQuality::Hd1080 => "hd1080",
            PlaybackQuality::HighRes => "highres",
            PlaybackQuality::Default => "default",
            PlaybackQuality::Other(label) => label,
        }
    }
}

impl From<String> for PlaybackQuality {
    fn from(label: String) -> Self {
        match label.as_str() {
            "tiny" => PlaybackQuality::Tiny,
            "small" => PlaybackQuality::Small,
            "medium" => PlaybackQuality::Medium,
            "large" => PlaybackQuality::Large,
            "hd720" => PlaybackQuality::Hd720,
            "hd1080" => PlaybackQuality::Hd1080,
            "highres" => PlaybackQuality::HighRes,
            "default" => PlaybackQuality::Default,
            _ => PlaybackQuality::Other(label),
        }
    }
}

impl From<&str> for PlaybackQuality {
    fn from(label: &str) -> Self {
        PlaybackQuality::from(label.to_string())
    }
}

impl From<PlaybackQuality> for String {
    fn from(quality: PlaybackQuality) -> Self {
        quality.as_str().to_string()
    }
}

impl fmt::Display for PlaybackQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player state as reported by state-change callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Other(i32),
}

impl PlayerState {
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => PlayerState::Unstarted,
            0 => PlayerState::Ended,
            1 => PlayerState::Playing,
            2 => PlayerState::Paused,
            3 => PlayerState::Buffering,
            5 => PlayerState::Cued,
            other => PlayerState::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cued => 5,
            PlayerState::Other(code) => *code,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Unstarted => f.write_str("Unstarted"),
            PlayerState::Ended => f.write_str("Ended"),
            PlayerState::Playing => f.write_str("Playing"),
            PlayerState::Paused => f.write_str("Paused"),
            PlayerState::Buffering => f.write_str("Buffering"),
            PlayerState::Cued => f.write_str("Video Cued"),
            PlayerState::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Error codes reported by the player's error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerErrorCode {
    /// 2
    InvalidParameter,
    /// 5
    Html5Error,
    /// 100
    NotFound,
    /// 101 or 150; the raw code is kept.
    EmbeddingDisallowed(i32),
    Other(i32),
}

impl PlayerErrorCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => PlayerErrorCode::InvalidParameter,
            5 => PlayerErrorCode::Html5Error,
            100 => PlayerErrorCode::NotFound,
            101 | 150 => PlayerErrorCode::EmbeddingDisallowed(code),
            other => PlayerErrorCode::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            PlayerErrorCode::InvalidParameter => 2,
            PlayerErrorCode::Html5Error => 5,
            PlayerErrorCode::NotFound => 100,
            PlayerErrorCode::EmbeddingDisallowed(code) | PlayerErrorCode::Other(code) => *code,
        }
    }

    pub fn is_embedding_disallowed(&self) -> bool {
        matches!(self, PlayerErrorCode::EmbeddingDisallowed(_))
    }

    pub fn description(&self) -> &'static str {
        match self {
            PlayerErrorCode::InvalidParameter => "invalid parameter",
            PlayerErrorCode::Html5Error => "HTML5 player error",
            PlayerErrorCode::NotFound => "video not found",
            PlayerErrorCode::EmbeddingDisallowed(_) => {
                "video does not allow playback in embedded players"
            }
            PlayerErrorCode::Other(_) => "unknown player error",
        }
    }
}

/// Asynchronous notifications delivered by the host player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Ready,
    StateChange(PlayerState),
    Error(PlayerErrorCode),
}

/// Channel the host pushes [`PlayerEvent`]s into.
pub type PlayerEventSender = mpsc::UnboundedSender<PlayerEvent>;

/// Embed parameters passed to the player at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVars {
    pub autoplay: bool,
    pub controls: bool,
    pub disable_keyboard: bool,
    pub fullscreen_button: bool,
    pub modest_branding: bool,
    pub plays_inline: bool,
    pub related_videos: bool,
    pub show_info: bool,
    /// Embedding page origin, when the host knows it.
    pub origin: Option<String>,
}

impl Default for PlayerVars {
    fn default() -> Self {
        Self {
            autoplay: true,
            controls: false,
            disable_keyboard: true,
            fullscreen_button: false,
            modest_branding: true,
            plays_inline: true,
            related_videos: false,
            show_info: false,
            origin: None,
        }
    }
}

/// Player construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Id of the element the player mounts into.
    pub element_id: String,
    pub width: u32,
    pub height: u32,
    pub vars: PlayerVars,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            element_id: "player".to_string(),
            width: 640,
            height: 360,
            vars: PlayerVars::default(),
        }
    }
}

/// Arguments for [`VideoPlayer::load_video_by_id`]. Loading starts playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadVideoRequest {
    pub video_id: String,
    pub start_seconds: f64,
    pub suggested_quality: PlaybackQuality,
}

/// Commands accepted by a player that has signalled `Ready`.
#[async_trait]
pub trait VideoPlayer: Send + Sync {
    async fn load_video_by_id(&self, request: LoadVideoRequest) -> Result<()>;

    async fn play_video(&self) -> Result<()>;

    async fn pause_video(&self) -> Result<()>;

    async fn stop_video(&self) -> Result<()>;

    /// Release the loaded media.
    async fn clear_video(&self) -> Result<()>;

    async fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<()>;

    /// Volume as an integer percentage, `0..=100`.
    async fn set_volume(&self, percent: u8) -> Result<()>;

    async fn set_playback_quality(&self, quality: PlaybackQuality) -> Result<()>;
}

/// Constructs the player once the host's player API is available.
///
/// The returned handle must not be commanded until a [`PlayerEvent::Ready`]
/// has been sent on `events`.
#[async_trait]
pub trait VideoPlayerHost: Send + Sync {
    async fn create_player(
        &self,
        config: PlayerConfig,
        events: PlayerEventSender,
    ) -> Result<Arc<dyn VideoPlayer>>;
}
