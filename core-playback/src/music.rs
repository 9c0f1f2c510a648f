//! # Music Player Adapter
//!
//! Wraps the third-party streaming player behind [`VideoPlayer`] and
//! normalizes its readiness lifecycle.
//!
//! The handle is created early but stays unusable until the player sends
//! [`PlayerEvent::Ready`](bridge_traits::PlayerEvent::Ready). Every command
//! issued before that is rejected with [`PlaybackError::BackendNotReady`]
//! without touching the player; the coordinator records the request as
//! intent instead.
//!
//! After readiness the configured quality is applied immediately and again
//! on every transition into `Playing`, since some players drop it on load.

use crate::error::{PlaybackError, Result};
use bridge_traits::{
    LoadVideoRequest, PlaybackQuality, PlayerConfig, PlayerErrorCode, PlayerEventSender,
    PlayerState, VideoPlayer, VideoPlayerHost,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of feeding a state change to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOutcome {
    Observed,
    /// The track ended while looping was wanted and `play` was reissued.
    Looped,
}

#[derive(Default)]
pub struct MusicPlayerAdapter {
    player: Option<Arc<dyn VideoPlayer>>,
    ready: bool,
    loaded_track: Option<String>,
    active_quality: Option<PlaybackQuality>,
}

impl MusicPlayerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the host to construct the player. Its callbacks arrive on
    /// `events`.
    pub async fn attach(
        &mut self,
        host: &dyn VideoPlayerHost,
        config: PlayerConfig,
        events: PlayerEventSender,
    ) -> Result<()> {
        let element_id = config.element_id.clone();
        let player = host
            .create_player(config, events)
            .await
            .map_err(|e| PlaybackError::from_command("create_player", e))?;
        info!(element = %element_id, "Music player created, waiting for readiness");
        self.player = Some(player);
        self.ready = false;
        Ok(())
    }

    /// Record the readiness signal. Returns `true` only for the first one.
    pub fn mark_ready(&mut self) -> bool {
        if self.ready || self.player.is_none() {
            return false;
        }
        self.ready = true;
        true
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// A handle exists and may be commanded.
    pub fn is_ready(&self) -> bool {
        self.ready && self.player.is_some()
    }

    pub fn loaded_track(&self) -> Option<&str> {
        self.loaded_track.as_deref()
    }

    fn ready_player(&self) -> Result<&Arc<dyn VideoPlayer>> {
        match &self.player {
            Some(player) if self.ready => Ok(player),
            _ => Err(PlaybackError::BackendNotReady),
        }
    }

    /// Load `track_id` at `start_seconds`. Loading starts playback.
    pub async fn load(
        &mut self,
        track_id: &str,
        start_seconds: f64,
        quality: PlaybackQuality,
    ) -> Result<()> {
        let player = self.ready_player()?;
        debug!(track_id, start_seconds, quality = %quality.as_str(), "Loading track");
        player
            .load_video_by_id(LoadVideoRequest {
                video_id: track_id.to_string(),
                start_seconds,
                suggested_quality: quality.clone(),
            })
            .await
            .map_err(|e| PlaybackError::from_command("load_video_by_id", e))?;
        self.loaded_track = Some(track_id.to_string());
        self.active_quality = Some(quality);
        Ok(())
    }

    pub async fn play(&self) -> Result<()> {
        self.ready_player()?
            .play_video()
            .await
            .map_err(|e| PlaybackError::from_command("play_video", e))
    }

    pub async fn pause(&self) -> Result<()> {
        self.ready_player()?
            .pause_video()
            .await
            .map_err(|e| PlaybackError::from_command("pause_video", e))
    }

    pub async fn stop(&self) -> Result<()> {
        self.ready_player()?
            .stop_video()
            .await
            .map_err(|e| PlaybackError::from_command("stop_video", e))
    }

    /// Release the loaded media.
    pub async fn clear(&mut self) -> Result<()> {
        self.ready_player()?
            .clear_video()
            .await
            .map_err(|e| PlaybackError::from_command("clear_video", e))?;
        self.loaded_track = None;
        Ok(())
    }

    pub async fn seek(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PlaybackError::InvalidInput(format!(
                "cannot seek to {seconds}"
            )));
        }
        self.ready_player()?
            .seek_to(seconds, true)
            .await
            .map_err(|e| PlaybackError::from_command("seek_to", e))
    }

    pub async fn set_volume(&self, percent: u8) -> Result<()> {
        self.ready_player()?
            .set_volume(percent.min(100))
            .await
            .map_err(|e| PlaybackError::from_command("set_volume", e))
    }

    /// Switch quality and keep enforcing it on later `Playing` transitions.
    pub async fn set_quality(&mut self, quality: PlaybackQuality) -> Result<()> {
        self.ready_player()?
            .set_playback_quality(quality.clone())
            .await
            .map_err(|e| PlaybackError::from_command("set_playback_quality", e))?;
        self.active_quality = Some(quality);
        Ok(())
    }

    async fn enforce_quality(&self) -> Result<()> {
        match &self.active_quality {
            Some(quality) => self
                .ready_player()?
                .set_playback_quality(quality.clone())
                .await
                .map_err(|e| PlaybackError::from_command("set_playback_quality", e)),
            None => Ok(()),
        }
    }

    /// React to a backend state transition. Entering `Ended` with
    /// `loop_active` reissues `play`; entering `Playing` re-applies quality.
    pub async fn handle_state_change(
        &self,
        state: &PlayerState,
        loop_active: bool,
    ) -> Result<StateOutcome> {
        debug!(state = ?state, "Player state changed");
        match state {
            PlayerState::Playing => {
                self.enforce_quality().await?;
                Ok(StateOutcome::Observed)
            }
            PlayerState::Ended if loop_active => {
                self.play().await?;
                Ok(StateOutcome::Looped)
            }
            _ => Ok(StateOutcome::Observed),
        }
    }

    /// Log a player-reported error and turn it into a [`PlaybackError`].
    /// Never retried.
    pub fn player_error(&self, code: &PlayerErrorCode) -> PlaybackError {
        error!(
            code = code.code(),
            track_id = ?self.loaded_track,
            "Player error: {}",
            code.description()
        );
        if code.is_embedding_disallowed() {
            error!("The owner of this track does not allow it to be played in embedded players");
        }
        PlaybackError::Player {
            code: code.code(),
            description: code.description().to_string(),
        }
    }
}
