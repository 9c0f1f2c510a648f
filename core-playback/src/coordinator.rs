//! # Playback Coordinator
//!
//! Owns the [`PlaybackIntent`] and reconciles it against the music player
//! and the effect pipeline.
//!
//! ## Message handling
//!
//! One method per inbound request. Music requests that arrive before the
//! player is ready only update the intent; the readiness handler replays
//! that intent exactly once. Backend failures are logged and published as
//! events but never roll back or poison the intent.
//!
//! ## Volume reconciliation
//!
//! `reconcile_volume` pushes `round(target * 100)` to a ready player. It
//! runs after every intent change and on each tick while playing, so a
//! player whose volume drifted converges within one tick.
//!
//! ## Effects
//!
//! Effects and preloads run as detached tasks holding their own handles to
//! the cache and the audio context. They never touch the intent.

use crate::audio_context::AudioContextHandle;
use crate::effects::EffectPlayer;
use crate::error::{PlaybackError, Result};
use crate::intent::{clamp_volume, PlaybackIntent};
use crate::music::{MusicPlayerAdapter, StateOutcome};
use crate::sound_cache::{PreloadReport, SoundBufferCache};
use bridge_traits::{
    PlaybackQuality, PlayerConfig, PlayerErrorCode, PlayerEvent, PlayerEventSender, PlayerState,
    VideoPlayerHost,
};
use core_async::task::JoinHandle;
use core_runtime::events::{CoreEvent, EffectEvent, EventBus, PlaybackEvent};
use core_runtime::OverlayConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct PlaybackCoordinator {
    intent: PlaybackIntent,
    music: MusicPlayerAdapter,
    effects: EffectPlayer,
    events: EventBus,
    default_play_volume: f64,
    applied_volume: Option<u8>,
}

impl PlaybackCoordinator {
    pub fn new(config: &OverlayConfig, events: EventBus) -> Self {
        let audio = Arc::new(AudioContextHandle::new(Arc::clone(&config.audio_output)));
        let cache = Arc::new(SoundBufferCache::new(
            Arc::clone(&config.http_client),
            Arc::clone(&audio),
            config.effects_base_url.clone(),
        ));

        Self {
            intent: PlaybackIntent::new(config.default_quality.clone()),
            music: MusicPlayerAdapter::new(),
            effects: EffectPlayer::new(cache, audio),
            events,
            default_play_volume: clamp_volume(config.default_play_volume),
            applied_volume: None,
        }
    }

    pub fn intent(&self) -> &PlaybackIntent {
        &self.intent
    }

    pub fn is_backend_ready(&self) -> bool {
        self.music.is_ready()
    }

    pub fn cache(&self) -> &Arc<SoundBufferCache> {
        self.effects.cache()
    }

    pub fn effects(&self) -> &EffectPlayer {
        &self.effects
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Construct the music player. Its callbacks must be fed back through
    /// [`handle_player_event`](Self::handle_player_event).
    pub async fn attach_player(
        &mut self,
        host: &dyn VideoPlayerHost,
        config: PlayerConfig,
        events: PlayerEventSender,
    ) -> Result<()> {
        self.music.attach(host, config, events).await
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Set the quality used by subsequent loads.
    pub fn init(&mut self, quality: Option<PlaybackQuality>) {
        if let Some(quality) = quality {
            info!(quality = %quality, "Preferred quality set");
            self.intent.set_preferred_quality(quality);
        }
    }

    #[instrument(skip(self))]
    pub async fn play_request(
        &mut self,
        track_id: &str,
        volume: Option<f64>,
        start_seconds: Option<f64>,
    ) {
        if track_id.is_empty() {
            warn!("Ignoring play request without a track id");
            return;
        }
        let volume = volume.unwrap_or(self.default_play_volume);

        if !self.music.is_ready() {
            debug!(track_id, "Player not ready, recording intent");
            self.intent.start(track_id, volume, start_seconds);
            return;
        }

        if !self.intent.is_current(track_id) {
            self.intent.start(track_id, volume, start_seconds);
            let start = self.intent.take_deferred_start().unwrap_or(0.0);
            self.load_current(track_id, start).await;
        } else if !self.intent.is_playing() {
            self.intent.resume();
            self.intent.set_target_volume(volume);
            self.resume_current(track_id, start_seconds).await;
        } else {
            debug!(track_id, "Track already playing, updating volume only");
            self.intent.set_target_volume(volume);
        }

        self.reconcile_volume().await;
    }

    #[instrument(skip(self))]
    pub async fn stop_request(&mut self) {
        if self.music.is_ready() {
            if let Err(e) = self.music.stop().await {
                self.report_backend_error(e);
            }
            if let Err(e) = self.music.clear().await {
                self.report_backend_error(e);
            }
        }
        self.intent.reset();
        self.reconcile_volume().await;
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
    }

    /// A missing volume means silence.
    pub async fn volume_update_request(&mut self, volume: Option<f64>) {
        self.intent.set_target_volume(volume.unwrap_or(0.0));
        self.reconcile_volume().await;
    }

    /// Play an effect on a detached task.
    pub fn effect_request(&self, sound: String, volume: f64) -> JoinHandle<()> {
        let effects = self.effects.clone();
        let events = self.events.clone();
        core_async::spawn(async move {
            let event = match effects.play(&sound, volume).await {
                Ok(gain) => EffectEvent::Played { sound, gain },
                Err(e) => {
                    warn!(sound = %sound, error = %e, "Effect playback failed");
                    EffectEvent::Failed {
                        sound,
                        message: e.to_string(),
                    }
                }
            };
            events.emit(CoreEvent::Effect(event)).ok();
        })
    }

    /// Preload effects on a detached task.
    pub fn preload_request(&self, sounds: Vec<String>) -> JoinHandle<PreloadReport> {
        let cache = Arc::clone(self.effects.cache());
        let events = self.events.clone();
        core_async::spawn(async move {
            let report = cache.preload_all(sounds).await;
            for sound in &report.loaded {
                events
                    .emit(CoreEvent::Effect(EffectEvent::Preloaded {
                        sound: sound.clone(),
                    }))
                    .ok();
            }
            for failure in &report.failed {
                events
                    .emit(CoreEvent::Effect(EffectEvent::Failed {
                        sound: failure.key.clone(),
                        message: failure.error.clone(),
                    }))
                    .ok();
            }
            report
        })
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Push the target volume to a ready player.
    pub async fn reconcile_volume(&mut self) {
        if !self.music.is_ready() {
            return;
        }
        let percent = self.intent.volume_percent();
        match self.music.set_volume(percent).await {
            Ok(()) => {
                if self.applied_volume != Some(percent) {
                    debug!(percent, "Volume applied");
                    self.applied_volume = Some(percent);
                    self.emit(CoreEvent::Playback(PlaybackEvent::VolumeApplied { percent }));
                }
            }
            Err(e) => {
                warn!(percent, error = %e, "Volume reconciliation failed");
                self.applied_volume = None;
            }
        }
    }

    /// Periodic reconciliation. No-op unless playing.
    pub async fn on_tick(&mut self) {
        if self.intent.is_playing() {
            self.reconcile_volume().await;
        }
    }

    // ========================================================================
    // Player callbacks
    // ========================================================================

    pub async fn handle_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready => self.on_ready().await,
            PlayerEvent::StateChange(state) => self.on_state_change(state).await,
            PlayerEvent::Error(code) => self.on_player_error(code),
        }
    }

    async fn on_ready(&mut self) {
        if !self.music.mark_ready() {
            debug!("Ignoring duplicate readiness signal");
            return;
        }
        info!("Music player ready");
        self.emit(CoreEvent::Playback(PlaybackEvent::BackendReady));

        let quality = self.intent.preferred_quality().clone();
        if let Err(e) = self.music.set_quality(quality).await {
            self.report_backend_error(e);
        }

        if self.intent.is_playing() {
            if let Some(track_id) = self.intent.track_id().map(str::to_string) {
                let start = self.intent.take_deferred_start().unwrap_or(0.0);
                info!(track_id = %track_id, start, "Replaying deferred playback");
                self.load_current(&track_id, start).await;
            }
        }
        self.reconcile_volume().await;
    }

    async fn on_state_change(&mut self, state: PlayerState) {
        self.emit(CoreEvent::Playback(PlaybackEvent::StateChanged { state }));
        if !self.music.is_ready() {
            return;
        }
        match self
            .music
            .handle_state_change(&state, self.intent.is_playing())
            .await
        {
            Ok(StateOutcome::Looped) => {
                if let Some(track_id) = self.intent.track_id() {
                    debug!(track_id, "Track ended, looping");
                    self.emit(CoreEvent::Playback(PlaybackEvent::Looped {
                        track_id: track_id.to_string(),
                    }));
                }
            }
            Ok(StateOutcome::Observed) => {}
            Err(e) => self.report_backend_error(e),
        }
    }

    fn on_player_error(&self, code: PlayerErrorCode) {
        let err = self.music.player_error(&code);
        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            track_id: self.intent.track_id().map(str::to_string),
            code: Some(code.code()),
            message: err.to_string(),
            recoverable: false,
        }));
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load_current(&mut self, track_id: &str, start_seconds: f64) {
        let quality = self.intent.preferred_quality().clone();
        match self.music.load(track_id, start_seconds, quality).await {
            Ok(()) => {
                info!(track_id, start_seconds, "Track loading");
                self.emit(CoreEvent::Playback(PlaybackEvent::TrackLoading {
                    track_id: track_id.to_string(),
                    start_seconds,
                }));
            }
            Err(e) => self.report_backend_error(e),
        }
    }

    async fn resume_current(&mut self, track_id: &str, start_seconds: Option<f64>) {
        if self.music.loaded_track() != Some(track_id) {
            self.load_current(track_id, start_seconds.unwrap_or(0.0)).await;
            return;
        }
        if let Some(seconds) = start_seconds {
            if let Err(e) = self.music.seek(seconds).await {
                self.report_backend_error(e);
            }
        }
        match self.music.play().await {
            Ok(()) => self.emit(CoreEvent::Playback(PlaybackEvent::Resumed {
                track_id: track_id.to_string(),
            })),
            Err(e) => self.report_backend_error(e),
        }
    }

    fn report_backend_error(&self, err: PlaybackError) {
        warn!(error = %err, "Music backend command failed");
        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            track_id: self.intent.track_id().map(str::to_string),
            code: None,
            message: err.to_string(),
            recoverable: err.is_transient(),
        }));
    }

    fn emit(&self, event: CoreEvent) {
        self.events.emit(event).ok();
    }
}
