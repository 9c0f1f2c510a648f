//! Recording test doubles for the bridge traits.
//!
//! Each double records what the core asked of it so tests can assert on
//! exact command sequences (how many loads, which volumes, which gains).

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::{AudioContextState, AudioOutput, AudioOutputFactory, DecodedAudio, OneShotVoice};
use crate::display::{ZoneBanner, ZoneDisplay};
use crate::error::{BridgeError, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::video::{
    LoadVideoRequest, PlaybackQuality, PlayerConfig, PlayerEvent, PlayerEventSender, VideoPlayer,
    VideoPlayerHost,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Clone)]
enum Route {
    Body(Bytes),
    Status(u16),
    TransportError,
}

/// HTTP client answering from a fixed route table. Unknown URLs get a 404.
#[derive(Debug, Default)]
pub struct StaticHttpClient {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StaticHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 at `url`.
    pub fn with_body(self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        lock(&self.routes).insert(url.into(), Route::Body(body.into()));
        self
    }

    /// Answer `url` with an empty body and the given status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        lock(&self.routes).insert(url.into(), Route::Status(status));
        self
    }

    /// Fail requests for `url` before any response arrives.
    pub fn with_transport_error(self, url: impl Into<String>) -> Self {
        lock(&self.routes).insert(url.into(), Route::TransportError);
        self
    }

    /// Delay every response, to widen race windows in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the route for `url` after construction.
    pub fn set_body(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        lock(&self.routes).insert(url.into(), Route::Body(body.into()));
    }

    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        lock(&self.requests).iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HttpClient for StaticHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        lock(&self.requests).push(request.url.clone());
        if let Some(delay) = self.delay {
            core_async::sleep(delay).await;
        }
        let route = lock(&self.routes).get(&request.url).cloned();
        match route {
            Some(Route::Body(body)) => Ok(HttpResponse::new(200, body)),
            Some(Route::Status(status)) => Ok(HttpResponse::new(status, Bytes::new())),
            Some(Route::TransportError) => Err(BridgeError::OperationFailed(format!(
                "connection refused: {}",
                request.url
            ))),
            None => Ok(HttpResponse::new(404, Bytes::new())),
        }
    }
}

// ============================================================================
// Audio
// ============================================================================

/// Bytes starting with this prefix fail to decode.
pub const UNDECODABLE_PREFIX: &[u8] = b"BAD";

/// Audio output that records voices instead of producing sound.
#[derive(Debug)]
pub struct RecordingAudioOutput {
    state: Mutex<AudioContextState>,
    fail_resume: AtomicBool,
    resume_calls: AtomicUsize,
    decode_calls: AtomicUsize,
    voices: Mutex<Vec<OneShotVoice>>,
}

impl RecordingAudioOutput {
    /// Starts suspended, like a browser context created before any gesture.
    pub fn new() -> Self {
        Self::with_state(AudioContextState::Suspended)
    }

    pub fn with_state(state: AudioContextState) -> Self {
        Self {
            state: Mutex::new(state),
            fail_resume: AtomicBool::new(false),
            resume_calls: AtomicUsize::new(0),
            decode_calls: AtomicUsize::new(0),
            voices: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::SeqCst);
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls.load(Ordering::SeqCst)
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    pub fn voices(&self) -> Vec<OneShotVoice> {
        lock(&self.voices).clone()
    }

    pub fn gains(&self) -> Vec<f32> {
        lock(&self.voices).iter().map(|v| v.gain).collect()
    }
}

impl Default for RecordingAudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for RecordingAudioOutput {
    fn state(&self) -> AudioContextState {
        *lock(&self.state)
    }

    async fn resume(&self) -> Result<()> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed(
                "resume rejected by autoplay policy".to_string(),
            ));
        }
        *lock(&self.state) = AudioContextState::Running;
        Ok(())
    }

    async fn decode_audio_data(&self, data: Bytes) -> Result<DecodedAudio> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        if data.starts_with(UNDECODABLE_PREFIX) {
            return Err(BridgeError::Decode("unrecognised container".to_string()));
        }
        let samples = data.iter().map(|b| *b as f32 / 255.0).collect();
        Ok(DecodedAudio::new(samples, 48_000, 1))
    }

    fn start_voice(&self, voice: OneShotVoice) -> Result<()> {
        if self.state() == AudioContextState::Closed {
            return Err(BridgeError::NotAvailable("audio context closed".to_string()));
        }
        lock(&self.voices).push(voice);
        Ok(())
    }
}

/// Factory handing out one shared [`RecordingAudioOutput`].
#[derive(Debug)]
pub struct RecordingAudioOutputFactory {
    output: Arc<RecordingAudioOutput>,
    created: AtomicUsize,
}

impl RecordingAudioOutputFactory {
    pub fn new(output: Arc<RecordingAudioOutput>) -> Self {
        Self {
            output,
            created: AtomicUsize::new(0),
        }
    }

    pub fn output(&self) -> Arc<RecordingAudioOutput> {
        Arc::clone(&self.output)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl AudioOutputFactory for RecordingAudioOutputFactory {
    fn create_context(&self) -> Result<Arc<dyn AudioOutput>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let output: Arc<dyn AudioOutput> = self.output.clone();
        Ok(output)
    }
}

// ============================================================================
// Video
// ============================================================================

/// A command issued to the player, as recorded by [`RecordingVideoPlayer`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Load(LoadVideoRequest),
    Play,
    Pause,
    Stop,
    Clear,
    Seek { seconds: f64, allow_seek_ahead: bool },
    SetVolume(u8),
    SetQuality(PlaybackQuality),
}

/// Video player that records every command.
#[derive(Debug, Default)]
pub struct RecordingVideoPlayer {
    commands: Mutex<Vec<PlayerCommand>>,
    fail_commands: AtomicBool,
}

impl RecordingVideoPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command return an error.
    pub fn fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<PlayerCommand> {
        lock(&self.commands).clone()
    }

    pub fn clear_commands(&self) {
        lock(&self.commands).clear();
    }

    pub fn count(&self, predicate: impl Fn(&PlayerCommand) -> bool) -> usize {
        lock(&self.commands).iter().filter(|c| predicate(c)).count()
    }

    pub fn loads(&self) -> Vec<LoadVideoRequest> {
        lock(&self.commands)
            .iter()
            .filter_map(|c| match c {
                PlayerCommand::Load(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.count(|c| matches!(c, PlayerCommand::Play))
    }

    /// Most recent volume pushed to the player.
    pub fn last_volume(&self) -> Option<u8> {
        lock(&self.commands).iter().rev().find_map(|c| match c {
            PlayerCommand::SetVolume(percent) => Some(*percent),
            _ => None,
        })
    }

    fn record(&self, command: PlayerCommand) -> Result<()> {
        lock(&self.commands).push(command);
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("player rejected command".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VideoPlayer for RecordingVideoPlayer {
    async fn load_video_by_id(&self, request: LoadVideoRequest) -> Result<()> {
        self.record(PlayerCommand::Load(request))
    }

    async fn play_video(&self) -> Result<()> {
        self.record(PlayerCommand::Play)
    }

    async fn pause_video(&self) -> Result<()> {
        self.record(PlayerCommand::Pause)
    }

    async fn stop_video(&self) -> Result<()> {
        self.record(PlayerCommand::Stop)
    }

    async fn clear_video(&self) -> Result<()> {
        self.record(PlayerCommand::Clear)
    }

    async fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<()> {
        self.record(PlayerCommand::Seek {
            seconds,
            allow_seek_ahead,
        })
    }

    async fn set_volume(&self, percent: u8) -> Result<()> {
        self.record(PlayerCommand::SetVolume(percent))
    }

    async fn set_playback_quality(&self, quality: PlaybackQuality) -> Result<()> {
        self.record(PlayerCommand::SetQuality(quality))
    }
}

/// Player host returning a shared [`RecordingVideoPlayer`] and keeping the
/// event sender so tests can fire player callbacks.
#[derive(Debug, Default)]
pub struct RecordingVideoPlayerHost {
    player: Arc<RecordingVideoPlayer>,
    events: Mutex<Option<PlayerEventSender>>,
    configs: Mutex<Vec<PlayerConfig>>,
    fail_create: AtomicBool,
}

impl RecordingVideoPlayerHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self) -> Arc<RecordingVideoPlayer> {
        Arc::clone(&self.player)
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn configs(&self) -> Vec<PlayerConfig> {
        lock(&self.configs).clone()
    }

    /// Deliver a player callback. Returns `false` if no player was created
    /// yet or the receiving side is gone.
    pub fn emit(&self, event: PlayerEvent) -> bool {
        match lock(&self.events).as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl VideoPlayerHost for RecordingVideoPlayerHost {
    async fn create_player(
        &self,
        config: PlayerConfig,
        events: PlayerEventSender,
    ) -> Result<Arc<dyn VideoPlayer>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("player API not loaded".to_string()));
        }
        lock(&self.configs).push(config);
        *lock(&self.events) = Some(events);
        let player: Arc<dyn VideoPlayer> = self.player.clone();
        Ok(player)
    }
}

// ============================================================================
// Display
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneCall {
    Show(ZoneBanner),
    Hide,
}

#[derive(Debug, Default)]
pub struct RecordingZoneDisplay {
    calls: Mutex<Vec<ZoneCall>>,
}

impl RecordingZoneDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ZoneCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ZoneDisplay for RecordingZoneDisplay {
    async fn show_zone(&self, banner: &ZoneBanner) -> Result<()> {
        lock(&self.calls).push(ZoneCall::Show(banner.clone()));
        Ok(())
    }

    async fn hide(&self) -> Result<()> {
        lock(&self.calls).push(ZoneCall::Hide);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_client_routes() {
        let client = StaticHttpClient::new()
            .with_body("a", Bytes::from_static(b"abc"))
            .with_status("b", 500)
            .with_transport_error("c");

        assert_eq!(client.fetch_bytes("a").await.unwrap(), Bytes::from_static(b"abc"));
        assert!(matches!(
            client.fetch_bytes("b").await,
            Err(BridgeError::HttpStatus { status: 500, .. })
        ));
        assert!(matches!(
            client.fetch_bytes("c").await,
            Err(BridgeError::OperationFailed(_))
        ));
        assert!(matches!(
            client.fetch_bytes("missing").await,
            Err(BridgeError::HttpStatus { status: 404, .. })
        ));
        assert_eq!(client.request_count("a"), 1);
    }

    #[tokio::test]
    async fn recording_player_tracks_last_volume() {
        let player = RecordingVideoPlayer::new();
        player.set_volume(10).await.unwrap();
        player.play_video().await.unwrap();
        player.set_volume(30).await.unwrap();
        assert_eq!(player.last_volume(), Some(30));
        assert_eq!(player.play_count(), 1);
    }
}
