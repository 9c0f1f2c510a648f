//! # Overlay Configuration Module
//!
//! Provides configuration management for the overlay audio core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `OverlayConfig` holding every host bridge and tunable the core needs. It
//! enforces fail-fast validation so a misconfigured overlay refuses to start
//! instead of misbehaving later.
//!
//! ## Required Dependencies
//!
//! - `VideoPlayerHost` - constructs the streaming player (always host-provided)
//!
//! ## Dependencies with platform defaults
//!
//! - `HttpClient` - fetches sound effects (desktop default: local assets, or
//!   reqwest when the effects base URL is absolute)
//! - `AudioOutputFactory` - creates the output context (desktop default:
//!   symphonia + cpal)
//!
//! ## Optional Dependencies
//!
//! - `ZoneDisplay` - renders the area-of-play banner (desktop default: log
//!   output)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::OverlayConfig;
//! use std::sync::Arc;
//!
//! let config = OverlayConfig::builder()
//!     .video_player_host(Arc::new(MyPlayerHost))
//!     .effects_base_url("sfx/weaponjam")
//!     .debug(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::OverlayConfig;
//!
//! // No VideoPlayerHost: fails with an actionable message
//! let config = OverlayConfig::builder()
//!     .build()
//!     .expect("Should fail - missing player host");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioOutputFactory, HttpClient, PlaybackQuality, PlayerConfig, VideoPlayerHost, ZoneDisplay,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Directory sound effects are fetched from.
pub const DEFAULT_EFFECTS_BASE_URL: &str = "sfx/weaponjam";

/// Volume used by `play` when the message carries none.
pub const DEFAULT_PLAY_VOLUME: f64 = 0.5;

/// Period of the volume reconciliation tick.
pub const DEFAULT_VOLUME_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Overlay configuration.
///
/// Use [`OverlayConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct OverlayConfig {
    /// Base URL of the effects directory; key `k` is fetched from `<base>/<k>`
    pub effects_base_url: String,

    /// Playback quality requested until an `init` message overrides it
    pub default_quality: PlaybackQuality,

    /// Volume for `play` messages without one, in `[0, 1]`
    pub default_play_volume: f64,

    /// Reconciliation period
    pub volume_tick_interval: Duration,

    /// Player construction parameters
    pub player: PlayerConfig,

    /// Broadcast buffer of the event bus
    pub event_bus_capacity: usize,

    /// Debug logging switch
    pub debug: bool,

    /// Sound effect fetcher
    pub http_client: Arc<dyn HttpClient>,

    /// Output context factory
    pub audio_output: Arc<dyn AudioOutputFactory>,

    /// Streaming player constructor (required)
    pub video_player_host: Arc<dyn VideoPlayerHost>,

    /// Zone banner renderer (optional)
    pub zone_display: Option<Arc<dyn ZoneDisplay>>,
}

impl std::fmt::Debug for OverlayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayConfig")
            .field("effects_base_url", &self.effects_base_url)
            .field("default_quality", &self.default_quality)
            .field("default_play_volume", &self.default_play_volume)
            .field("volume_tick_interval", &self.volume_tick_interval)
            .field("player", &self.player)
            .field("event_bus_capacity", &self.event_bus_capacity)
            .field("debug", &self.debug)
            .field("http_client", &"HttpClient { ... }")
            .field("audio_output", &"AudioOutputFactory { ... }")
            .field("video_player_host", &"VideoPlayerHost { ... }")
            .field(
                "zone_display",
                &self.zone_display.as_ref().map(|_| "ZoneDisplay { ... }"),
            )
            .finish()
    }
}

impl OverlayConfig {
    /// Creates a new builder.
    pub fn builder() -> OverlayConfigBuilder {
        OverlayConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The effects base URL is not empty
    /// - The default play volume is a number within `[0, 1]`
    /// - The tick interval is non-zero
    /// - The player has an element id and a non-zero size
    /// - The event bus can buffer at least one event
    pub fn validate(&self) -> Result<()> {
        if self.effects_base_url.trim_end_matches('/').is_empty() {
            return Err(Error::Config(
                "Effects base URL cannot be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.default_play_volume) {
            return Err(Error::InvalidValue {
                field: "default_play_volume".to_string(),
                message: format!("{} is outside [0, 1]", self.default_play_volume),
            });
        }

        if self.volume_tick_interval.is_zero() {
            return Err(Error::InvalidValue {
                field: "volume_tick_interval".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.player.element_id.is_empty() {
            return Err(Error::Config(
                "Player element id cannot be empty".to_string(),
            ));
        }

        if self.player.width == 0 || self.player.height == 0 {
            return Err(Error::Config(format!(
                "Player size {}x{} is not renderable",
                self.player.width, self.player.height
            )));
        }

        if self.event_bus_capacity == 0 {
            return Err(Error::InvalidValue {
                field: "event_bus_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn video_player_host_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "VideoPlayerHost".to_string(),
        message: "VideoPlayerHost implementation is required to play background music. \
                 The embedding host owns the streaming player API; inject an adapter \
                 with .video_player_host()."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to fetch sound effects. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default \
                 LocalAssetClient/ReqwestHttpClient. \
                 Web: inject a fetch-based client."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn audio_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioOutputFactory".to_string(),
        message: "AudioOutputFactory implementation is required to play sound effects. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default \
                 DesktopAudioOutputFactory. \
                 Web: inject an AudioContext-backed factory."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    effects_base_url: &str,
    asset_root: Option<PathBuf>,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::{LocalAssetClient, ReqwestHttpClient};

    let is_remote =
        effects_base_url.starts_with("http://") || effects_base_url.starts_with("https://");

    let client: Arc<dyn HttpClient> = if is_remote {
        Arc::new(ReqwestHttpClient::new().map_err(|e| {
            Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
        })?)
    } else {
        Arc::new(LocalAssetClient::new(
            asset_root.unwrap_or_else(|| PathBuf::from(".")),
        ))
    };
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _effects_base_url: &str,
    _asset_root: Option<PathBuf>,
) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutputFactory>> {
    use bridge_desktop::DesktopAudioOutputFactory;

    // The device itself is opened lazily on first effect.
    let factory: Arc<dyn AudioOutputFactory> = Arc::new(DesktopAudioOutputFactory);
    Ok(factory)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_output() -> Result<Arc<dyn AudioOutputFactory>> {
    Err(audio_output_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_zone_display() -> Option<Arc<dyn ZoneDisplay>> {
    let display: Arc<dyn ZoneDisplay> = Arc::new(bridge_desktop::TracingZoneDisplay::new());
    Some(display)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_zone_display() -> Option<Arc<dyn ZoneDisplay>> {
    None
}

/// Builder for constructing [`OverlayConfig`] instances.
#[derive(Default)]
pub struct OverlayConfigBuilder {
    effects_base_url: Option<String>,
    asset_root: Option<PathBuf>,
    default_quality: Option<PlaybackQuality>,
    default_play_volume: Option<f64>,
    volume_tick_interval: Option<Duration>,
    player: Option<PlayerConfig>,
    event_bus_capacity: Option<usize>,
    debug: bool,
    http_client: Option<Arc<dyn HttpClient>>,
    audio_output: Option<Arc<dyn AudioOutputFactory>>,
    video_player_host: Option<Arc<dyn VideoPlayerHost>>,
    zone_display: Option<Arc<dyn ZoneDisplay>>,
}

impl OverlayConfigBuilder {
    /// Sets the effects directory URL (default `sfx/weaponjam`).
    pub fn effects_base_url(mut self, url: impl Into<String>) -> Self {
        self.effects_base_url = Some(url.into());
        self
    }

    /// Directory relative effect URLs resolve against when the default
    /// desktop client is used (default: the working directory).
    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Sets the quality requested before any `init` message.
    pub fn default_quality(mut self, quality: PlaybackQuality) -> Self {
        self.default_quality = Some(quality);
        self
    }

    /// Sets the volume used when a `play` message omits one.
    pub fn default_play_volume(mut self, volume: f64) -> Self {
        self.default_play_volume = Some(volume);
        self
    }

    /// Sets the reconciliation period.
    pub fn volume_tick_interval(mut self, interval: Duration) -> Self {
        self.volume_tick_interval = Some(interval);
        self
    }

    /// Sets the player construction parameters.
    pub fn player(mut self, player: PlayerConfig) -> Self {
        self.player = Some(player);
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = Some(capacity);
        self
    }

    /// Enables verbose logging.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn audio_output(mut self, factory: Arc<dyn AudioOutputFactory>) -> Self {
        self.audio_output = Some(factory);
        self
    }

    pub fn video_player_host(mut self, host: Arc<dyn VideoPlayerHost>) -> Self {
        self.video_player_host = Some(host);
        self
    }

    pub fn zone_display(mut self, display: Arc<dyn ZoneDisplay>) -> Self {
        self.zone_display = Some(display);
        self
    }

    /// Builds the final `OverlayConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when a required bridge is absent and no default
    ///   can be provided
    /// - `Config` / `InvalidValue` when a setting fails validation
    pub fn build(self) -> Result<OverlayConfig> {
        let video_player_host = self
            .video_player_host
            .ok_or_else(video_player_host_missing_error)?;

        let effects_base_url = self
            .effects_base_url
            .unwrap_or_else(|| DEFAULT_EFFECTS_BASE_URL.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&effects_base_url, self.asset_root)?,
        };

        let audio_output = match self.audio_output {
            Some(factory) => factory,
            None => provide_default_audio_output()?,
        };

        let config = OverlayConfig {
            effects_base_url,
            default_quality: self.default_quality.unwrap_or(PlaybackQuality::Small),
            default_play_volume: self.default_play_volume.unwrap_or(DEFAULT_PLAY_VOLUME),
            volume_tick_interval: self
                .volume_tick_interval
                .unwrap_or(DEFAULT_VOLUME_TICK_INTERVAL),
            player: self.player.unwrap_or_default(),
            event_bus_capacity: self.event_bus_capacity.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            debug: self.debug,
            http_client,
            audio_output,
            video_player_host,
            zone_display: self.zone_display.or_else(provide_default_zone_display),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::mock::{
        RecordingAudioOutput, RecordingAudioOutputFactory, RecordingVideoPlayerHost,
        RecordingZoneDisplay, StaticHttpClient,
    };

    fn complete_builder() -> OverlayConfigBuilder {
        OverlayConfig::builder()
            .video_player_host(Arc::new(RecordingVideoPlayerHost::new()))
            .http_client(Arc::new(StaticHttpClient::new()))
            .audio_output(Arc::new(RecordingAudioOutputFactory::new(Arc::new(
                RecordingAudioOutput::new(),
            ))))
    }

    #[test]
    fn test_builder_requires_video_player_host() {
        let result = OverlayConfig::builder()
            .http_client(Arc::new(StaticHttpClient::new()))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("VideoPlayerHost"));
        assert!(err_msg.contains(".video_player_host()"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client_without_shims() {
        let result = OverlayConfig::builder()
            .video_player_host(Arc::new(RecordingVideoPlayerHost::new()))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "HttpClient"
        ));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_audio_output_without_shims() {
        let result = OverlayConfig::builder()
            .video_player_host(Arc::new(RecordingVideoPlayerHost::new()))
            .http_client(Arc::new(StaticHttpClient::new()))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "AudioOutputFactory"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = OverlayConfig::builder()
            .video_player_host(Arc::new(RecordingVideoPlayerHost::new()))
            .asset_root(std::env::temp_dir())
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.effects_base_url, "sfx/weaponjam");
        assert_eq!(config.default_quality, PlaybackQuality::Small);
        assert_eq!(config.default_play_volume, 0.5);
        assert_eq!(config.volume_tick_interval, Duration::from_millis(100));
        assert_eq!(config.player.element_id, "player");
        assert_eq!(config.event_bus_capacity, 100);
        assert!(!config.debug);
        assert_eq!(
            config.zone_display.is_some(),
            cfg!(feature = "desktop-shims")
        );
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let result = complete_builder().effects_base_url("/").build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Effects base URL cannot be empty"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_volume() {
        let result = complete_builder().default_play_volume(1.5).build();
        assert!(matches!(
            result,
            Err(Error::InvalidValue { ref field, .. }) if field == "default_play_volume"
        ));

        let result = complete_builder().default_play_volume(f64::NAN).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let result = complete_builder()
            .volume_tick_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_player() {
        let mut player = PlayerConfig::default();
        player.width = 0;
        assert!(complete_builder().player(player).build().is_err());

        let mut player = PlayerConfig::default();
        player.element_id.clear();
        assert!(complete_builder().player(player).build().is_err());
    }

    #[test]
    fn test_builder_with_overrides() {
        let config = complete_builder()
            .default_quality(PlaybackQuality::Hd720)
            .default_play_volume(0.25)
            .event_bus_capacity(8)
            .debug(true)
            .zone_display(Arc::new(RecordingZoneDisplay::new()))
            .build()
            .unwrap();

        assert_eq!(config.default_quality, PlaybackQuality::Hd720);
        assert_eq!(config.default_play_volume, 0.25);
        assert_eq!(config.event_bus_capacity, 8);
        assert!(config.debug);
        assert!(config.zone_display.is_some());
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = complete_builder().build().unwrap();
        let cloned = config.clone();
        assert!(Arc::ptr_eq(&config.http_client, &cloned.http_client));
        assert!(format!("{:?}", cloned).contains("OverlayConfig"));
    }
}
