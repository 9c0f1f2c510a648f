//! # Host Bridge Traits
//!
//! Capability traits the overlay core needs from its host.
//!
//! ## Overview
//!
//! The playback core never talks to a browser, a sound card or a network
//! stack directly. It consumes the traits in this crate, and each host ships
//! concrete adapters for them (`bridge-desktop` for native builds, the
//! embedding page for the in-game overlay).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - fetches sound effect resources
//!
//! ### Audio
//! - [`AudioOutputFactory`](audio::AudioOutputFactory) - creates the shared output context
//! - [`AudioOutput`](audio::AudioOutput) - resume, decode, and one-shot voices
//!
//! ### Music
//! - [`VideoPlayerHost`](video::VideoPlayerHost) - constructs the third-party streaming player
//! - [`VideoPlayer`](video::VideoPlayer) - commands issued to a ready player
//!
//! ### Presentation
//! - [`ZoneDisplay`](display::ZoneDisplay) - on-screen area-of-play banner
//!
//! ### Utilities
//! - [`LoggerSink`](logger::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Every trait reports failures as [`BridgeError`](error::BridgeError).
//! Implementations should keep the distinction between a transport failure
//! ([`BridgeError::OperationFailed`]) and a non-success HTTP status
//! ([`BridgeError::HttpStatus`]); the core logs them differently.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that handles can be shared
//! between the service loop and detached effect tasks.
//!
//! ## Test doubles
//!
//! Enabling the `mock` feature exposes [`mock`], a set of recording
//! implementations used by the workspace's own tests.

pub mod audio;
pub mod display;
pub mod error;
pub mod http;
pub mod logger;
pub mod video;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{AudioContextState, AudioOutput, AudioOutputFactory, DecodedAudio, OneShotVoice};
pub use display::{ZoneBanner, ZoneDisplay};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logger::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use video::{
    LoadVideoRequest, PlaybackQuality, PlayerConfig, PlayerErrorCode, PlayerEvent,
    PlayerEventSender, PlayerState, PlayerVars, VideoPlayer, VideoPlayerHost,
};
