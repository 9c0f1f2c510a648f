//! # Core Playback
//!
//! Background music and sound effect coordination for the overlay.
//!
//! ## Overview
//!
//! - [`PlaybackCoordinator`] - owns the playback intent and drives both backends
//! - [`MusicPlayerAdapter`] - readiness-gated wrapper over the streaming player
//! - [`SoundBufferCache`] - fetch, decode and keep effect buffers
//! - [`EffectPlayer`] - fire-and-forget voices at a clamped gain
//! - [`AudioContextHandle`] - the lazily created shared output context
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::PlaybackCoordinator;
//! use core_runtime::EventBus;
//!
//! let mut coordinator = PlaybackCoordinator::new(&config, EventBus::default());
//! coordinator.attach_player(host.as_ref(), config.player.clone(), player_tx).await?;
//! coordinator.play_request("dQw4w9WgXcQ", Some(0.5), None).await;
//! ```

pub mod audio_context;
pub mod coordinator;
pub mod effects;
pub mod error;
pub mod intent;
pub mod music;
pub mod sound_cache;

pub use audio_context::AudioContextHandle;
pub use coordinator::PlaybackCoordinator;
pub use effects::{clamp_gain, EffectPlayer};
pub use error::{PlaybackError, Result};
pub use intent::{clamp_volume, volume_percent, PlaybackIntent};
pub use music::{MusicPlayerAdapter, StateOutcome};
pub use sound_cache::{PreloadFailure, PreloadReport, SoundBufferCache};
