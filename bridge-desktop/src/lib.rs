//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` ([`ReqwestHttpClient`]) or a local asset
//!   directory ([`LocalAssetClient`])
//! - `AudioOutput` using `symphonia` for decoding and `cpal` for the output
//!   device ([`DesktopAudioOutput`])
//! - `ZoneDisplay` writing the banner through `tracing` ([`TracingZoneDisplay`])
//!
//! The streaming video player has no desktop implementation; the embedding
//! host always supplies it.
//!
//! ## Feature Flags
//!
//! - `device-output`: open a real output device through cpal (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopAudioOutputFactory, LocalAssetClient};
//! use bridge_traits::AudioOutputFactory;
//!
//! let http = LocalAssetClient::new("./overlay");
//! let output = DesktopAudioOutputFactory.create_context()?;
//! ```

mod assets;
mod audio_output;
mod display;
mod http;

pub use assets::LocalAssetClient;
pub use audio_output::{DesktopAudioOutput, DesktopAudioOutputFactory};
pub use display::TracingZoneDisplay;
pub use http::ReqwestHttpClient;
