//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the overlay audio core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback core and the
//! service loop depend on. It establishes the logging conventions, the
//! configuration contract with the host, and the event broadcasting used to
//! observe playback.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{OverlayConfig, OverlayConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus};
