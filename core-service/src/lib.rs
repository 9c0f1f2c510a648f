//! Overlay service façade and bootstrap helpers.
//!
//! This crate turns host messages into coordinator calls. Hosts build an
//! [`OverlayConfig`](core_runtime::OverlayConfig) with their bridges (the
//! `desktop-shims` feature fills in HTTP and audio output from
//! `bridge-desktop`), then hand it to [`bootstrap`] and post messages
//! through the returned [`OverlayHandle`].
//!
//! ```ignore
//! use core_service::{bootstrap, OverlayConfig};
//!
//! let config = OverlayConfig::builder()
//!     .video_player_host(host)
//!     .debug(true)
//!     .build()?;
//! let overlay = bootstrap(config).await?;
//! overlay.send_json(r#"{"type":"play","youtubeId":"dQw4w9WgXcQ","volume":0.4}"#)?;
//! ```

pub mod error;
pub mod message;
pub mod service;

pub use core_runtime::OverlayConfig;
pub use error::{CoreError, Result};
pub use message::InboundMessage;
pub use service::{MessageSender, OverlayHandle, OverlayService};

use core_runtime::logging::{init_logging, LoggingConfig};
use tracing::warn;

/// Initialise logging from the config's debug switch and start the service.
///
/// An already-installed subscriber is kept.
pub async fn bootstrap(config: OverlayConfig) -> Result<OverlayHandle> {
    if let Err(e) = init_logging(LoggingConfig::for_debug(config.debug)) {
        warn!(error = %e, "Keeping existing log subscriber");
    }
    OverlayService::start(config).await
}
