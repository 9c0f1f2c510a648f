//! Runtime abstraction layer for the overlay audio core.
//!
//! Every other crate in the workspace reaches the async runtime through this
//! crate rather than naming Tokio directly. The overlay runs a single logical
//! thread of control: one event loop owns the playback state, and backend
//! completions (fetches, decodes, player callbacks) come back to it as
//! messages. The primitives here are the pieces that loop is built from.
//!
//! # Modules
//!
//! - `task`: spawning detached work (effect playback, preloads)
//! - `time`: sleeping, timeouts and the fixed-period reconciliation ticker
//! - `sync`: channels and once-cells
//! - `runtime`: blocking entry points for synchronous hosts
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{ticker, Duration};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut tick = ticker(Duration::from_millis(100));
//! tick.tick().await;
//! # }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::{spawn, spawn_blocking};
pub use time::{sleep, Duration, Instant};

/// Re-exported so callers can multiplex channels and timers without a direct
/// Tokio dependency.
pub use tokio::select;
