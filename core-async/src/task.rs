//! Task spawning.
//!
//! Effect playback and sound preloading run as detached tasks so that a slow
//! fetch or decode never holds up inbound message processing.

pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawns a future onto the current runtime.
///
/// The returned handle may be dropped; the task keeps running to completion.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let handle = spawn(async { 7 });
/// assert_eq!(handle.await.unwrap(), 7);
/// # }
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for joined tasks.
pub type Result<T> = std::result::Result<T, JoinError>;

/// Runs CPU-bound or blocking work (audio decoding) off the async workers.
pub fn spawn_blocking<F, R>(work: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
}
