//! Entry points for hosts that are not already inside a runtime.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Builds a runtime suitable for driving the overlay service.
///
/// The overlay is cooperative and single-threaded by nature, so a
/// current-thread runtime with timers and I/O enabled is all it needs.
pub fn build_current_thread() -> std::io::Result<Runtime> {
    Builder::new_current_thread().enable_all().build()
}

/// Runs `future` to completion on a fresh current-thread runtime.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    Ok(build_current_thread()?.block_on(future))
}
