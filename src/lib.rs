//! Workspace façade crate.
//!
//! Exposes feature flags that map onto the workspace crates so hosts can
//! depend on `overlay-workspace` alone:
//!
//! - `desktop-shims` (default): the service with desktop HTTP and audio
//!   output bridges
//! - `embedded`: the service with every capability supplied by the host

#[cfg(any(feature = "desktop-shims", feature = "embedded"))]
pub use core_service::*;
