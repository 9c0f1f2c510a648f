//! Synchronisation primitives.
//!
//! The playback core needs very few: an unbounded channel for inbound
//! messages and player callbacks, a once-cell per sound key so concurrent
//! cache fills collapse into one fetch, and a broadcast channel for the event
//! bus.

pub use tokio::sync::{broadcast, mpsc, oneshot, OnceCell};
