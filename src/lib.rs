//! Workspace facade crate.
//!
//! Re-exports the tone cache and its bridges so host applications can depend
//! on `tone-cache-workspace` alone. The `desktop-shims` feature (default)
//! pulls in the desktop asset resolver and virtual mixer and lets
//! `ToneCacheConfig` fall back to them.

pub use bridge_traits;
pub use core_runtime;
pub use core_tones;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

pub use core_tones::{PlayOptions, ToneCache, ToneCacheConfig, ToneError, ToneState};
