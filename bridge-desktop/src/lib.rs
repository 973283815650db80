//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `AssetResolver` over a directory of audio files
//! - `MixerBackend` producing a headless virtual mixer that tracks slots,
//!   load state and playback without opening an audio device
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryAssetResolver, VirtualMixerBackend};
//! use std::sync::Arc;
//!
//! let resolver = Arc::new(DirectoryAssetResolver::new("/usr/share/sounds"));
//! let backend = Arc::new(VirtualMixerBackend::new());
//!
//! // Use in tone cache configuration
//! ```

mod assets;
mod mixer;

pub use assets::{DirectoryAssetResolver, DEFAULT_EXTENSIONS};
pub use mixer::{
    ClipSnapshot, ClipState, VirtualMixer, VirtualMixerBackend, STATUS_EMPTY_CLIP,
    STATUS_IO_ERROR,
};
