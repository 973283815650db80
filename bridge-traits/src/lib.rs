//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the tone cache and the
//! platform-specific pieces it drives. Each trait represents a capability the
//! core requires but that must be implemented differently per platform
//! (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Audio
//! - [`AudioMixer`](mixer::AudioMixer) - Bounded clip pool: load, play, pause, unload
//! - [`MixerBackend`](mixer::MixerBackend) - Allocates a mixer wired to a completion channel
//!
//! ### Assets
//! - [`AssetResolver`](assets::AssetResolver) - Maps tone names to loadable sources
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Virtual mixer + directory assets |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Completion Contract
//!
//! `AudioMixer::load` returns a handle synchronously and decodes in the
//! background. The mixer reports exactly one
//! [`LoadCompletion`](mixer::LoadCompletion) per handle through the
//! [`CompletionSink`](mixer::CompletionSink) it was created with. The core
//! matches completions to pending loads by handle, never by name.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., asset names, handles)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. The core calls the mixer while
//! holding its own lock, so implementations must not call back into the core
//! synchronously.
//!
//! ## Examples
//!
//! ### Implementing AssetResolver
//!
//! ```ignore
//! use bridge_traits::assets::AssetResolver;
//! use bridge_traits::mixer::ToneSource;
//! use bridge_traits::error::{BridgeError, Result};
//!
//! pub struct BundleResolver;
//!
//! impl AssetResolver for BundleResolver {
//!     fn resolve(&self, name: &str) -> Result<ToneSource> {
//!         // Look the asset up in the platform bundle
//!         Err(BridgeError::NotFound(name.to_string()))
//!     }
//! }
//! ```

pub mod assets;
pub mod error;
pub mod logging;
pub mod mixer;

pub use error::{BridgeError, Result};

// Re-export commonly used types
pub use assets::{AssetResolver, MemoryAssetResolver};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use mixer::{
    AudioMixer, CompletionSink, LoadCompletion, LoadStatus, MixerBackend, MixerHandle,
    PlayParams, ToneSource, LOOP_FOREVER, PLAY_ONCE,
};
