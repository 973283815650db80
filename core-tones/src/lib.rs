//! # Tone Cache Module
//!
//! Preloads short audio clips ("tones") into a fixed-capacity mixer pool and
//! plays them one at a time.
//!
//! ## Overview
//!
//! This module handles:
//! - Registration of named tones up to a capacity fixed at initialize
//! - Asynchronous load completion, matched to pending loads by mixer handle
//! - A single playback slot: starting a tone pauses the previous one
//! - Global volume and playback rate applied to the active tone
//!
//! The platform mixer and asset lookup are injected through
//! [`bridge_traits::MixerBackend`] and [`bridge_traits::AssetResolver`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_tones::{PlayOptions, ToneCache, ToneCacheConfig};
//!
//! let cache = ToneCache::new(
//!     ToneCacheConfig::builder()
//!         .asset_resolver(resolver)
//!         .mixer_backend(backend)
//!         .build()?,
//! );
//! cache.initialize(8)?;
//! cache.preload("ring.wav")?.await?;
//! cache.play("ring.wav", PlayOptions::looping()).await?;
//! ```

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod pending;

pub use cache::ToneCache;
pub use config::{RateRange, ToneCacheConfig, ToneCacheConfigBuilder};
pub use entry::{PlayOptions, ToneState};
pub use error::{Result, ToneError};
pub use pending::PendingTone;
