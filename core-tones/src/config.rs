//! # Tone Cache Configuration
//!
//! [`ToneCacheConfig`] carries the bridges a [`ToneCache`](crate::ToneCache)
//! needs and the settings it starts with. It is built through
//! [`ToneCacheConfig::builder`], which fails fast when a required bridge is
//! missing.
//!
//! ## Required Bridges
//!
//! - `AssetResolver` maps tone names to loadable sources
//! - `MixerBackend` creates the platform mixing primitive
//!
//! With the `desktop-shims` feature, setting [`ToneCacheConfigBuilder::asset_root`]
//! injects a directory-backed resolver, and a headless virtual mixer is used
//! when no backend is given.
//!
//! ## Usage
//!
//! ```ignore
//! use core_tones::ToneCacheConfig;
//!
//! let config = ToneCacheConfig::builder()
//!     .asset_resolver(resolver)
//!     .mixer_backend(backend)
//!     .initial_volume(0.8)
//!     .build()?;
//! ```

use bridge_traits::{AssetResolver, MixerBackend};
use core_runtime::events::EventBus;
use core_runtime::{Error, Result};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "desktop-shims")]
use std::path::PathBuf;

/// Lower bound of the supported playback rate.
pub const MIN_PLAYBACK_RATE: f32 = 0.5;

/// Upper bound of the supported playback rate.
pub const MAX_PLAYBACK_RATE: f32 = 2.0;

/// Stream priority passed to the mixer when none is configured.
pub const DEFAULT_PRIORITY: i32 = 1;

/// Inclusive range of playback rates the mixer is expected to honor.
///
/// Rates outside the range are still applied; the cache only logs a warning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateRange {
    pub min: f32,
    pub max: f32,
}

impl RateRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, rate: f32) -> bool {
        rate >= self.min && rate <= self.max
    }
}

impl Default for RateRange {
    fn default() -> Self {
        Self::new(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
    }
}

/// Configuration for a [`ToneCache`](crate::ToneCache).
#[derive(Clone)]
pub struct ToneCacheConfig {
    pub asset_resolver: Arc<dyn AssetResolver>,
    pub mixer_backend: Arc<dyn MixerBackend>,
    /// Bus tone and lifecycle events are published on, if any.
    pub event_bus: Option<EventBus>,
    /// Global volume before the first play.
    pub initial_volume: f32,
    /// Global playback rate before the first play.
    pub initial_rate: f32,
    pub priority: i32,
    pub rate_range: RateRange,
}

impl fmt::Debug for ToneCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToneCacheConfig")
            .field("asset_resolver", &"<AssetResolver>")
            .field("mixer_backend", &"<MixerBackend>")
            .field("event_bus", &self.event_bus.is_some())
            .field("initial_volume", &self.initial_volume)
            .field("initial_rate", &self.initial_rate)
            .field("priority", &self.priority)
            .field("rate_range", &self.rate_range)
            .finish()
    }
}

impl ToneCacheConfig {
    pub fn builder() -> ToneCacheConfigBuilder {
        ToneCacheConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - The rate range is finite, positive and not inverted
    /// - Initial volume and rate are finite and not negative
    pub fn validate(&self) -> Result<()> {
        let range = self.rate_range;
        if !range.min.is_finite() || !range.max.is_finite() || range.min <= 0.0 {
            return Err(Error::Config(format!(
                "Rate range must be finite and positive, got {}..={}",
                range.min, range.max
            )));
        }

        if range.min > range.max {
            return Err(Error::Config(format!(
                "Rate range is inverted: {} > {}",
                range.min, range.max
            )));
        }

        if !self.initial_volume.is_finite() || self.initial_volume < 0.0 {
            return Err(Error::Config(format!(
                "Initial volume must be a non-negative number, got {}",
                self.initial_volume
            )));
        }

        if !self.initial_rate.is_finite() || self.initial_rate < 0.0 {
            return Err(Error::Config(format!(
                "Initial rate must be a non-negative number, got {}",
                self.initial_rate
            )));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn asset_resolver_missing_error() -> Error {
    Error::capability_missing(
        "AssetResolver",
        "AssetResolver implementation is required to locate tone clips. \
         Desktop: enable the 'desktop-shims' feature and set asset_root(). \
         Mobile: inject a resolver over the bundled asset catalog.",
    )
}

#[cfg(not(feature = "desktop-shims"))]
fn mixer_backend_missing_error() -> Error {
    Error::capability_missing(
        "MixerBackend",
        "MixerBackend implementation is required to play tones. \
         Desktop: enable the 'desktop-shims' feature to use the VirtualMixerBackend. \
         Mobile: inject the platform sound pool.",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_asset_resolver(root: Option<PathBuf>) -> Result<Arc<dyn AssetResolver>> {
    use bridge_desktop::DirectoryAssetResolver;

    let root = root.ok_or_else(|| {
        Error::capability_missing(
            "AssetResolver",
            "No AssetResolver provided. Use .asset_root() to resolve tones from a \
             directory or .asset_resolver() to inject one.",
        )
    })?;
    let resolver: Arc<dyn AssetResolver> = Arc::new(DirectoryAssetResolver::new(root));
    Ok(resolver)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_asset_resolver() -> Result<Arc<dyn AssetResolver>> {
    Err(asset_resolver_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_mixer_backend() -> Result<Arc<dyn MixerBackend>> {
    use bridge_desktop::VirtualMixerBackend;

    let backend: Arc<dyn MixerBackend> = Arc::new(VirtualMixerBackend::new());
    Ok(backend)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_mixer_backend() -> Result<Arc<dyn MixerBackend>> {
    Err(mixer_backend_missing_error())
}

/// Builder for [`ToneCacheConfig`].
#[derive(Default)]
pub struct ToneCacheConfigBuilder {
    asset_resolver: Option<Arc<dyn AssetResolver>>,
    mixer_backend: Option<Arc<dyn MixerBackend>>,
    event_bus: Option<EventBus>,
    initial_volume: Option<f32>,
    initial_rate: Option<f32>,
    priority: Option<i32>,
    rate_range: Option<RateRange>,
    #[cfg(feature = "desktop-shims")]
    asset_root: Option<PathBuf>,
}

impl ToneCacheConfigBuilder {
    pub fn asset_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.asset_resolver = Some(resolver);
        self
    }

    pub fn mixer_backend(mut self, backend: Arc<dyn MixerBackend>) -> Self {
        self.mixer_backend = Some(backend);
        self
    }

    /// Resolve tone names relative to `root` with the desktop resolver.
    ///
    /// Ignored when an explicit resolver is set.
    #[cfg(feature = "desktop-shims")]
    pub fn asset_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Default: 1.0.
    pub fn initial_volume(mut self, volume: f32) -> Self {
        self.initial_volume = Some(volume);
        self
    }

    /// Default: 1.0.
    pub fn initial_rate(mut self, rate: f32) -> Self {
        self.initial_rate = Some(rate);
        self
    }

    /// Default: [`DEFAULT_PRIORITY`].
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Default: [`MIN_PLAYBACK_RATE`]..=[`MAX_PLAYBACK_RATE`].
    pub fn rate_range(mut self, range: RateRange) -> Self {
        self.rate_range = Some(range);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ToneCacheConfig> {
        let asset_resolver = match self.asset_resolver {
            Some(resolver) => resolver,
            #[cfg(feature = "desktop-shims")]
            None => provide_default_asset_resolver(self.asset_root)?,
            #[cfg(not(feature = "desktop-shims"))]
            None => provide_default_asset_resolver()?,
        };

        let mixer_backend = match self.mixer_backend {
            Some(backend) => backend,
            None => provide_default_mixer_backend()?,
        };

        let config = ToneCacheConfig {
            asset_resolver,
            mixer_backend,
            event_bus: self.event_bus,
            initial_volume: self.initial_volume.unwrap_or(1.0),
            initial_rate: self.initial_rate.unwrap_or(1.0),
            priority: self.priority.unwrap_or(DEFAULT_PRIORITY),
            rate_range: self.rate_range.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
