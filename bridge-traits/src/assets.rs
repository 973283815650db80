//! Asset resolution bridge.
//!
//! Maps the names callers use for tones (e.g. `"ring.wav"`) to a
//! [`ToneSource`] the mixer can load. Desktop hosts resolve against a
//! directory, mobile hosts against their bundled asset catalog.

use crate::error::{BridgeError, Result};
use crate::mixer::ToneSource;
use bytes::Bytes;
use std::collections::HashMap;

/// Resolves tone names to loadable sources.
///
/// Resolution is synchronous and must not mutate any state the caller
/// depends on: a failed resolution leaves the cache untouched.
pub trait AssetResolver: Send + Sync {
    /// Resolve `name` or return [`BridgeError::NotFound`].
    fn resolve(&self, name: &str) -> Result<ToneSource>;
}

/// Resolver over a fixed set of clips held in memory.
///
/// Useful for embedded tones and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetResolver {
    assets: HashMap<String, Bytes>,
}

impl MemoryAssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip under `name`, replacing any previous clip.
    pub fn with_asset(mut self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.assets.insert(name.into(), data.into());
        self
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetResolver for MemoryAssetResolver {
    fn resolve(&self, name: &str) -> Result<ToneSource> {
        self.assets
            .get(name)
            .map(|data| ToneSource::Memory {
                label: name.to_string(),
                data: data.clone(),
            })
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_resolver_returns_registered_clip() {
        let resolver = MemoryAssetResolver::new().with_asset("beep", &b"RIFFbeep"[..]);

        match resolver.resolve("beep").unwrap() {
            ToneSource::Memory { label, data } => {
                assert_eq!(label, "beep");
                assert_eq!(&data[..], b"RIFFbeep");
            }
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn memory_resolver_reports_missing_clip() {
        let resolver = MemoryAssetResolver::new();
        assert!(resolver.is_empty());

        let err = resolver.resolve("missing").unwrap_err();
        assert!(err.is_not_found());
    }
}
