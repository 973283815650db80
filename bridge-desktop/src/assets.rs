//! Directory-backed asset resolution.

use bridge_traits::{
    assets::AssetResolver,
    error::{BridgeError, Result},
    mixer::ToneSource,
};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Extensions tried, in order, when a name is given without one.
pub const DEFAULT_EXTENSIONS: &[&str] = &["wav", "ogg", "mp3"];

/// Resolves tone names to files under a root directory.
///
/// Names are relative paths (`"ring.wav"`, `"alerts/beep"`). A name without an
/// extension is tried with each of the configured extensions. Names that
/// would escape the root are rejected.
#[derive(Debug, Clone)]
pub struct DirectoryAssetResolver {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// Resolver over the per-user data directory (`<data_dir>/tone-cache/tones`).
    pub fn user_default() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join("tone-cache")
            .join("tones");
        Self::new(root)
    }

    /// Replace the fallback extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let direct = self.root.join(name);
        let mut candidates = vec![direct.clone()];
        if direct.extension().is_none() {
            candidates.extend(
                self.extensions
                    .iter()
                    .map(|ext| direct.with_extension(ext)),
            );
        }
        candidates
    }
}

fn is_contained(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

impl AssetResolver for DirectoryAssetResolver {
    fn resolve(&self, name: &str) -> Result<ToneSource> {
        if !is_contained(name) {
            return Err(BridgeError::NotFound(format!(
                "{} (must be a relative path inside the asset root)",
                name
            )));
        }

        let path = self
            .candidates(name)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))?;

        debug!(name, path = ?path, "Resolved tone asset");
        Ok(ToneSource::File { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn asset_dir(test: &str) -> PathBuf {
        let dir = env::temp_dir()
            .join(format!("tone-assets-{}", std::process::id()))
            .join(test);
        fs::create_dir_all(dir.join("alerts")).unwrap();
        dir
    }

    #[test]
    fn test_resolves_exact_name() {
        let dir = asset_dir("exact");
        fs::write(dir.join("ring.wav"), b"RIFF").unwrap();

        let resolver = DirectoryAssetResolver::new(&dir);
        match resolver.resolve("ring.wav").unwrap() {
            ToneSource::File { path } => assert_eq!(path, dir.join("ring.wav")),
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn test_tries_fallback_extensions() {
        let dir = asset_dir("fallback");
        fs::write(dir.join("alerts").join("beep.ogg"), b"OggS").unwrap();

        let resolver = DirectoryAssetResolver::new(&dir);
        let source = resolver.resolve("alerts/beep").unwrap();
        assert_eq!(source.label(), "beep.ogg");

        let wav_only = DirectoryAssetResolver::new(&dir).with_extensions(["wav"]);
        assert!(wav_only.resolve("alerts/beep").unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = asset_dir("missing");
        let resolver = DirectoryAssetResolver::new(&dir);

        let err = resolver.resolve("nope.wav").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_directories_are_not_assets() {
        let dir = asset_dir("dirs");
        let resolver = DirectoryAssetResolver::new(&dir);

        assert!(resolver.resolve("alerts").is_err());
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = asset_dir("escape");
        let resolver = DirectoryAssetResolver::new(&dir);

        assert!(resolver.resolve("../secret.wav").is_err());
        assert!(resolver.resolve("/etc/passwd").is_err());
        assert!(resolver.resolve("").is_err());
    }

    #[test]
    fn test_user_default_root() {
        let resolver = DirectoryAssetResolver::user_default();
        assert!(resolver.root().ends_with("tone-cache/tones"));
    }
}
