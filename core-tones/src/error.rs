//! # Tone Cache Error Types
//!
//! Errors surfaced by [`ToneCache`](crate::ToneCache) operations. None of them
//! is fatal and nothing is retried automatically; callers decide whether to
//! re-issue a request based on [`ToneError::is_retryable`].

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while caching or playing tones.
#[derive(Error, Debug)]
pub enum ToneError {
    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// An operation was attempted before `initialize` or after `terminate`.
    #[error("Tone cache is not initialized")]
    NotInitialized,

    /// `initialize` was called on an active cache.
    #[error("Tone cache is already initialized; terminate it first")]
    AlreadyInitialized,

    /// `initialize` was called with a capacity of zero.
    #[error("Invalid capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),

    /// No tokio runtime was available to drive load completions.
    #[error("No tokio runtime available to process load completions")]
    RuntimeUnavailable,

    // ========================================================================
    // Registration Errors
    // ========================================================================
    /// Registering a new name would exceed the configured capacity.
    #[error("Capacity exceeded: cache already holds {capacity} tones")]
    CapacityExceeded { capacity: usize },

    /// The asset resolver could not map the name to a source.
    #[error("Tone resource not found: {0}")]
    ResourceNotFound(String),

    /// A load for this name is already outstanding.
    #[error("Tone is already loading: {0}")]
    AlreadyLoading(String),

    /// The tone exists but has not finished loading.
    #[error("Tone is not ready yet: {0}")]
    NotReadyYet(String),

    // ========================================================================
    // Load Outcome Errors
    // ========================================================================
    /// The mixer rejected or failed to decode the clip.
    #[error("Failed to load tone {name}: {reason}")]
    LoadFailed { name: String, reason: String },

    /// The entry was released or the cache terminated while loading.
    #[error("Load cancelled for tone: {0}")]
    LoadCancelled(String),

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    #[error("Mixer error: {0}")]
    Mixer(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),
}

impl ToneError {
    /// Whether issuing the same request again may succeed without the caller
    /// changing anything else.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToneError::NotReadyYet(_) | ToneError::LoadFailed { .. } | ToneError::LoadCancelled(_)
        )
    }

    /// Name of the tone the error refers to, if any.
    pub fn tone_name(&self) -> Option<&str> {
        match self {
            ToneError::ResourceNotFound(name)
            | ToneError::AlreadyLoading(name)
            | ToneError::NotReadyYet(name)
            | ToneError::LoadCancelled(name)
            | ToneError::LoadFailed { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Result type for tone cache operations.
pub type Result<T> = std::result::Result<T, ToneError>;
