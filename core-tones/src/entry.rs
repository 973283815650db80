//! Registry entries and the options a tone is played with.

use crate::error::Result;
use bridge_traits::MixerHandle;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Lifecycle state of a registered tone.
///
/// A failed load is never stored: the entry is removed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneState {
    /// Load issued, completion not yet received.
    Loading,
    /// Loaded and idle.
    Ready,
    /// Loaded and occupying the active playback slot.
    Playing,
}

impl ToneState {
    /// Whether the mixer can play the tone right now.
    pub fn is_ready(&self) -> bool {
        matches!(self, ToneState::Ready | ToneState::Playing)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ToneState::Loading)
    }
}

/// Per-name bookkeeping held by the cache.
#[derive(Debug)]
pub(crate) struct ToneEntry {
    pub(crate) handle: MixerHandle,
    pub(crate) state: ToneState,
    pub(crate) looping: bool,
    pending: Option<oneshot::Sender<Result<()>>>,
}

impl ToneEntry {
    pub(crate) fn loading(handle: MixerHandle, pending: oneshot::Sender<Result<()>>) -> Self {
        Self {
            handle,
            state: ToneState::Loading,
            looping: false,
            pending: Some(pending),
        }
    }

    /// Deliver the load outcome to whoever is waiting on it.
    ///
    /// Only the first call has an effect. Returns `false` when the outcome had
    /// already been delivered or the waiter went away.
    pub(crate) fn resolve(&mut self, outcome: Result<()>) -> bool {
        match self.pending.take() {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// How a tone should be played.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// Repeat until paused instead of playing once.
    pub looping: bool,
    /// Gain applied to both channels (0.0 to 1.0).
    pub volume: f32,
    /// Playback rate multiplier (0.5 to 2.0 is the supported range).
    pub rate: f32,
}

impl PlayOptions {
    pub fn new(looping: bool, volume: f32, rate: f32) -> Self {
        Self {
            looping,
            volume,
            rate,
        }
    }

    /// Play once at unity gain and normal speed.
    pub fn once() -> Self {
        Self::default()
    }

    /// Loop at unity gain and normal speed.
    pub fn looping() -> Self {
        Self::default().with_looping(true)
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self::new(false, 1.0, 1.0)
    }
}
