//! Mixer bridge traits and supporting types.
//!
//! The tone cache drives a platform "sound pool" style primitive: clips are
//! loaded into a fixed number of slots, each load returns a handle right away
//! and reports completion later on a separate channel. Host applications
//! provide concrete implementations through [`MixerBackend`], which receives
//! the [`CompletionSink`] the mixer must report load results to.

use crate::error::{BridgeError, Result};
use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Platform loop count for a clip that plays once.
pub const PLAY_ONCE: i32 = 0;

/// Platform loop count for a clip that repeats until paused.
pub const LOOP_FOREVER: i32 = -1;

/// Opaque identifier assigned by the mixer to a loaded clip.
///
/// Handles are only meaningful to the mixer that issued them. They are the
/// sole correlation key between a load request and its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MixerHandle(u32);

impl MixerHandle {
    /// Wrap a raw platform identifier.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw platform identifier.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MixerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the mixer should read a clip from.
#[derive(Debug, Clone)]
pub enum ToneSource {
    /// Audio file accessible to the host runtime.
    File { path: PathBuf },
    /// Clip bundled in memory by the caller.
    Memory { label: String, data: Bytes },
}

impl ToneSource {
    /// Short description suitable for log fields.
    pub fn label(&self) -> String {
        match self {
            ToneSource::File { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ToneSource::Memory { label, .. } => label.clone(),
        }
    }
}

/// Outcome of an asynchronous load, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Success,
    /// Platform-specific non-zero status code.
    Failed { code: i32 },
}

impl LoadStatus {
    /// Map a sound-pool style status code (`0` = success).
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            LoadStatus::Success
        } else {
            LoadStatus::Failed { code }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LoadStatus::Success)
    }
}

/// Completion signal for one issued load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCompletion {
    pub handle: MixerHandle,
    pub status: LoadStatus,
}

impl LoadCompletion {
    pub fn new(handle: MixerHandle, status: LoadStatus) -> Self {
        Self { handle, status }
    }
}

/// Parameters for a single play command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayParams {
    /// Left channel gain (0.0 = muted, 1.0 = unity gain).
    pub left_volume: f32,
    /// Right channel gain.
    pub right_volume: f32,
    /// Stream priority; higher values are kept when the pool is saturated.
    pub priority: i32,
    /// [`PLAY_ONCE`], [`LOOP_FOREVER`], or an explicit repeat count.
    pub loop_count: i32,
    /// Playback rate multiplier (1.0 = normal speed).
    pub rate: f32,
}

impl PlayParams {
    /// Play once at the given stereo-balanced volume and rate.
    pub fn new(volume: f32, rate: f32) -> Self {
        Self {
            left_volume: volume,
            right_volume: volume,
            priority: 1,
            loop_count: PLAY_ONCE,
            rate,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Repeat indefinitely when `looping`, otherwise play once.
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.loop_count = if looping { LOOP_FOREVER } else { PLAY_ONCE };
        self
    }

    pub fn is_looping(&self) -> bool {
        self.loop_count == LOOP_FOREVER
    }
}

impl Default for PlayParams {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Sending half of the load completion channel.
///
/// Mixers must report exactly one [`LoadCompletion`] per handle returned from
/// [`AudioMixer::load`].
#[derive(Debug, Clone)]
pub struct CompletionSink {
    sender: mpsc::UnboundedSender<LoadCompletion>,
}

impl CompletionSink {
    pub fn new(sender: mpsc::UnboundedSender<LoadCompletion>) -> Self {
        Self { sender }
    }

    /// Create a sink together with the receiver the consumer reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LoadCompletion>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    /// Report a load result.
    ///
    /// Fails only when the consumer side has shut down.
    pub fn complete(&self, completion: LoadCompletion) -> Result<()> {
        self.sender.send(completion).map_err(|e| {
            BridgeError::NotAvailable(format!(
                "Completion channel closed, dropping result for handle {}",
                e.0.handle
            ))
        })
    }

    pub fn succeed(&self, handle: MixerHandle) -> Result<()> {
        self.complete(LoadCompletion::new(handle, LoadStatus::Success))
    }

    pub fn fail(&self, handle: MixerHandle, code: i32) -> Result<()> {
        self.complete(LoadCompletion::new(handle, LoadStatus::Failed { code }))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Platform mixing primitive holding a bounded pool of short clips.
///
/// Every method is synchronous. `load` assigns the handle immediately and
/// decodes in the background, reporting through the [`CompletionSink`] the
/// mixer was created with. Implementations must tolerate being called from
/// any thread.
pub trait AudioMixer: Send + Sync {
    /// Start loading a clip and return its handle.
    fn load(&self, source: &ToneSource) -> Result<MixerHandle>;

    /// Start playback of a loaded clip.
    fn play(&self, handle: MixerHandle, params: &PlayParams) -> Result<()>;

    /// Pause playback of a clip.
    fn pause(&self, handle: MixerHandle) -> Result<()>;

    /// Adjust per-channel gain of a playing clip.
    fn set_volume(&self, handle: MixerHandle, left: f32, right: f32) -> Result<()>;

    /// Adjust the playback rate of a playing clip.
    fn set_rate(&self, handle: MixerHandle, rate: f32) -> Result<()>;

    /// Free the memory held by a single clip.
    fn unload(&self, handle: MixerHandle) -> Result<()>;

    /// Free every clip and the pool itself.
    fn release_all(&self) -> Result<()>;
}

/// Factory for [`AudioMixer`] instances.
pub trait MixerBackend: Send + Sync {
    /// Allocate a mixer able to hold `max_streams` clips, reporting load
    /// results to `completions`.
    fn create(&self, max_streams: usize, completions: CompletionSink)
        -> Result<Box<dyn AudioMixer>>;
}
