//! Headless mixer for desktop hosts and tests.
//!
//! The virtual mixer keeps the bookkeeping a platform sound pool would
//! (load state, play/pause state, per-clip parameters) without opening an
//! audio device. `max_streams` bounds how many clips play at once, not how
//! many are loaded. Loads read the clip on the tokio runtime and report
//! through the completion sink like a real pool would.

use bridge_traits::{
    error::{BridgeError, Result},
    mixer::{
        AudioMixer, CompletionSink, LoadCompletion, LoadStatus, MixerBackend, MixerHandle,
        PlayParams, ToneSource,
    },
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Status reported when a clip could not be read.
pub const STATUS_IO_ERROR: i32 = 1;

/// Status reported for an empty clip.
pub const STATUS_EMPTY_CLIP: i32 = 2;

/// Load state of a clip held by the [`VirtualMixer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipState {
    Decoding,
    Loaded,
}

/// Point-in-time view of one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSnapshot {
    pub label: String,
    pub state: ClipState,
    /// Size of the clip once loaded.
    pub bytes: usize,
    /// Parameters of the last play command, if any.
    pub params: Option<PlayParams>,
    pub playing: bool,
}

#[derive(Debug)]
struct Clip {
    label: String,
    state: ClipState,
    bytes: usize,
    params: Option<PlayParams>,
    playing: bool,
}

impl Clip {
    fn snapshot(&self) -> ClipSnapshot {
        ClipSnapshot {
            label: self.label.clone(),
            state: self.state,
            bytes: self.bytes,
            params: self.params,
            playing: self.playing,
        }
    }
}

type Clips = Arc<Mutex<HashMap<MixerHandle, Clip>>>;

/// Creates [`VirtualMixer`]s on the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct VirtualMixerBackend {
    load_delay: Duration,
}

impl VirtualMixerBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every load by `delay` to mimic slow decoding.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }
}

impl MixerBackend for VirtualMixerBackend {
    fn create(
        &self,
        max_streams: usize,
        completions: CompletionSink,
    ) -> Result<Box<dyn AudioMixer>> {
        let runtime = Handle::try_current().map_err(|_| {
            BridgeError::NotAvailable("VirtualMixer requires a tokio runtime".to_string())
        })?;
        debug!(max_streams, "Creating virtual mixer");
        Ok(Box::new(VirtualMixer::new(
            max_streams,
            completions,
            runtime,
            self.load_delay,
        )))
    }
}

/// In-memory stand-in for a platform sound pool.
pub struct VirtualMixer {
    max_streams: usize,
    completions: CompletionSink,
    runtime: Handle,
    load_delay: Duration,
    next_handle: AtomicU32,
    released: AtomicBool,
    clips: Clips,
}

impl VirtualMixer {
    pub fn new(
        max_streams: usize,
        completions: CompletionSink,
        runtime: Handle,
        load_delay: Duration,
    ) -> Self {
        Self {
            max_streams,
            completions,
            runtime,
            load_delay,
            next_handle: AtomicU32::new(1),
            released: AtomicBool::new(false),
            clips: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn snapshot(&self, handle: MixerHandle) -> Option<ClipSnapshot> {
        self.clips.lock().get(&handle).map(Clip::snapshot)
    }

    /// Handles of clips currently playing.
    pub fn playing(&self) -> Vec<MixerHandle> {
        let mut handles: Vec<_> = self
            .clips
            .lock()
            .iter()
            .filter(|(_, clip)| clip.playing)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort();
        handles
    }

    pub fn len(&self) -> usize {
        self.clips.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_released() {
            return Err(BridgeError::NotAvailable(
                "Virtual mixer has been released".to_string(),
            ));
        }
        Ok(())
    }

    fn with_clip<T>(&self, handle: MixerHandle, f: impl FnOnce(&mut Clip) -> Result<T>) -> Result<T> {
        self.ensure_open()?;
        let mut clips = self.clips.lock();
        let clip = clips
            .get_mut(&handle)
            .ok_or_else(|| BridgeError::NotFound(format!("clip {}", handle)))?;
        f(clip)
    }
}

async fn read_clip(source: ToneSource) -> std::io::Result<usize> {
    match source {
        ToneSource::File { path } => tokio::fs::read(&path).await.map(|data| data.len()),
        ToneSource::Memory { data, .. } => Ok(data.len()),
    }
}

async fn decode(
    handle: MixerHandle,
    source: ToneSource,
    delay: Duration,
    clips: Clips,
    completions: CompletionSink,
) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let label = source.label();
    let status = match read_clip(source).await {
        Ok(0) => LoadStatus::Failed {
            code: STATUS_EMPTY_CLIP,
        },
        Ok(bytes) => {
            if let Some(clip) = clips.lock().get_mut(&handle) {
                clip.state = ClipState::Loaded;
                clip.bytes = bytes;
            }
            LoadStatus::Success
        }
        Err(e) => {
            warn!(label = %label, error = %e, "Failed to read clip");
            LoadStatus::Failed {
                code: STATUS_IO_ERROR,
            }
        }
    };

    if !status.is_success() {
        clips.lock().remove(&handle);
    }

    debug!(label = %label, %handle, status = ?status, "Virtual load finished");
    if let Err(e) = completions.complete(LoadCompletion::new(handle, status)) {
        debug!(error = %e, "Load completion not delivered");
    }
}

impl AudioMixer for VirtualMixer {
    fn load(&self, source: &ToneSource) -> Result<MixerHandle> {
        self.ensure_open()?;

        let mut clips = self.clips.lock();
        let handle = MixerHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        clips.insert(
            handle,
            Clip {
                label: source.label(),
                state: ClipState::Decoding,
                bytes: 0,
                params: None,
                playing: false,
            },
        );
        drop(clips);

        self.runtime.spawn(decode(
            handle,
            source.clone(),
            self.load_delay,
            Arc::clone(&self.clips),
            self.completions.clone(),
        ));
        Ok(handle)
    }

    fn play(&self, handle: MixerHandle, params: &PlayParams) -> Result<()> {
        self.ensure_open()?;
        let mut clips = self.clips.lock();
        let streams = clips
            .iter()
            .filter(|(other, clip)| clip.playing && **other != handle)
            .count();
        let clip = clips
            .get_mut(&handle)
            .ok_or_else(|| BridgeError::NotFound(format!("clip {}", handle)))?;

        if clip.state != ClipState::Loaded {
            return Err(BridgeError::OperationFailed(format!(
                "clip {} is still decoding",
                handle
            )));
        }
        if streams >= self.max_streams {
            return Err(BridgeError::OperationFailed(format!(
                "All {} streams are busy",
                self.max_streams
            )));
        }

        clip.params = Some(*params);
        clip.playing = true;
        debug!(label = %clip.label, %handle, loop_count = params.loop_count, "Virtual play");
        Ok(())
    }

    fn pause(&self, handle: MixerHandle) -> Result<()> {
        self.with_clip(handle, |clip| {
            clip.playing = false;
            Ok(())
        })
    }

    fn set_volume(&self, handle: MixerHandle, left: f32, right: f32) -> Result<()> {
        self.with_clip(handle, |clip| {
            if let Some(params) = clip.params.as_mut() {
                params.left_volume = left;
                params.right_volume = right;
            }
            Ok(())
        })
    }

    fn set_rate(&self, handle: MixerHandle, rate: f32) -> Result<()> {
        self.with_clip(handle, |clip| {
            if let Some(params) = clip.params.as_mut() {
                params.rate = rate;
            }
            Ok(())
        })
    }

    fn unload(&self, handle: MixerHandle) -> Result<()> {
        self.ensure_open()?;
        self.clips
            .lock()
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| BridgeError::NotFound(format!("clip {}", handle)))
    }

    fn release_all(&self) -> Result<()> {
        self.released.store(true, Ordering::SeqCst);
        let mut clips = self.clips.lock();
        debug!(clips = clips.len(), "Releasing virtual mixer");
        clips.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn memory(label: &str, data: &'static [u8]) -> ToneSource {
        ToneSource::Memory {
            label: label.to_string(),
            data: Bytes::from_static(data),
        }
    }

    fn mixer(max_streams: usize) -> (VirtualMixer, tokio::sync::mpsc::UnboundedReceiver<LoadCompletion>) {
        let (sink, rx) = CompletionSink::channel();
        let mixer = VirtualMixer::new(max_streams, sink, Handle::current(), Duration::ZERO);
        (mixer, rx)
    }

    #[tokio::test]
    async fn test_load_reports_success() {
        let (mixer, mut rx) = mixer(2);

        let handle = mixer.load(&memory("beep", b"RIFF")).unwrap();
        let completion = rx.recv().await.unwrap();

        assert_eq!(completion, LoadCompletion::new(handle, LoadStatus::Success));
        let snapshot = mixer.snapshot(handle).unwrap();
        assert_eq!(snapshot.state, ClipState::Loaded);
        assert_eq!(snapshot.bytes, 4);
    }

    #[tokio::test]
    async fn test_empty_clip_fails() {
        let (mixer, mut rx) = mixer(2);

        let handle = mixer.load(&memory("silence", b"")).unwrap();
        let completion = rx.recv().await.unwrap();

        assert_eq!(
            completion.status,
            LoadStatus::Failed {
                code: STATUS_EMPTY_CLIP
            }
        );
        assert!(mixer.snapshot(handle).is_none());
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let (mixer, mut rx) = mixer(2);
        let source = ToneSource::File {
            path: std::env::temp_dir().join("tone-cache-definitely-missing.wav"),
        };

        mixer.load(&source).unwrap();
        let completion = rx.recv().await.unwrap();

        assert_eq!(
            completion.status,
            LoadStatus::Failed {
                code: STATUS_IO_ERROR
            }
        );
    }

    #[tokio::test]
    async fn test_stream_limit_applies_to_playback() {
        let (mixer, mut rx) = mixer(1);

        let a = mixer.load(&memory("a", b"RIFF")).unwrap();
        let b = mixer.load(&memory("b", b"RIFF")).unwrap();
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert_eq!(mixer.len(), 2);

        mixer.play(a, &PlayParams::default()).unwrap();
        assert!(matches!(
            mixer.play(b, &PlayParams::default()),
            Err(BridgeError::OperationFailed(_))
        ));
        // Restarting the stream that already plays is fine
        mixer.play(a, &PlayParams::default()).unwrap();

        mixer.pause(a).unwrap();
        mixer.play(b, &PlayParams::default()).unwrap();
        assert_eq!(mixer.playing(), vec![b]);
    }

    #[tokio::test]
    async fn test_abandoned_load_does_not_block_new_loads() {
        let (mixer, mut rx) = mixer(1);

        // Nobody unloads the first clip once it finishes decoding
        mixer.load(&memory("a", b"RIFF")).unwrap();
        rx.recv().await.unwrap();

        let b = mixer.load(&memory("b", b"RIFF")).unwrap();
        rx.recv().await.unwrap();
        mixer.play(b, &PlayParams::default()).unwrap();
    }

    #[tokio::test]
    async fn test_play_pause_and_adjust() {
        let (mixer, mut rx) = mixer(2);
        let handle = mixer.load(&memory("a", b"RIFF")).unwrap();
        rx.recv().await.unwrap();

        mixer
            .play(handle, &PlayParams::new(1.0, 1.0).with_looping(true))
            .unwrap();
        assert_eq!(mixer.playing(), vec![handle]);

        mixer.set_volume(handle, 0.2, 0.2).unwrap();
        mixer.set_rate(handle, 1.5).unwrap();
        let params = mixer.snapshot(handle).unwrap().params.unwrap();
        assert_eq!(params.left_volume, 0.2);
        assert_eq!(params.rate, 1.5);
        assert!(params.is_looping());

        mixer.pause(handle).unwrap();
        assert!(mixer.playing().is_empty());
    }

    #[tokio::test]
    async fn test_play_before_loaded_fails() {
        let (sink, _rx) = CompletionSink::channel();
        let mixer = VirtualMixer::new(2, sink, Handle::current(), Duration::from_secs(60));

        let handle = mixer.load(&memory("a", b"RIFF")).unwrap();
        assert!(mixer.play(handle, &PlayParams::default()).is_err());
    }

    #[tokio::test]
    async fn test_unload_and_release() {
        let (mixer, mut rx) = mixer(2);
        let handle = mixer.load(&memory("a", b"RIFF")).unwrap();
        rx.recv().await.unwrap();

        mixer.unload(handle).unwrap();
        assert!(mixer.unload(handle).unwrap_err().is_not_found());

        mixer.load(&memory("b", b"RIFF")).unwrap();
        mixer.release_all().unwrap();
        assert!(mixer.is_empty());
        assert!(mixer.is_released());
        assert!(matches!(
            mixer.load(&memory("c", b"RIFF")),
            Err(BridgeError::NotAvailable(_))
        ));
    }

    #[test]
    fn test_backend_requires_runtime() {
        let (sink, _rx) = CompletionSink::channel();
        let err = VirtualMixerBackend::new().create(4, sink).err().unwrap();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }
}
