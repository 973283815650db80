//! Recording mixer fake shared by the integration tests.
//!
//! Every mixer call is appended to an ordered log, and the completion sink
//! handed over at `create` is kept so tests decide when each load finishes.

#![allow(dead_code)]

use bridge_traits::{
    AudioMixer, BridgeError, CompletionSink, MemoryAssetResolver, MixerBackend, MixerHandle,
    PlayParams, ToneSource,
};
use core_tones::{ToneCache, ToneCacheConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum MixerCall {
    Create { max_streams: usize },
    Load { label: String, handle: MixerHandle },
    Play { handle: MixerHandle, params: PlayParams },
    Pause(MixerHandle),
    SetVolume(MixerHandle, f32, f32),
    SetRate(MixerHandle, f32),
    Unload(MixerHandle),
    ReleaseAll,
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<MixerCall>>,
    sinks: Mutex<Vec<CompletionSink>>,
    auto_complete: AtomicBool,
    reject_loads: AtomicBool,
    fail_play: AtomicBool,
}

impl Recorder {
    fn record(&self, call: MixerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Backend whose mixers log every call.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    recorder: Arc<Recorder>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report success synchronously from inside `load`.
    pub fn auto_complete(self) -> Self {
        self.recorder.auto_complete.store(true, Ordering::SeqCst);
        self
    }

    pub fn reject_loads(&self, reject: bool) {
        self.recorder.reject_loads.store(reject, Ordering::SeqCst);
    }

    pub fn fail_play(&self, fail: bool) {
        self.recorder.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<MixerCall> {
        self.recorder.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.recorder.calls.lock().unwrap().clear();
    }

    /// Labels of every load issued, in order.
    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MixerCall::Load { label, .. } => Some(label),
                _ => None,
            })
            .collect()
    }

    /// Handle of the most recent load for `label`.
    pub fn handle_for(&self, label: &str) -> MixerHandle {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                MixerCall::Load { label: l, handle } if l == label => Some(handle),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no load issued for {label}"))
    }

    /// Sink of the most recently created mixer.
    pub fn sink(&self) -> CompletionSink {
        self.recorder
            .sinks
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no mixer created")
    }

    /// Sink of the `index`-th mixer created.
    pub fn sink_at(&self, index: usize) -> CompletionSink {
        self.recorder.sinks.lock().unwrap()[index].clone()
    }

    pub fn succeed(&self, label: &str) {
        let handle = self.handle_for(label);
        self.sink().succeed(handle).unwrap();
    }

    pub fn fail(&self, label: &str, code: i32) {
        let handle = self.handle_for(label);
        self.sink().fail(handle, code).unwrap();
    }
}

impl MixerBackend for RecordingBackend {
    fn create(
        &self,
        max_streams: usize,
        completions: CompletionSink,
    ) -> bridge_traits::Result<Box<dyn AudioMixer>> {
        self.recorder.record(MixerCall::Create { max_streams });
        self.recorder.sinks.lock().unwrap().push(completions.clone());
        Ok(Box::new(RecordingMixer {
            recorder: Arc::clone(&self.recorder),
            completions,
            next_handle: AtomicU32::new(1),
        }))
    }
}

/// Handles restart at 1 for every mixer, like a fresh platform pool.
struct RecordingMixer {
    recorder: Arc<Recorder>,
    completions: CompletionSink,
    next_handle: AtomicU32,
}

impl AudioMixer for RecordingMixer {
    fn load(&self, source: &ToneSource) -> bridge_traits::Result<MixerHandle> {
        if self.recorder.reject_loads.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("pool exhausted".into()));
        }
        let handle = MixerHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.recorder.record(MixerCall::Load {
            label: source.label(),
            handle,
        });
        if self.recorder.auto_complete.load(Ordering::SeqCst) {
            self.completions.succeed(handle)?;
        }
        Ok(handle)
    }

    fn play(&self, handle: MixerHandle, params: &PlayParams) -> bridge_traits::Result<()> {
        if self.recorder.fail_play.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("stream limit reached".into()));
        }
        self.recorder.record(MixerCall::Play {
            handle,
            params: *params,
        });
        Ok(())
    }

    fn pause(&self, handle: MixerHandle) -> bridge_traits::Result<()> {
        self.recorder.record(MixerCall::Pause(handle));
        Ok(())
    }

    fn set_volume(&self, handle: MixerHandle, left: f32, right: f32) -> bridge_traits::Result<()> {
        self.recorder.record(MixerCall::SetVolume(handle, left, right));
        Ok(())
    }

    fn set_rate(&self, handle: MixerHandle, rate: f32) -> bridge_traits::Result<()> {
        self.recorder.record(MixerCall::SetRate(handle, rate));
        Ok(())
    }

    fn unload(&self, handle: MixerHandle) -> bridge_traits::Result<()> {
        self.recorder.record(MixerCall::Unload(handle));
        Ok(())
    }

    fn release_all(&self) -> bridge_traits::Result<()> {
        self.recorder.record(MixerCall::ReleaseAll);
        Ok(())
    }
}

/// Resolver knowing the tones `a`, `b`, `c` and `x`.
pub fn resolver() -> MemoryAssetResolver {
    ["a", "b", "c", "x"]
        .into_iter()
        .fold(MemoryAssetResolver::new(), |resolver, name| {
            resolver.with_asset(name, &b"RIFF....WAVE"[..])
        })
}

pub fn cache_with(backend: &RecordingBackend) -> ToneCache {
    let config = ToneCacheConfig::builder()
        .asset_resolver(Arc::new(resolver()))
        .mixer_backend(Arc::new(backend.clone()))
        .build()
        .unwrap();
    ToneCache::new(config)
}

/// Let the completion consumer drain what has been sent so far.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
