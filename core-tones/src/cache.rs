//! # Tone Cache
//!
//! Capacity-bounded registry of named clips backed by a platform mixer.
//!
//! ## Overview
//!
//! - `preload` registers a name synchronously and returns a [`PendingTone`]
//!   that resolves when the mixer reports the load result.
//! - Load results arrive on a completion channel and are applied by a single
//!   consumer task, matched to entries by mixer handle.
//! - At most one tone plays at a time; starting another pauses the current
//!   one first.
//!
//! Every piece of state lives behind one lock. The lock is never held across
//! an `.await`, and the mixer is only invoked while holding it.

use crate::config::{RateRange, ToneCacheConfig};
use crate::entry::{PlayOptions, ToneEntry, ToneState};
use crate::error::{Result, ToneError};
use crate::pending::PendingTone;
use bridge_traits::{AudioMixer, CompletionSink, LoadCompletion, LoadStatus, MixerHandle, PlayParams};
use core_runtime::events::{CoreEvent, EventBus, LifecycleEvent, ToneEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Volume range the mixer treats as meaningful.
const VOLUME_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;

/// Bounded cache of named tones with a single playback slot.
///
/// Created with a [`ToneCacheConfig`], activated by [`initialize`] and
/// deactivated by [`terminate`]. Dropping an initialized cache tears it down
/// the same way `terminate` does.
///
/// [`initialize`]: ToneCache::initialize
/// [`terminate`]: ToneCache::terminate
pub struct ToneCache {
    config: ToneCacheConfig,
    events: Events,
    shared: Arc<Mutex<Shared>>,
}

#[derive(Default)]
struct Shared {
    /// Bumped on every `initialize`; completions from an older mixer are ignored.
    generation: u64,
    state: Option<CacheState>,
}

struct CacheState {
    capacity: usize,
    mixer: Box<dyn AudioMixer>,
    entries: HashMap<String, ToneEntry>,
    active: Option<ActiveSlot>,
    volume: f32,
    rate: f32,
    consumer: JoinHandle<()>,
}

#[derive(Debug, Clone)]
struct ActiveSlot {
    name: String,
    handle: MixerHandle,
}

#[derive(Clone, Default)]
struct Events {
    bus: Option<EventBus>,
}

impl Events {
    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.bus {
            // Err only means nobody is listening
            let _ = bus.emit(event);
        }
    }

    fn tone(&self, event: ToneEvent) {
        self.emit(CoreEvent::Tone(event));
    }

    fn lifecycle(&self, event: LifecycleEvent) {
        self.emit(CoreEvent::Lifecycle(event));
    }
}

impl ToneCache {
    /// Create an inactive cache. Call [`ToneCache::initialize`] before use.
    pub fn new(config: ToneCacheConfig) -> Self {
        let events = Events {
            bus: config.event_bus.clone(),
        };
        Self {
            config,
            events,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Configuration the cache was built with.
    pub fn config(&self) -> &ToneCacheConfig {
        &self.config
    }

    /// Allocate the registry and a mixer able to hold `capacity` tones.
    ///
    /// Must be called from within a tokio runtime: the task that applies
    /// load completions is spawned on the current runtime.
    #[instrument(skip(self))]
    pub fn initialize(&self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(ToneError::InvalidCapacity(capacity));
        }

        let mut shared = self.shared.lock();
        if shared.state.is_some() {
            return Err(ToneError::AlreadyInitialized);
        }

        let runtime = Handle::try_current().map_err(|_| ToneError::RuntimeUnavailable)?;
        let (sink, completions) = CompletionSink::channel();
        let mixer = self.config.mixer_backend.create(capacity, sink)?;

        shared.generation += 1;
        let consumer = runtime.spawn(consume_completions(
            Arc::downgrade(&self.shared),
            shared.generation,
            completions,
            self.events.clone(),
        ));

        shared.state = Some(CacheState {
            capacity,
            mixer,
            entries: HashMap::with_capacity(capacity),
            active: None,
            volume: self.config.initial_volume,
            rate: self.config.initial_rate,
            consumer,
        });

        info!(capacity, generation = shared.generation, "Tone cache initialized");
        self.events
            .lifecycle(LifecycleEvent::Initialized { capacity });
        Ok(())
    }

    /// Register `name` and start loading it.
    ///
    /// Registration is synchronous: when this returns `Ok`, the entry is
    /// visible to every other caller. The returned [`PendingTone`] resolves
    /// with the load outcome, or immediately when the tone is already loaded.
    ///
    /// # Errors
    ///
    /// - [`ToneError::AlreadyLoading`] if a load for `name` is outstanding
    /// - [`ToneError::CapacityExceeded`] if the cache is full
    /// - [`ToneError::ResourceNotFound`] if the asset cannot be resolved
    /// - [`ToneError::LoadFailed`] if the mixer refuses the load outright
    #[instrument(skip(self))]
    pub fn preload(&self, name: &str) -> Result<PendingTone> {
        self.with_state(|state| state.begin_load(name, &self.config, &self.events))
    }

    /// Play `name`, loading it first if it is not registered.
    ///
    /// Whatever was playing is paused before the new tone starts. A tone that
    /// another caller is still loading is not waited for.
    #[instrument(skip(self))]
    pub async fn play(&self, name: &str, options: PlayOptions) -> Result<()> {
        let pending = {
            let mut shared = self.shared.lock();
            let state = shared.state.as_mut().ok_or(ToneError::NotInitialized)?;
            match state.entries.get(name).map(|entry| entry.state) {
                Some(ToneState::Loading) => return Err(ToneError::NotReadyYet(name.to_string())),
                Some(_) => return state.start_playback(name, options, &self.config, &self.events),
                None => state.begin_load(name, &self.config, &self.events)?,
            }
        };

        debug!(name, "Waiting for load before playing");
        pending.await?;

        self.with_state(|state| state.start_playback(name, options, &self.config, &self.events))
    }

    /// Pause the active tone, if any.
    #[instrument(skip(self))]
    pub fn pause(&self) -> Result<()> {
        self.with_state(|state| state.stop_active(&self.events))
    }

    /// Set the global volume and apply it to the active tone.
    ///
    /// Values outside 0.0..=1.0 are applied as given with a warning.
    #[instrument(skip(self))]
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.with_state(|state| {
            warn_if_volume_out_of_range(volume);
            state.volume = volume;
            if let Some(active) = &state.active {
                state.mixer.set_volume(active.handle, volume, volume)?;
            }
            self.events.tone(ToneEvent::VolumeChanged { volume });
            Ok(())
        })
    }

    /// Set the global playback rate and apply it to the active tone.
    ///
    /// Rates outside the configured range are applied as given with a warning.
    #[instrument(skip(self))]
    pub fn set_playback_rate(&self, rate: f32) -> Result<()> {
        self.with_state(|state| {
            let in_range = warn_if_rate_out_of_range(rate, self.config.rate_range);
            state.rate = rate;
            if let Some(active) = &state.active {
                state.mixer.set_rate(active.handle, rate)?;
            }
            self.events
                .tone(ToneEvent::RateChanged { rate, in_range });
            Ok(())
        })
    }

    /// Forget `name`, freeing its mixer slot.
    ///
    /// A tone still loading has its pending result resolved with
    /// [`ToneError::LoadCancelled`]; its eventual completion is dropped.
    #[instrument(skip(self))]
    pub fn release(&self, name: &str) -> Result<()> {
        self.with_state(|state| {
            if state.active.as_ref().is_some_and(|active| active.name == name) {
                state.stop_active(&self.events)?;
            }

            let Some(mut entry) = state.entries.remove(name) else {
                debug!(name, "Release of unregistered tone ignored");
                return Ok(());
            };

            let unloaded = if entry.state.is_loading() {
                debug!(name, handle = %entry.handle, "Released tone while loading");
                entry.resolve(Err(ToneError::LoadCancelled(name.to_string())));
                Ok(())
            } else {
                state.mixer.unload(entry.handle)
            };

            self.events.tone(ToneEvent::Released {
                name: name.to_string(),
            });
            unloaded.map_err(ToneError::from)
        })
    }

    /// Tear down the mixer and drop every entry.
    ///
    /// Outstanding loads resolve with [`ToneError::LoadCancelled`]. The cache
    /// is inactive afterwards even if the mixer reports an error.
    #[instrument(skip(self))]
    pub fn terminate(&self) -> Result<()> {
        let mut shared = self.shared.lock();
        let state = shared.state.take().ok_or(ToneError::NotInitialized)?;
        let released = state.teardown(&self.events)?;
        info!(released, "Tone cache terminated");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.lock().state.is_some()
    }

    /// Capacity fixed at initialize, `None` while inactive.
    pub fn capacity(&self) -> Option<usize> {
        self.inspect(|state| state.capacity)
    }

    /// Number of registered tones, loading ones included.
    pub fn len(&self) -> usize {
        self.inspect(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state(name).is_some()
    }

    pub fn state(&self, name: &str) -> Option<ToneState> {
        self.inspect(|state| state.entries.get(name).map(|entry| entry.state))
            .flatten()
    }

    /// Whether `name` was last played with indefinite looping.
    pub fn is_looping(&self, name: &str) -> bool {
        self.inspect(|state| state.entries.get(name).is_some_and(|entry| entry.looping))
            .unwrap_or(false)
    }

    /// Name of the tone occupying the playback slot.
    pub fn active_tone(&self) -> Option<String> {
        self.inspect(|state| state.active.as_ref().map(|active| active.name.clone()))
            .flatten()
    }

    pub fn volume(&self) -> Option<f32> {
        self.inspect(|state| state.volume)
    }

    pub fn playback_rate(&self) -> Option<f32> {
        self.inspect(|state| state.rate)
    }

    /// Subscribe to cache events, if an event bus was configured.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<CoreEvent>> {
        self.events.bus.as_ref().map(EventBus::subscribe)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut CacheState) -> Result<T>) -> Result<T> {
        let mut shared = self.shared.lock();
        let state = shared.state.as_mut().ok_or(ToneError::NotInitialized)?;
        f(state)
    }

    fn inspect<T>(&self, f: impl FnOnce(&CacheState) -> T) -> Option<T> {
        self.shared.lock().state.as_ref().map(f)
    }
}

impl fmt::Debug for ToneCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        let mut out = f.debug_struct("ToneCache");
        out.field("generation", &shared.generation);
        match &shared.state {
            Some(state) => out
                .field("capacity", &state.capacity)
                .field("entries", &state.entries.len())
                .field("active", &state.active.as_ref().map(|active| &active.name))
                .field("volume", &state.volume)
                .field("rate", &state.rate),
            None => out.field("initialized", &false),
        };
        out.finish()
    }
}

impl Drop for ToneCache {
    fn drop(&mut self) {
        let mut shared = self.shared.lock();
        if let Some(state) = shared.state.take() {
            if let Err(e) = state.teardown(&self.events) {
                warn!(error = %e, "Tone cache teardown on drop reported an error");
            }
        }
    }
}

impl CacheState {
    fn begin_load(
        &mut self,
        name: &str,
        config: &ToneCacheConfig,
        events: &Events,
    ) -> Result<PendingTone> {
        if let Some(entry) = self.entries.get(name) {
            if entry.state.is_loading() {
                return Err(ToneError::AlreadyLoading(name.to_string()));
            }
            debug!(name, state = ?entry.state, "Tone already loaded");
            return Ok(PendingTone::ready());
        }

        if self.entries.len() >= self.capacity {
            debug!(name, capacity = self.capacity, "Tone cache full");
            return Err(ToneError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let source = config.asset_resolver.resolve(name).map_err(|e| {
            warn!(name, error = %e, "Failed to resolve tone asset");
            ToneError::ResourceNotFound(name.to_string())
        })?;

        let handle = self.mixer.load(&source).map_err(|e| {
            warn!(name, error = %e, "Mixer rejected tone load");
            ToneError::LoadFailed {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;

        let (sender, receiver) = oneshot::channel();
        self.entries
            .insert(name.to_string(), ToneEntry::loading(handle, sender));

        debug!(name, %handle, source = %source.label(), "Tone load issued");
        events.tone(ToneEvent::LoadStarted {
            name: name.to_string(),
            handle: handle.raw(),
        });

        Ok(PendingTone::waiting(name, receiver))
    }

    fn start_playback(
        &mut self,
        name: &str,
        options: PlayOptions,
        config: &ToneCacheConfig,
        events: &Events,
    ) -> Result<()> {
        let handle = match self.entries.get(name) {
            Some(entry) if entry.state.is_ready() => entry.handle,
            _ => return Err(ToneError::NotReadyYet(name.to_string())),
        };

        self.stop_active(events)?;

        warn_if_volume_out_of_range(options.volume);
        warn_if_rate_out_of_range(options.rate, config.rate_range);
        self.volume = options.volume;
        self.rate = options.rate;

        let params = PlayParams::new(options.volume, options.rate)
            .with_priority(config.priority)
            .with_looping(options.looping);
        self.mixer.play(handle, &params)?;

        if let Some(entry) = self.entries.get_mut(name) {
            entry.state = ToneState::Playing;
            entry.looping = options.looping;
        }
        self.active = Some(ActiveSlot {
            name: name.to_string(),
            handle,
        });

        debug!(name, %handle, looping = options.looping, "Tone playing");
        events.tone(ToneEvent::PlaybackStarted {
            name: name.to_string(),
            looping: options.looping,
            volume: options.volume,
            rate: options.rate,
        });
        Ok(())
    }

    /// Pause whatever occupies the playback slot and demote it to `Ready`.
    fn stop_active(&mut self, events: &Events) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        if let Some(entry) = self.entries.get_mut(&active.name) {
            entry.state = ToneState::Ready;
        }

        let paused = self.mixer.pause(active.handle);
        debug!(name = %active.name, handle = %active.handle, "Tone paused");
        events.tone(ToneEvent::PlaybackPaused { name: active.name });
        paused.map_err(ToneError::from)
    }

    fn apply_completion(&mut self, completion: LoadCompletion, events: &Events) {
        let matched = self
            .entries
            .iter()
            .find(|(_, entry)| entry.state.is_loading() && entry.handle == completion.handle)
            .map(|(name, _)| name.clone());

        let Some(name) = matched else {
            debug!(
                handle = %completion.handle,
                status = ?completion.status,
                "Dropping completion with no matching load"
            );
            return;
        };

        match completion.status {
            LoadStatus::Success => {
                if let Some(entry) = self.entries.get_mut(&name) {
                    entry.state = ToneState::Ready;
                    entry.resolve(Ok(()));
                }
                debug!(name = %name, handle = %completion.handle, "Tone loaded");
                events.tone(ToneEvent::Loaded { name });
            }
            LoadStatus::Failed { code } => {
                let reason = format!("mixer reported status {}", code);
                if let Some(mut entry) = self.entries.remove(&name) {
                    entry.resolve(Err(ToneError::LoadFailed {
                        name: name.clone(),
                        reason: reason.clone(),
                    }));
                }
                warn!(name = %name, code, "Tone load failed");
                events.tone(ToneEvent::LoadFailed {
                    name,
                    message: reason,
                });
            }
        }
    }

    /// Shut everything down, returning how many entries were dropped.
    ///
    /// Runs to completion before reporting the first mixer error.
    fn teardown(mut self, events: &Events) -> Result<usize> {
        let paused = self.stop_active(events);

        let released = self.entries.len();
        for (name, mut entry) in self.entries.drain() {
            if entry.state.is_loading() {
                debug!(name = %name, handle = %entry.handle, "Cancelling outstanding load");
                entry.resolve(Err(ToneError::LoadCancelled(name)));
            }
        }

        self.consumer.abort();
        let freed = self.mixer.release_all();

        events.lifecycle(LifecycleEvent::Terminated { released });
        paused?;
        freed?;
        Ok(released)
    }
}

fn warn_if_volume_out_of_range(volume: f32) {
    if !VOLUME_RANGE.contains(&volume) {
        warn!(volume, "Volume outside 0.0..=1.0; applying anyway");
    }
}

fn warn_if_rate_out_of_range(rate: f32, range: RateRange) -> bool {
    let in_range = range.contains(rate);
    if !in_range {
        warn!(
            rate,
            min = range.min,
            max = range.max,
            "Playback rate outside supported range; applying anyway"
        );
    }
    in_range
}

/// Apply load completions for one mixer generation until the channel closes
/// or the cache goes away.
async fn consume_completions(
    cache: Weak<Mutex<Shared>>,
    generation: u64,
    mut completions: mpsc::UnboundedReceiver<LoadCompletion>,
    events: Events,
) {
    while let Some(completion) = completions.recv().await {
        let Some(shared) = cache.upgrade() else {
            break;
        };
        let mut shared = shared.lock();
        let current = shared.generation == generation;
        match shared.state.as_mut() {
            Some(state) if current => state.apply_completion(completion, &events),
            _ => debug!(
                handle = %completion.handle,
                generation,
                "Dropping completion from a retired mixer"
            ),
        }
    }
    debug!(generation, "Completion consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{MemoryAssetResolver, MixerBackend, ToneSource};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingMixer {
        next: AtomicU32,
    }

    impl AudioMixer for CountingMixer {
        fn load(&self, _source: &ToneSource) -> bridge_traits::Result<MixerHandle> {
            Ok(MixerHandle::new(self.next.fetch_add(1, Ordering::SeqCst) + 1))
        }
        fn play(&self, _handle: MixerHandle, _params: &PlayParams) -> bridge_traits::Result<()> {
            Ok(())
        }
        fn pause(&self, _handle: MixerHandle) -> bridge_traits::Result<()> {
            Ok(())
        }
        fn set_volume(&self, _handle: MixerHandle, _l: f32, _r: f32) -> bridge_traits::Result<()> {
            Ok(())
        }
        fn set_rate(&self, _handle: MixerHandle, _rate: f32) -> bridge_traits::Result<()> {
            Ok(())
        }
        fn unload(&self, _handle: MixerHandle) -> bridge_traits::Result<()> {
            Ok(())
        }
        fn release_all(&self) -> bridge_traits::Result<()> {
            Ok(())
        }
    }

    struct CountingBackend;

    impl MixerBackend for CountingBackend {
        fn create(
            &self,
            _max_streams: usize,
            _completions: CompletionSink,
        ) -> bridge_traits::Result<Box<dyn AudioMixer>> {
            Ok(Box::new(CountingMixer::default()))
        }
    }

    fn cache() -> ToneCache {
        let config = ToneCacheConfig::builder()
            .asset_resolver(Arc::new(
                MemoryAssetResolver::new().with_asset("a", &b"RIFF"[..]),
            ))
            .mixer_backend(Arc::new(CountingBackend))
            .build()
            .unwrap();
        ToneCache::new(config)
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn initialize_requires_runtime() {
        let cache = cache();
        assert!(matches!(
            cache.initialize(4),
            Err(ToneError::RuntimeUnavailable)
        ));
        assert!(!cache.is_initialized());
    }

    #[tokio::test]
    async fn play_future_is_send() {
        let cache = cache();
        cache.initialize(1).unwrap();
        let fut = cache.play("a", PlayOptions::once());
        assert_send(&fut);
        drop(fut);
    }

    #[tokio::test]
    async fn queries_while_inactive() {
        let cache = cache();
        assert_eq!(cache.capacity(), None);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.volume(), None);
        assert_eq!(cache.active_tone(), None);
        assert!(cache.subscribe().is_none());
    }

    #[tokio::test]
    async fn stale_generation_is_ignored() {
        let cache = cache();
        cache.initialize(1).unwrap();
        let _pending = cache.preload("a").unwrap();

        let (sink, completions) = CompletionSink::channel();
        let stale = tokio::spawn(consume_completions(
            Arc::downgrade(&cache.shared),
            0,
            completions,
            Events::default(),
        ));
        sink.succeed(MixerHandle::new(1)).unwrap();
        drop(sink);
        stale.await.unwrap();

        assert_eq!(cache.state("a"), Some(ToneState::Loading));
    }

    #[tokio::test]
    async fn debug_reports_state() {
        let cache = cache();
        assert!(format!("{:?}", cache).contains("initialized: false"));
        cache.initialize(3).unwrap();
        assert!(format!("{:?}", cache).contains("capacity: 3"));
    }
}
