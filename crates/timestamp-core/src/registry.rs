//! Active player registry.
//!
//! Single-slot holder of the bound player and its mutators. Every pass-through
//! is a silent no-op while nothing is bound, since hotkeys can fire before any
//! video was opened.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use timestamp_types::StartTimeMap;

use crate::handle::HandleId;
use crate::locator::Locator;

/// Playback engine instance driven through the registry.
pub trait PlaybackEngine: Send {
    fn seek_to(&mut self, seconds: f64);
    fn current_time(&self) -> f64;
    fn playback_rate(&self) -> f64;
    fn is_playing(&self) -> bool;
}

/// Setter for the player's playing state.
pub type PlaySetter = Box<dyn FnMut(bool) + Send>;
/// Setter for the player's playback rate.
pub type RateSetter = Box<dyn FnMut(f64) + Send>;

/// The bound player plus its play/pause and playback-rate setters.
pub struct PlayerBinding {
    player: Box<dyn PlaybackEngine>,
    set_playing: PlaySetter,
    set_rate: RateSetter,
    origin: Option<Locator>,
    handle: Option<HandleId>,
}

impl PlayerBinding {
    pub fn new(player: Box<dyn PlaybackEngine>, set_playing: PlaySetter, set_rate: RateSetter) -> Self {
        Self {
            player,
            set_playing,
            set_rate,
            origin: None,
            handle: None,
        }
    }

    /// Associate the locator whose resume position this player owns.
    pub fn with_origin(mut self, origin: Locator) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Record the handle the player was opened on.
    pub fn with_handle(mut self, handle: HandleId) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn origin(&self) -> Option<&Locator> {
        self.origin.as_ref()
    }

    pub fn handle(&self) -> Option<HandleId> {
        self.handle
    }

    pub fn current_time(&self) -> f64 {
        self.player.current_time()
    }
}

impl fmt::Debug for PlayerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerBinding")
            .field("origin", &self.origin)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Receives the resume-position map whenever an outgoing binding wrote to it.
///
/// Implementations must not block the caller.
pub trait StartTimeSink: Send + Sync {
    fn persist(&self, start_times: &StartTimeMap);
}

/// Registry shared between the lifecycle manager, commands and marker handlers.
pub type SharedRegistry = Arc<Mutex<PlayerRegistry>>;

/// Single-slot registry of the active player.
#[derive(Default)]
pub struct PlayerRegistry {
    binding: Option<PlayerBinding>,
    start_times: StartTimeMap,
    sink: Option<Arc<dyn StartTimeSink>>,
}

impl PlayerRegistry {
    pub fn new(start_times: StartTimeMap) -> Self {
        Self {
            binding: None,
            start_times,
            sink: None,
        }
    }

    /// Persist resume positions through `sink` on every eviction.
    pub fn with_sink(mut self, sink: Arc<dyn StartTimeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    /// Bind a new player, superseding the current one.
    ///
    /// The outgoing player's position is saved first; it is returned, not
    /// closed (its surface owns teardown).
    pub fn bind(&mut self, binding: PlayerBinding) -> Option<PlayerBinding> {
        let previous = self.evict();
        tracing::debug!(origin = ?binding.origin(), "player bound");
        self.binding = Some(binding);
        previous
    }

    /// Drop the current binding after saving its position.
    pub fn unbind(&mut self) -> Option<PlayerBinding> {
        self.evict()
    }

    pub fn current(&self) -> Option<&PlayerBinding> {
        self.binding.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Resume position for `origin`, `0` when unknown.
    pub fn start_time(&self, origin: &Locator) -> u64 {
        self.start_times.start_for(origin.as_str())
    }

    pub fn start_times(&self) -> &StartTimeMap {
        &self.start_times
    }

    pub fn play(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            (binding.set_playing)(true);
        }
    }

    pub fn pause(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            (binding.set_playing)(false);
        }
    }

    /// Flip play/pause; returns the requested state.
    pub fn toggle_playing(&mut self) -> Option<bool> {
        let binding = self.binding.as_mut()?;
        let playing = !binding.player.is_playing();
        (binding.set_playing)(playing);
        Some(playing)
    }

    pub fn seek_to(&mut self, seconds: f64) {
        if let Some(binding) = self.binding.as_mut() {
            binding.player.seek_to(seconds);
        }
    }

    pub fn current_time(&self) -> Option<f64> {
        self.binding.as_ref().map(|b| b.player.current_time())
    }

    pub fn set_rate(&mut self, rate: f64) {
        if let Some(binding) = self.binding.as_mut() {
            (binding.set_rate)(rate);
        }
    }

    pub fn rate(&self) -> Option<f64> {
        self.binding.as_ref().map(|b| b.player.playback_rate())
    }

    fn evict(&mut self) -> Option<PlayerBinding> {
        let outgoing = self.binding.take()?;
        if let Some(origin) = outgoing.origin() {
            let seconds = whole_seconds(outgoing.current_time());
            self.start_times.set(origin.as_str(), seconds);
            tracing::debug!(origin = %origin, seconds, "saved resume position");
            if let Some(sink) = self.sink.as_ref() {
                sink.persist(&self.start_times);
            }
        }
        Some(outgoing)
    }
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    }
}

/// Lock a shared value, recovering from poisoning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}
