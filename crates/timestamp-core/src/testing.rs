//! Hand-written fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::MediaError;
use crate::handle::ResourceFetcher;
use crate::host::{PlayerHost, PlayerRequest, SurfaceId};
use crate::locator::Locator;
use crate::registry::{PlaybackEngine, PlayerBinding};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FakePlayerState {
    pub time: f64,
    pub rate: f64,
    pub playing: bool,
    pub seeks: Vec<f64>,
}

impl Default for FakePlayerState {
    fn default() -> Self {
        Self {
            time: 0.0,
            rate: 1.0,
            playing: false,
            seeks: Vec::new(),
        }
    }
}

/// Player whose state the test can observe after handing out a binding.
#[derive(Clone, Default)]
pub(crate) struct FakePlayer {
    state: Arc<Mutex<FakePlayerState>>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FakePlayerState {
        self.state.lock().unwrap().clone()
    }

    pub fn set_time(&self, seconds: f64) {
        self.state.lock().unwrap().time = seconds;
    }

    pub fn set_rate(&self, rate: f64) {
        self.state.lock().unwrap().rate = rate;
    }

    pub fn binding(&self) -> PlayerBinding {
        let playing = self.state.clone();
        let rate = self.state.clone();
        PlayerBinding::new(
            Box::new(self.clone()),
            Box::new(move |value| playing.lock().unwrap().playing = value),
            Box::new(move |value| rate.lock().unwrap().rate = value),
        )
    }
}

impl PlaybackEngine for FakePlayer {
    fn seek_to(&mut self, seconds: f64) {
        let mut state = self.state.lock().unwrap();
        state.time = seconds;
        state.seeks.push(seconds);
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().time
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

/// Host that records player requests and hands out [`FakePlayer`]s.
///
/// Sources containing `invalid` are reported as unplayable.
#[derive(Default)]
pub(crate) struct FakeHost {
    requests: Mutex<Vec<PlayerRequest>>,
    players: Mutex<Vec<FakePlayer>>,
    focused: Mutex<Option<SurfaceId>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self, surface: &str) {
        *self.focused.lock().unwrap() = Some(SurfaceId(surface.to_string()));
    }

    pub fn requests(&self) -> Vec<PlayerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_player(&self) -> Option<FakePlayer> {
        self.players.lock().unwrap().last().cloned()
    }
}

impl PlayerHost for FakeHost {
    fn can_play(&self, source: &str) -> bool {
        !source.contains("invalid")
    }

    fn open_player(&self, request: PlayerRequest) -> Result<PlayerBinding, MediaError> {
        let player = FakePlayer::new();
        player.set_time(request.start_seconds as f64);
        self.requests.lock().unwrap().push(request);
        self.players.lock().unwrap().push(player.clone());
        Ok(player.binding())
    }

    fn focused_surface(&self) -> Option<SurfaceId> {
        self.focused.lock().unwrap().clone()
    }
}

/// Fetcher that answers immediately; each call yields distinct bytes.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    fail: bool,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, MediaError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MediaError::FetchFailed {
                locator: locator.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(format!("{locator}#{n}").into_bytes())
    }
}

/// Fetcher whose calls block until the test releases them, in any order.
#[derive(Default)]
pub(crate) struct GatedFetcher {
    pending: Mutex<Vec<Option<oneshot::Sender<Vec<u8>>>>>,
}

impl GatedFetcher {
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub async fn wait_for_pending(&self, count: usize) {
        while self.pending() < count {
            tokio::task::yield_now().await;
        }
    }

    /// Complete the `index`-th fetch (in call order) with `bytes`.
    pub fn release(&self, index: usize, bytes: Vec<u8>) {
        let sender = self.pending.lock().unwrap()[index]
            .take()
            .expect("fetch already released");
        let _ = sender.send(bytes);
    }
}

#[async_trait]
impl ResourceFetcher for GatedFetcher {
    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, MediaError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(Some(tx));
        rx.await.map_err(|_| MediaError::FetchFailed {
            locator: locator.to_string(),
            reason: "gate dropped".to_string(),
        })
    }
}

/// Let spawned background tasks run to completion.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
