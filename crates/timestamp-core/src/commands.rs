//! Editor commands.
//!
//! Each command either returns text for the editor to insert or drives the
//! bound player through the registry. Commands that need a player report
//! [`MediaError::NoActivePlayer`] so the caller can insert its callout; the
//! play/speed controls stay silent no-ops instead.

use std::time::Instant;

use timestamp_types::Settings;

use crate::error::MediaError;
use crate::host::ViewKind;
use crate::lifecycle::HandleManager;
use crate::locator::{Resolver, display_name};
use crate::markers;
use crate::registry::lock;
use crate::seek::{SeekDirection, SeekEngine, SeekParams};
use crate::settings::SettingsStore;
use crate::timestamp;

/// Playback rate ceiling for speed-up.
const MAX_RATE: f64 = 10.0;

/// Command surface bound to one handle manager.
///
/// Settings are read from the store on every command, so edits saved through
/// [`SettingsStore::update`] apply to the next command.
pub struct Commands {
    manager: HandleManager,
    vault_root: String,
    store: SettingsStore,
    seek: SeekEngine,
    started: Instant,
}

impl Commands {
    pub fn new(manager: HandleManager, vault_root: impl Into<String>, store: SettingsStore) -> Self {
        let commands = Self {
            manager,
            vault_root: vault_root.into(),
            store,
            seek: SeekEngine::new(),
            started: Instant::now(),
        };
        commands.current_settings();
        commands
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Resolver for the current bridge settings.
    pub fn resolver(&self) -> Resolver {
        Resolver::from_settings(self.vault_root.clone(), &self.store.settings())
    }

    /// Snapshot the settings and push the player placement to the manager.
    fn current_settings(&self) -> Settings {
        let settings = self.store.settings();
        self.manager
            .set_view_kind(ViewKind::from_settings(settings.open_in_right_pane));
        settings
    }

    /// Text marking the current play time, as a block or an inline code span.
    pub fn insert_timestamp(&self, inline: bool) -> Result<String, MediaError> {
        let seconds = lock(self.manager.registry())
            .current_time()
            .ok_or(MediaError::NoActivePlayer)?;
        let time = timestamp::encode(seconds);
        Ok(if inline {
            markers::inline_timestamp(&time)
        } else {
            markers::timestamp_block(&time)
        })
    }

    /// Accelerating seek; returns the new position.
    pub fn seek(&mut self, direction: SeekDirection) -> Result<f64, MediaError> {
        let now_ms = self.started.elapsed().as_millis() as u64;
        self.seek_at(direction, now_ms)
    }

    /// [`Commands::seek`] with an explicit clock reading.
    pub fn seek_at(&mut self, direction: SeekDirection, now_ms: u64) -> Result<f64, MediaError> {
        let mut registry = lock(self.manager.registry());
        let current = registry.current_time().ok_or(MediaError::NoActivePlayer)?;
        let params = seek_params(&self.store.settings(), direction);
        let delta = self.seek.seek(direction, params, now_ms);
        let target = (current + delta).max(0.0);
        registry.seek_to(target);
        tracing::debug!(?direction, delta, target, "seek");
        Ok(target)
    }

    pub fn restart(&self) {
        lock(self.manager.registry()).seek_to(0.0);
    }

    /// Flip play/pause; `None` while nothing is bound.
    pub fn toggle_play(&self) -> Option<bool> {
        lock(self.manager.registry()).toggle_playing()
    }

    /// Raise the rate by one step while below the ceiling.
    pub fn speed_up(&self) -> Option<f64> {
        let step = self.store.settings().speed_factor;
        let mut registry = lock(self.manager.registry());
        let rate = registry.rate()?;
        if rate >= MAX_RATE {
            return None;
        }
        let next = round_rate(rate + step);
        registry.set_rate(next);
        Some(next)
    }

    /// Lower the rate by one step while it stays positive.
    pub fn speed_down(&self) -> Option<f64> {
        let step = self.store.settings().speed_factor;
        let mut registry = lock(self.manager.registry());
        let rate = registry.rate()?;
        if rate <= step {
            return None;
        }
        let next = round_rate(rate - step);
        registry.set_rate(next);
        Some(next)
    }

    pub fn reset_speed(&self) -> Option<f64> {
        let mut registry = lock(self.manager.registry());
        registry.rate()?;
        registry.set_rate(1.0);
        Some(1.0)
    }

    /// Open an online video from clipboard text and return its button block.
    pub fn online_video_block(&self, clipboard: &str) -> Result<String, MediaError> {
        let settings = self.current_settings();
        let locator = Resolver::from_settings(self.vault_root.clone(), &settings).resolve(clipboard)?;
        self.manager.activate_remote(&locator)?;
        let block = markers::video_block(" Title", locator.as_str());
        Ok(if settings.note_title.is_empty() {
            block
        } else {
            format!("\n{}\n{block}", settings.note_title)
        })
    }

    /// Button block for a local video reached through the HTTP bridge.
    pub fn local_video_block(&self, clipboard: &str) -> Result<String, MediaError> {
        let locator = self.resolver().resolve_for_bridge(clipboard)?;
        Ok(markers::video_block(display_name(clipboard), locator.as_str()))
    }

    /// Fetch a local video through the HTTP bridge and open a player on it.
    pub async fn open_local_video(&self, clipboard: &str) -> Result<(), MediaError> {
        let settings = self.current_settings();
        let locator = Resolver::from_settings(self.vault_root.clone(), &settings)
            .resolve_for_bridge(clipboard)?;
        let handle = self
            .manager
            .open_handle(&locator)
            .await
            .map_err(|err| match err {
                MediaError::FetchFailed { locator, .. } => MediaError::UnresolvedPath { locator },
                other => other,
            })?;
        self.manager.activate_handle(&handle)
    }
}

fn seek_params(settings: &Settings, direction: SeekDirection) -> SeekParams {
    let base_amount = match direction {
        SeekDirection::Forward => settings.forward_seek,
        SeekDirection::Backward => settings.backwards_seek,
    };
    SeekParams {
        base_amount,
        factor: settings.seek_factor,
        factor_cap: settings.max_cumulated_seek_factor,
        reset_window_ms: settings.seek_repeat_reset_time,
    }
}

fn round_rate(rate: f64) -> f64 {
    (rate * 1e6).round() / 1e6
}
