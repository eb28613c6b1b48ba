//! Settings persistence.
//!
//! Settings live in one JSON document (the plugin data file). Resume positions
//! are written back whenever the registry evicts a player; those writes run in
//! the background and only the newest snapshot reaches disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use timestamp_types::{Settings, StartTimeMap};

use crate::registry::{StartTimeSink, lock};

/// File-backed settings shared between the command layer and the registry.
#[derive(Clone)]
pub struct SettingsStore {
    path: PathBuf,
    current: Arc<Mutex<Settings>>,
    generation: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    /// Load settings from `path`; a missing file yields defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = load(&path)?;
        Ok(Self {
            path,
            current: Arc::new(Mutex::new(settings)),
            generation: Arc::new(AtomicU64::new(0)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Settings {
        lock(&self.current).clone()
    }

    /// Replace the settings and write them out.
    pub fn update(&self, mut settings: Settings) -> Result<()> {
        for field in settings.sanitize() {
            tracing::warn!(field, "invalid setting replaced with default");
        }
        *lock(&self.current) = settings;
        self.save()
    }

    /// Write the current settings to disk.
    pub fn save(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.settings();
        let _guard = lock(&self.write_lock);
        write_settings(&self.path, &snapshot)
    }

    /// Store new resume positions and write them out.
    pub fn save_start_times(&self, start_times: &StartTimeMap) -> Result<()> {
        lock(&self.current).url_start_time_map = start_times.clone();
        self.save()
    }

    fn write_if_latest(&self, generation: u64, snapshot: &Settings) {
        let _guard = lock(&self.write_lock);
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "skipping superseded settings snapshot");
            return;
        }
        if let Err(err) = write_settings(&self.path, snapshot) {
            tracing::warn!(path = ?self.path, error = %err, "failed to persist resume positions");
        }
    }
}

impl StartTimeSink for SettingsStore {
    fn persist(&self, start_times: &StartTimeMap) {
        let snapshot = {
            let mut current = lock(&self.current);
            current.url_start_time_map = start_times.clone();
            current.clone()
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let store = self.clone();
                runtime.spawn_blocking(move || store.write_if_latest(generation, &snapshot));
            }
            Err(_) => self.write_if_latest(generation, &snapshot),
        }
    }
}

/// Read settings from `path`, falling back to defaults when it does not exist.
pub fn load(path: &Path) -> Result<Settings> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = ?path, "no settings file; using defaults");
            return Ok(Settings::default());
        }
        Err(err) => return Err(err).with_context(|| format!("read settings {:?}", path)),
    };
    let mut settings: Settings =
        serde_json::from_str(&raw).with_context(|| format!("parse settings {:?}", path))?;
    for field in settings.sanitize() {
        tracing::warn!(field, "invalid setting replaced with default");
    }
    Ok(settings)
}

/// Write `settings` next to `path` and rename it into place.
fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create settings dir {:?}", parent))?;
    }
    let body = serde_json::to_string_pretty(settings).context("serialize settings")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body).with_context(|| format!("write settings {:?}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("replace settings {:?}", path))?;
    Ok(())
}
