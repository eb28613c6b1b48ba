//! Host environment capabilities consumed by the core.
//!
//! The core never touches widgets directly: it asks the host to open a player
//! surface and to report which surface currently has focus.

use crate::error::MediaError;
use crate::locator::Locator;
use crate::registry::PlayerBinding;

/// Opaque identity token of a host surface (pane, tab, leaf).
///
/// Only compared for equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub String);

/// Where a new player surface should be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewKind {
    /// Side pane, focused on open.
    SidePane,
    /// New tab, opened in the background.
    Tab,
}

impl ViewKind {
    pub fn from_settings(open_in_right_pane: bool) -> Self {
        if open_in_right_pane {
            ViewKind::SidePane
        } else {
            ViewKind::Tab
        }
    }
}

/// Everything the host needs to open a player surface.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerRequest {
    /// What the player should load: a handle URL or a remote locator.
    pub source: String,
    /// Locator the source was derived from; key for resume positions.
    pub origin: Locator,
    /// Resume position in whole seconds.
    pub start_seconds: u64,
    pub view: ViewKind,
}

/// Player-surface capability provided by the host.
pub trait PlayerHost: Send + Sync {
    /// Ask the playback engine whether it can play `source`.
    fn can_play(&self, source: &str) -> bool;

    /// Detach any existing player surface and open a new one.
    ///
    /// Returns the binding for the new player; the registry takes ownership.
    fn open_player(&self, request: PlayerRequest) -> Result<PlayerBinding, MediaError>;

    /// Surface that currently has focus, if the host can tell.
    fn focused_surface(&self) -> Option<SurfaceId>;
}
