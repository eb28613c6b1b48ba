//! Handle lifecycle for video controls.
//!
//! Fetches bytes for a control's locator, wraps them in a handle and installs a
//! click action bound to it. Handles go stale when the host reclaims them, so
//! controls are re-fetched when:
//! - the player reports a load error
//! - the player surface is detached
//! - focus returns to the surface a control was clicked from
//!
//! Continuations run on the tokio runtime and may interleave. Overlapping
//! refreshes of one control are last-writer-wins on its action slot; every
//! superseded handle is revoked, or deferred while the bound player uses it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::control::{ClickAction, Control, ControlId};
use crate::error::MediaError;
use crate::handle::{Handle, HandleId, HandleStore, ResourceFetcher};
use crate::host::{PlayerHost, PlayerRequest, SurfaceId, ViewKind};
use crate::locator::Locator;
use crate::registry::{SharedRegistry, lock};

#[derive(Default)]
struct ControlTable {
    controls: HashMap<ControlId, Control>,
    next_id: u64,
    /// Control whose click opened the current player.
    active: Option<ControlId>,
    /// Superseded handles still used by the bound player.
    deferred: Vec<HandleId>,
}

struct Inner {
    fetcher: Arc<dyn ResourceFetcher>,
    host: Arc<dyn PlayerHost>,
    registry: SharedRegistry,
    handles: HandleStore,
    view: Mutex<ViewKind>,
    table: Mutex<ControlTable>,
}

/// Owns controls and the handles behind them.
///
/// Lock order is control table, then registry.
#[derive(Clone)]
pub struct HandleManager {
    inner: Arc<Inner>,
}

impl HandleManager {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        host: Arc<dyn PlayerHost>,
        registry: SharedRegistry,
        handles: HandleStore,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                host,
                registry,
                handles,
                view: Mutex::new(ViewKind::SidePane),
                table: Mutex::new(ControlTable::default()),
            }),
        }
    }

    pub fn handles(&self) -> &HandleStore {
        &self.inner.handles
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.inner.registry
    }

    /// Placement used for players opened from now on.
    pub fn set_view_kind(&self, view: ViewKind) {
        *lock(&self.inner.view) = view;
    }

    /// Register a control; it shows the waiting label until a handle is bound.
    pub fn create_control(&self, label: impl Into<String>, locator: Locator) -> ControlId {
        let mut table = lock(&self.inner.table);
        table.next_id += 1;
        let id = ControlId(table.next_id);
        table.controls.insert(id, Control::new(id, label, locator));
        id
    }

    /// Register a control and start fetching its first handle.
    pub fn attach_control(&self, label: impl Into<String>, locator: Locator) -> ControlId {
        let id = self.create_control(label, locator);
        self.spawn_refresh(id);
        id
    }

    pub fn control(&self, id: ControlId) -> Option<Control> {
        lock(&self.inner.table).controls.get(&id).cloned()
    }

    /// Forget a control whose document region was removed.
    pub fn remove_control(&self, id: ControlId) -> bool {
        let mut table = lock(&self.inner.table);
        let Some(mut control) = table.controls.remove(&id) else {
            return false;
        };
        if table.active == Some(id) {
            table.active = None;
        }
        if let Some(action) = control.take_action() {
            self.release(&mut table, action.handle.id());
        }
        true
    }

    /// Fetch `locator` and wrap the bytes in a new handle.
    pub async fn open_handle(&self, locator: &Locator) -> Result<Handle, MediaError> {
        match self.inner.fetcher.fetch(locator).await {
            Ok(bytes) => {
                let handle = self.inner.handles.create(locator.clone(), bytes);
                tracing::debug!(locator = %locator, handle = %handle.id(), bytes = handle.len(), "handle opened");
                Ok(handle)
            }
            Err(err) => {
                tracing::warn!(locator = %locator, error = %err, "failed to open handle");
                Err(err)
            }
        }
    }

    /// Point `id` at `handle`, replacing (and releasing) its previous handle.
    ///
    /// Returns `false` and revokes `handle` if the control no longer exists.
    pub fn bind_control(&self, id: ControlId, locator: &Locator, handle: Handle) -> bool {
        let mut table = lock(&self.inner.table);
        let Some(control) = table.controls.get_mut(&id) else {
            tracing::debug!(control = ?id, "control removed before its handle arrived");
            self.inner.handles.revoke(handle.id());
            return false;
        };
        control.set_locator(locator.clone());
        control.set_waiting(false);
        let previous = control.rebind(ClickAction { handle });
        if let Some(previous) = previous {
            self.release(&mut table, previous.handle.id());
        }
        true
    }

    /// Re-fetch a control's handle and rebind it.
    ///
    /// The label shows the waiting indicator until the fetch succeeds; on
    /// failure it stays that way until the user triggers another refresh.
    /// Returns `Ok(None)` when the control disappeared in the meantime.
    pub async fn refresh_control(
        &self,
        id: ControlId,
        locator: &Locator,
    ) -> Result<Option<HandleId>, MediaError> {
        if !self.mark_waiting(id) {
            return Ok(None);
        }
        tracing::debug!(control = ?id, locator = %locator, "refreshing control");
        let handle = self.open_handle(locator).await?;
        let handle_id = handle.id();
        let bound = self.bind_control(id, locator, handle);
        if bound {
            tracing::info!(control = ?id, handle = %handle_id, "control refreshed");
        }
        Ok(bound.then_some(handle_id))
    }

    /// Fire-and-forget [`HandleManager::refresh_control`] on the current runtime.
    pub fn spawn_refresh(&self, id: ControlId) {
        let Some(locator) = self.control(id).map(|c| c.locator().clone()) else {
            return;
        };
        self.mark_waiting(id);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(control = ?id, "no async runtime; refresh skipped");
            return;
        };
        let manager = self.clone();
        runtime.spawn(async move {
            let _ = manager.refresh_control(id, &locator).await;
        });
    }

    /// Run a control's click action.
    ///
    /// Records the focused surface on first click, then makes sure a player is
    /// bound to the control's handle. Returns `Ok(false)` when nothing could be
    /// activated (still waiting, no focused surface, stale handle).
    pub fn click(&self, id: ControlId) -> Result<bool, MediaError> {
        let handle = {
            let mut table = lock(&self.inner.table);
            let Some(control) = table.controls.get_mut(&id) else {
                return Ok(false);
            };
            let Some(action) = control.action().cloned() else {
                tracing::debug!(control = ?id, "control clicked while waiting");
                return Ok(false);
            };
            if control.surface().is_none() {
                match self.inner.host.focused_surface() {
                    Some(surface) => control.remember_surface(surface),
                    None => {
                        tracing::warn!(control = ?id, "could not resolve the focused surface");
                        return Ok(false);
                    }
                }
            }
            table.active = Some(id);
            action.handle
        };

        if !self.inner.handles.is_live(handle.id()) {
            tracing::info!(control = ?id, handle = %handle.id(), "handle expired; refreshing");
            self.spawn_refresh(id);
            return Ok(false);
        }
        if self.bound_handle() == Some(handle.id()) {
            return Ok(true);
        }
        self.activate_handle(&handle)?;
        Ok(true)
    }

    /// Open a player on a local handle.
    pub fn activate_handle(&self, handle: &Handle) -> Result<(), MediaError> {
        self.activate(handle.url(), handle.origin().clone(), Some(handle.id()))
    }

    /// Open a player directly on a remote locator.
    pub fn activate_remote(&self, locator: &Locator) -> Result<(), MediaError> {
        if !self.inner.host.can_play(locator.as_str()) {
            return Err(MediaError::InvalidUrl {
                locator: locator.to_string(),
            });
        }
        self.activate(locator.to_string(), locator.clone(), None)
    }

    /// The host's focus moved to `surface`; refresh the control that opened
    /// the current player if it was clicked from there.
    ///
    /// Other controls on the surface keep their handles. Controls that were
    /// never clicked have no surface and are left alone.
    pub fn on_surface_focused(&self, surface: &SurfaceId) -> Vec<ControlId> {
        let stale: Vec<ControlId> = {
            let table = lock(&self.inner.table);
            let driving = table
                .active
                .and_then(|id| table.controls.get(&id))
                .filter(|c| c.surface() == Some(surface));
            driving.map(Control::id).into_iter().collect()
        };
        for id in &stale {
            self.spawn_refresh(*id);
        }
        stale
    }

    /// The player failed to load its stream; refresh the control that opened it.
    pub fn on_player_error(&self, message: &str) -> Option<ControlId> {
        tracing::warn!(error = message, "player reported a stream error");
        let active = lock(&self.inner.table).active?;
        self.spawn_refresh(active);
        Some(active)
    }

    /// The host detached the player surface.
    ///
    /// Saves the resume position, releases the handle the host reclaimed and
    /// refreshes the control that opened the player.
    pub fn on_player_detached(&self) -> Option<ControlId> {
        let outgoing = lock(&self.inner.registry).unbind();
        if let Some(handle) = outgoing.as_ref().and_then(|b| b.handle()) {
            self.inner.handles.revoke(handle);
        }
        self.release_deferred();
        let active = lock(&self.inner.table).active?;
        self.spawn_refresh(active);
        Some(active)
    }

    /// Unbind the player and reclaim every handle.
    pub fn shutdown(&self) {
        lock(&self.inner.registry).unbind();
        {
            let mut table = lock(&self.inner.table);
            table.active = None;
            table.deferred.clear();
        }
        let released = self.inner.handles.reclaim_all();
        tracing::info!(released, "handles reclaimed");
    }

    fn activate(
        &self,
        source: String,
        origin: Locator,
        handle: Option<HandleId>,
    ) -> Result<(), MediaError> {
        let start_seconds = lock(&self.inner.registry).start_time(&origin);
        let view = *lock(&self.inner.view);
        let request = PlayerRequest {
            source,
            origin: origin.clone(),
            start_seconds,
            view,
        };

        let binding = self.inner.host.open_player(request)?.with_origin(origin.clone());
        let binding = match handle {
            Some(id) => binding.with_handle(id),
            None => binding,
        };
        let previous = lock(&self.inner.registry).bind(binding);
        if let Some(old) = previous.and_then(|b| b.handle()) {
            self.release_orphan(old);
        }
        self.release_deferred();
        tracing::info!(origin = %origin, start_seconds, "player activated");
        Ok(())
    }

    fn mark_waiting(&self, id: ControlId) -> bool {
        match lock(&self.inner.table).controls.get_mut(&id) {
            Some(control) => {
                control.set_waiting(true);
                true
            }
            None => false,
        }
    }

    fn bound_handle(&self) -> Option<HandleId> {
        lock(&self.inner.registry).current().and_then(|b| b.handle())
    }

    fn release(&self, table: &mut ControlTable, id: HandleId) {
        if self.bound_handle() == Some(id) {
            table.deferred.push(id);
        } else {
            self.inner.handles.revoke(id);
        }
    }

    /// Revoke a handle that was opened without a control once its player is gone.
    fn release_orphan(&self, id: HandleId) {
        let owned = lock(&self.inner.table)
            .controls
            .values()
            .any(|c| c.action().is_some_and(|a| a.handle.id() == id));
        if !owned {
            self.inner.handles.revoke(id);
        }
    }

    fn release_deferred(&self) {
        let mut table = lock(&self.inner.table);
        let bound = self.bound_handle();
        let handles = &self.inner.handles;
        table.deferred.retain(|id| {
            if Some(*id) == bound {
                true
            } else {
                handles.revoke(*id);
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::WAITING_LABEL;
    use crate::registry::PlayerRegistry;
    use crate::testing::{FakeHost, GatedFetcher, StaticFetcher, settle};
    use timestamp_types::StartTimeMap;

    fn locator() -> Locator {
        Locator::from_canonical("http://localhost:8080/clip.mp4")
    }

    fn manager_with(
        fetcher: Arc<dyn ResourceFetcher>,
        start_times: StartTimeMap,
    ) -> (HandleManager, Arc<FakeHost>) {
        let host = Arc::new(FakeHost::new());
        let manager = HandleManager::new(
            fetcher,
            host.clone(),
            PlayerRegistry::new(start_times).shared(),
            HandleStore::new(),
        );
        (manager, host)
    }

    fn manager() -> (HandleManager, Arc<FakeHost>) {
        manager_with(Arc::new(StaticFetcher::new()), StartTimeMap::new())
    }

    async fn ready_control(manager: &HandleManager) -> ControlId {
        let id = manager.create_control("Clip", locator());
        manager.refresh_control(id, &locator()).await.unwrap();
        id
    }

    #[tokio::test]
    async fn refresh_binds_handle_and_restores_label() {
        let (manager, _host) = manager();
        let id = manager.create_control("Clip", locator());
        assert_eq!(manager.control(id).unwrap().label(), WAITING_LABEL);

        let handle = manager.refresh_control(id, &locator()).await.unwrap().unwrap();

        let control = manager.control(id).unwrap();
        assert_eq!(control.label(), "Clip");
        assert_eq!(control.action().map(|a| a.handle.id()), Some(handle));
        assert!(manager.handles().is_live(handle));
    }

    #[tokio::test]
    async fn attach_control_loads_in_background() {
        let (manager, _host) = manager();
        let id = manager.attach_control("Clip", locator());
        settle().await;
        let control = manager.control(id).unwrap();
        assert!(!control.is_waiting());
        assert!(control.action().is_some());
    }

    #[tokio::test]
    async fn fetch_failure_leaves_control_waiting() {
        let (manager, _host) =
            manager_with(Arc::new(StaticFetcher::failing()), StartTimeMap::new());
        let id = manager.create_control("Clip", locator());

        let err = manager.refresh_control(id, &locator()).await.unwrap_err();

        assert!(matches!(err, MediaError::FetchFailed { .. }));
        let control = manager.control(id).unwrap();
        assert_eq!(control.label(), WAITING_LABEL);
        assert!(control.action().is_none());
    }

    #[tokio::test]
    async fn overlapping_refreshes_keep_last_resolved_handle() {
        let fetcher = Arc::new(GatedFetcher::default());
        let (manager, _host) = manager_with(fetcher.clone(), StartTimeMap::new());
        let id = manager.create_control("Clip", locator());

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.refresh_control(id, &locator()).await }
        });
        fetcher.wait_for_pending(1).await;
        let second = tokio::spawn({
            let manager = manager.clone();
            async move { manager.refresh_control(id, &locator()).await }
        });
        fetcher.wait_for_pending(2).await;

        fetcher.release(1, b"second".to_vec());
        let second_handle = second.await.unwrap().unwrap().unwrap();
        fetcher.release(0, b"first".to_vec());
        let first_handle = first.await.unwrap().unwrap().unwrap();

        let control = manager.control(id).unwrap();
        assert_eq!(control.action().map(|a| a.handle.id()), Some(first_handle));
        assert!(!control.is_waiting());
        assert!(manager.handles().is_live(first_handle));
        assert!(!manager.handles().is_live(second_handle));
        assert_eq!(manager.handles().live_count(), 1);
    }

    #[tokio::test]
    async fn click_opens_player_with_resume_position() {
        let mut start_times = StartTimeMap::new();
        start_times.set(locator().as_str(), 75);
        let (manager, host) = manager_with(Arc::new(StaticFetcher::new()), start_times);
        manager.set_view_kind(ViewKind::Tab);
        host.focus("leaf-1");
        let id = ready_control(&manager).await;

        assert!(manager.click(id).unwrap());

        let requests = host.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].start_seconds, 75);
        assert_eq!(requests[0].view, ViewKind::Tab);
        assert!(requests[0].source.starts_with("blob:timestamp-notes/"));
        assert_eq!(
            manager.control(id).unwrap().surface(),
            Some(&SurfaceId("leaf-1".to_string()))
        );
        let registry = lock(manager.registry());
        assert_eq!(registry.current().and_then(|b| b.origin()), Some(&locator()));
    }

    #[tokio::test]
    async fn second_click_on_bound_handle_does_not_reopen() {
        let (manager, host) = manager();
        host.focus("leaf-1");
        let id = ready_control(&manager).await;

        manager.click(id).unwrap();
        manager.click(id).unwrap();

        assert_eq!(host.requests().len(), 1);
    }

    #[tokio::test]
    async fn click_without_focused_surface_does_nothing() {
        let (manager, host) = manager();
        let id = ready_control(&manager).await;

        assert!(!manager.click(id).unwrap());
        assert!(host.requests().is_empty());
        assert!(!lock(manager.registry()).is_bound());
    }

    #[tokio::test]
    async fn click_on_reclaimed_handle_refreshes_instead() {
        let (manager, host) = manager();
        host.focus("leaf-1");
        let id = ready_control(&manager).await;
        let old = manager.control(id).unwrap().action().unwrap().handle.id();
        manager.handles().reclaim_all();

        assert!(!manager.click(id).unwrap());
        settle().await;

        let fresh = manager.control(id).unwrap().action().unwrap().handle.id();
        assert_ne!(old, fresh);
        assert!(manager.handles().is_live(fresh));
        assert!(host.requests().is_empty());
    }

    #[tokio::test]
    async fn focus_refreshes_only_controls_clicked_from_that_surface() {
        let (manager, host) = manager();
        host.focus("leaf-1");
        let clicked = ready_control(&manager).await;
        let untouched = ready_control(&manager).await;
        manager.click(clicked).unwrap();
        let before = manager.control(untouched).unwrap().action().unwrap().handle.id();

        let refreshed = manager.on_surface_focused(&SurfaceId("leaf-1".to_string()));
        assert_eq!(refreshed, vec![clicked]);
        assert_eq!(manager.control(clicked).unwrap().label(), WAITING_LABEL);
        settle().await;

        assert_eq!(manager.control(clicked).unwrap().label(), "Clip");
        let after = manager.control(untouched).unwrap().action().unwrap().handle.id();
        assert_eq!(before, after);
        assert!(manager.on_surface_focused(&SurfaceId("other".to_string())).is_empty());
    }

    #[tokio::test]
    async fn focus_refreshes_only_the_control_driving_the_player() {
        let fetcher = Arc::new(StaticFetcher::new());
        let (manager, host) = manager_with(fetcher.clone(), StartTimeMap::new());
        host.focus("leaf-1");
        let first = ready_control(&manager).await;
        let second = ready_control(&manager).await;
        manager.click(first).unwrap();
        manager.click(second).unwrap();
        let first_handle = manager.control(first).unwrap().action().unwrap().handle.id();
        let fetches = fetcher.calls();

        let refreshed = manager.on_surface_focused(&SurfaceId("leaf-1".to_string()));
        settle().await;

        assert_eq!(refreshed, vec![second]);
        assert_eq!(fetcher.calls(), fetches + 1);
        assert_eq!(
            manager.control(first).unwrap().action().unwrap().handle.id(),
            first_handle
        );
    }

    #[tokio::test]
    async fn handle_in_use_is_released_after_player_moves_on() {
        let (manager, host) = manager();
        host.focus("leaf-1");
        let id = ready_control(&manager).await;
        manager.click(id).unwrap();
        let playing = manager.control(id).unwrap().action().unwrap().handle.id();

        manager.refresh_control(id, &locator()).await.unwrap();
        assert!(manager.handles().is_live(playing));

        manager.click(id).unwrap();
        assert_eq!(host.requests().len(), 2);
        assert!(!manager.handles().is_live(playing));
    }

    #[tokio::test]
    async fn player_error_refreshes_active_control() {
        let (manager, host) = manager();
        host.focus("leaf-1");
        let id = ready_control(&manager).await;
        assert_eq!(manager.on_player_error("decode failed"), None);

        manager.click(id).unwrap();
        assert_eq!(manager.on_player_error("decode failed"), Some(id));
        assert!(manager.control(id).unwrap().is_waiting());
        settle().await;
        assert!(!manager.control(id).unwrap().is_waiting());
    }

    #[tokio::test]
    async fn detach_saves_position_and_revokes_handle() {
        let (manager, host) = manager();
        host.focus("leaf-1");
        let id = ready_control(&manager).await;
        manager.click(id).unwrap();
        let playing = manager.control(id).unwrap().action().unwrap().handle.id();
        host.last_player().unwrap().set_time(42.4);

        assert_eq!(manager.on_player_detached(), Some(id));

        assert!(!manager.handles().is_live(playing));
        let registry = lock(manager.registry());
        assert!(!registry.is_bound());
        assert_eq!(registry.start_time(&locator()), 42);
    }

    #[tokio::test]
    async fn activate_remote_checks_playability() {
        let (manager, host) = manager();
        let bad = Locator::from_canonical("https://example.com/invalid");
        assert!(matches!(
            manager.activate_remote(&bad),
            Err(MediaError::InvalidUrl { .. })
        ));

        let good = Locator::from_canonical("https://example.com/v.mp4");
        manager.activate_remote(&good).unwrap();
        assert_eq!(host.requests()[0].source, good.as_str());
        assert!(lock(manager.registry()).current().unwrap().handle().is_none());
    }

    #[tokio::test]
    async fn remove_control_releases_its_handle() {
        let (manager, _host) = manager();
        let id = ready_control(&manager).await;
        let handle = manager.control(id).unwrap().action().unwrap().handle.id();

        assert!(manager.remove_control(id));
        assert!(!manager.handles().is_live(handle));
        assert!(!manager.remove_control(id));
    }

    #[tokio::test]
    async fn shutdown_unbinds_and_reclaims() {
        let (manager, host) = manager();
        host.focus("leaf-1");
        let id = ready_control(&manager).await;
        manager.click(id).unwrap();

        manager.shutdown();

        assert!(!lock(manager.registry()).is_bound());
        assert_eq!(manager.handles().live_count(), 0);
    }
}
