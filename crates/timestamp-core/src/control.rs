//! Document-embedded video controls.

use crate::handle::Handle;
use crate::host::SurfaceId;
use crate::locator::Locator;

/// Label shown while a control's handle is being (re)fetched.
pub const WAITING_LABEL: &str = "Please wait ...";

/// Identity of a control within one lifecycle manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub(crate) u64);

/// What a control does when clicked: open a player on `handle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickAction {
    pub handle: Handle,
}

/// A clickable element bound to one locator at a time.
///
/// Exactly one click action is live; [`Control::rebind`] is the only way to
/// change it and always detaches the previous one.
#[derive(Clone, Debug)]
pub struct Control {
    id: ControlId,
    label: String,
    waiting: bool,
    locator: Locator,
    action: Option<ClickAction>,
    surface: Option<SurfaceId>,
}

impl Control {
    pub(crate) fn new(id: ControlId, label: impl Into<String>, locator: Locator) -> Self {
        Self {
            id,
            label: label.into(),
            waiting: true,
            locator,
            action: None,
            surface: None,
        }
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    /// Text currently shown on the control.
    pub fn label(&self) -> &str {
        if self.waiting {
            WAITING_LABEL
        } else {
            &self.label
        }
    }

    /// Label restored once a fetch succeeds.
    pub fn display_label(&self) -> &str {
        &self.label
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn action(&self) -> Option<&ClickAction> {
        self.action.as_ref()
    }

    /// Surface the control was first clicked from.
    pub fn surface(&self) -> Option<&SurfaceId> {
        self.surface.as_ref()
    }

    /// Install `action`, returning the detached previous one.
    pub fn rebind(&mut self, action: ClickAction) -> Option<ClickAction> {
        self.action.replace(action)
    }

    pub(crate) fn set_waiting(&mut self, waiting: bool) {
        self.waiting = waiting;
    }

    pub(crate) fn set_locator(&mut self, locator: Locator) {
        self.locator = locator;
    }

    pub(crate) fn remember_surface(&mut self, surface: SurfaceId) {
        self.surface = Some(surface);
    }

    pub(crate) fn take_action(&mut self) -> Option<ClickAction> {
        self.action.take()
    }
}
