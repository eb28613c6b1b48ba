//! Error taxonomy for the synchronization core.
//!
//! Every async path converts its failures into one of these kinds at its own
//! boundary; nothing here is fatal to the host.

/// Errors surfaced by the resolver, handle lifecycle, registry and codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// Malformed or unparsable path/URI input.
    #[error("invalid path: {raw:?}")]
    InvalidPath { raw: String },

    /// The playback engine rejected the candidate locator.
    #[error("invalid video url: {locator}")]
    InvalidUrl { locator: String },

    /// A bridge locator could not be fetched (path likely outside the server root).
    #[error("unresolved path: {locator}")]
    UnresolvedPath { locator: String },

    /// Network or IO failure while resolving a handle.
    #[error("failed to fetch {locator}: {reason}")]
    FetchFailed { locator: String, reason: String },

    /// Marker text is not `mm:ss` or `hh:mm:ss`.
    #[error("invalid timestamp: {text:?}")]
    InvalidTimestamp { text: String },

    /// A playback command arrived while no player is bound.
    #[error("no active video player")]
    NoActivePlayer,

    /// The host could not open a player surface.
    #[error("player unavailable: {0}")]
    PlayerUnavailable(String),
}

impl MediaError {
    /// Inline annotation shown to the user, for the kinds that have one.
    ///
    /// Fetch and timestamp failures are only logged.
    pub fn callout(&self) -> Option<String> {
        match self {
            MediaError::InvalidPath { .. } => Some(
                "\n> [!error] Invalid Video Path\n> The copied path could not be converted to a video link. Please check the path and try again.\n"
                    .to_string(),
            ),
            MediaError::InvalidUrl { .. } => Some(
                "\n> [!error] Invalid Video URL\n> The highlighted link is not a valid video url. Please try again with a valid link.\n"
                    .to_string(),
            ),
            MediaError::NoActivePlayer => Some(
                "\n> [!caution] Select Video\n> A video needs to be opened before using this hotkey.\n Highlight your video link and input your 'Open video player' hotkey to register a video.\n"
                    .to_string(),
            ),
            MediaError::UnresolvedPath { .. }
            | MediaError::FetchFailed { .. }
            | MediaError::InvalidTimestamp { .. }
            | MediaError::PlayerUnavailable(_) => None,
        }
    }
}
