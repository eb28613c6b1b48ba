//! Path/URI resolution.
//!
//! Converts clipboard text or file paths into canonical locators:
//! - strings that already carry a scheme (or have no separators) pass through
//! - `\\server\share` network paths become `file:///%5C%5Cserver/share`
//! - drive-letter and rooted paths become `file://` URIs
//! - local videos can also be addressed through the localhost HTTP bridge

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use timestamp_types::Settings;

use crate::error::MediaError;

const PASSTHROUGH_SCHEMES: [&str; 4] = ["file:", "http:", "https:", "blob:"];

/// Canonical, immutable identifier of a media resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Wrap a string that is already canonical (for example one read back from a note).
    pub fn from_canonical(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// `true` for `http`/`https` locators.
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolver bound to the vault and HTTP-bridge locations.
#[derive(Clone, Debug)]
pub struct Resolver {
    vault_root: String,
    server_root: String,
    server_port: u16,
}

impl Resolver {
    pub fn new(
        vault_root: impl Into<String>,
        server_root: impl Into<String>,
        server_port: u16,
    ) -> Self {
        Self {
            vault_root: vault_root.into(),
            server_root: server_root.into(),
            server_port,
        }
    }

    /// Build a resolver from the bridge fields of `settings`.
    pub fn from_settings(vault_root: impl Into<String>, settings: &Settings) -> Self {
        Self::new(vault_root, settings.server_root.clone(), settings.server_port)
    }

    /// Resolve raw text into a locator without going through the HTTP bridge.
    pub fn resolve(&self, raw: &str) -> Result<Locator, MediaError> {
        path_to_uri(raw)
    }

    /// Resolve a local video into a `http://localhost:<port>/..` bridge locator.
    ///
    /// Relative paths are taken relative to the vault root. The file URI of the
    /// server root is stripped as a prefix; when the file is outside the server
    /// root nothing is stripped and the resulting locator will fail to fetch
    /// (`UnresolvedPath` at the fetch boundary).
    pub fn resolve_for_bridge(&self, raw: &str) -> Result<Locator, MediaError> {
        let cleaned = clean(raw);
        if cleaned.is_empty() {
            return Err(invalid(raw));
        }

        let server_root = join_path(&self.vault_root, &self.server_root);
        let server_root = server_root.trim_end_matches(['/', '\\']);
        let server_root_uri = path_to_uri(server_root)?;

        let file_uri = if is_absolute_path(cleaned) {
            path_to_uri(cleaned)?
        } else {
            path_to_uri(&join_path(&self.vault_root, cleaned))?
        };

        let relative = match file_uri.as_str().strip_prefix(server_root_uri.as_str()) {
            Some(rest) => rest,
            None => {
                tracing::warn!(
                    file = %file_uri,
                    server_root = %server_root_uri,
                    "file is outside the bridge server root"
                );
                file_uri.as_str()
            }
        };

        Ok(Locator(format!(
            "http://localhost:{}{}",
            self.server_port, relative
        )))
    }
}

/// Convert raw clipboard text or a filesystem path into a locator.
pub fn path_to_uri(raw: &str) -> Result<Locator, MediaError> {
    let text = clean(raw);
    if text.is_empty() {
        return Err(invalid(raw));
    }

    if has_scheme(text) || !has_separator(text) {
        return Ok(Locator(text.to_string()));
    }

    if text.starts_with("\\\\") {
        let ends_with_slash = text.ends_with('\\') || text.ends_with('/');
        let url = Url::parse(&format!("file:{text}")).map_err(|_| invalid(raw))?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid(raw));
        }
        let mut link = url.as_str().replacen("file://", "file:///%5C%5C", 1);
        if link.ends_with('/') && !ends_with_slash {
            link.pop();
        }
        return Ok(Locator(link));
    }

    let url = Url::parse(&format!("file://{text}")).map_err(|_| invalid(raw))?;
    Ok(Locator(url.as_str().to_string()))
}

/// File name shown on a local video button (text after the last separator).
pub fn display_name(raw: &str) -> &str {
    let text = clean(raw);
    let sep = if text.contains('\\') { '\\' } else { '/' };
    match text.rfind(sep) {
        Some(idx) => &text[idx + 1..],
        None => text,
    }
}

/// Trim whitespace and one pair of surrounding double quotes.
fn clean(raw: &str) -> &str {
    let text = raw.trim();
    match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => inner,
        None => text,
    }
}

fn has_scheme(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    PASSTHROUGH_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

fn has_separator(text: &str) -> bool {
    text.contains('/') || text.contains('\\')
}

fn is_absolute_path(text: &str) -> bool {
    let bytes = text.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'/' | b'\\');
    drive || text.starts_with('/') || text.starts_with('\\')
}

fn join_path(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches(['/', '\\']);
    if base.is_empty() {
        return rel.to_string();
    }
    if rel.is_empty() {
        return base.to_string();
    }
    let sep = if base.contains('\\') && !base.contains('/') {
        '\\'
    } else {
        '/'
    };
    format!("{}{}{}", base.trim_end_matches(['/', '\\']), sep, rel)
}

fn invalid(raw: &str) -> MediaError {
    MediaError::InvalidPath {
        raw: raw.to_string(),
    }
}
