//! Short-lived local handles over fetched media bytes.
//!
//! A handle is a `blob:` URL naming bytes held in a [`HandleStore`]. Handles
//! can be revoked individually or reclaimed all at once (the host closing the
//! view that owned them), so nothing may assume a handle is still live.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Client, Url};
use uuid::Uuid;

use crate::error::MediaError;
use crate::locator::Locator;
use crate::registry::lock;

const HANDLE_URL_PREFIX: &str = "blob:timestamp-notes/";

/// Identity of a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A resolved handle derived from exactly one locator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handle {
    id: HandleId,
    origin: Locator,
    len: usize,
}

impl Handle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn origin(&self) -> &Locator {
        &self.origin
    }

    /// `blob:` URL handed to the player.
    pub fn url(&self) -> String {
        format!("{HANDLE_URL_PREFIX}{}", self.id)
    }

    /// Size of the backing bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// In-memory backing store for live handles.
#[derive(Clone, Default)]
pub struct HandleStore {
    live: Arc<Mutex<HashMap<HandleId, Arc<[u8]>>>>,
}

impl HandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under a fresh handle.
    pub fn create(&self, origin: Locator, bytes: Vec<u8>) -> Handle {
        let id = HandleId(Uuid::new_v4());
        let len = bytes.len();
        lock(&self.live).insert(id, Arc::from(bytes));
        Handle { id, origin, len }
    }

    pub fn bytes(&self, id: HandleId) -> Option<Arc<[u8]>> {
        lock(&self.live).get(&id).cloned()
    }

    /// Look up the bytes behind a `blob:` handle URL.
    pub fn bytes_for_url(&self, url: &str) -> Option<Arc<[u8]>> {
        let raw = url.strip_prefix(HANDLE_URL_PREFIX)?;
        let id = HandleId(Uuid::parse_str(raw).ok()?);
        self.bytes(id)
    }

    pub fn is_live(&self, id: HandleId) -> bool {
        lock(&self.live).contains_key(&id)
    }

    /// Release one handle. Returns `false` if it was already gone.
    pub fn revoke(&self, id: HandleId) -> bool {
        let removed = lock(&self.live).remove(&id).is_some();
        if removed {
            tracing::debug!(handle = %id, "handle revoked");
        }
        removed
    }

    /// Release every handle; returns how many were live.
    pub fn reclaim_all(&self) -> usize {
        let mut live = lock(&self.live);
        let count = live.len();
        live.clear();
        count
    }

    pub fn live_count(&self) -> usize {
        lock(&self.live).len()
    }
}

/// Byte-stream source for locators.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, MediaError>;
}

/// Fetches `http(s)` locators with reqwest and `file://` locators from disk.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, MediaError> {
        let url = Url::parse(locator.as_str()).map_err(|e| fetch_failed(locator, e))?;
        match url.scheme() {
            "http" | "https" => {
                let resp = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| fetch_failed(locator, e))?;
                if !resp.status().is_success() {
                    return Err(fetch_failed(
                        locator,
                        format!("http status {}", resp.status()),
                    ));
                }
                let bytes = resp.bytes().await.map_err(|e| fetch_failed(locator, e))?;
                Ok(bytes.to_vec())
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| fetch_failed(locator, "not a local file path"))?;
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| fetch_failed(locator, e))
            }
            other => Err(fetch_failed(locator, format!("unsupported scheme {other}"))),
        }
    }
}

fn fetch_failed(locator: &Locator, reason: impl fmt::Display) -> MediaError {
    MediaError::FetchFailed {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}
