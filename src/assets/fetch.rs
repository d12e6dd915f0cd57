use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::foundation::error::{AdError, AdResult};

/// Resolves an image reference (path, key, ...) to encoded bytes.
///
/// Implementations must be usable from the blocking composition pool of several segments at once.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, reference: &str) -> AdResult<Arc<[u8]>>;
}

/// Reads references as file paths, relative ones resolved against `root`.
#[derive(Clone, Debug, Default)]
pub struct FsFetcher {
    root: Option<PathBuf>,
}

impl FsFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        let p = Path::new(reference);
        match &self.root {
            Some(root) if p.is_relative() => root.join(p),
            _ => p.to_path_buf(),
        }
    }
}

impl AssetFetcher for FsFetcher {
    fn fetch(&self, reference: &str) -> AdResult<Arc<[u8]>> {
        if reference.trim().is_empty() {
            return Err(AdError::asset("empty asset reference"));
        }
        let path = self.resolve(reference);
        let bytes = std::fs::read(&path).map_err(|e| {
            AdError::asset(format!("read '{}': {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "fetched asset");
        Ok(bytes.into())
    }
}

/// In-memory fetcher keyed by reference string.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, reference: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(reference, bytes);
        self
    }

    pub fn insert(&self, reference: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        if let Ok(mut map) = self.entries.write() {
            map.insert(reference.into(), bytes.into());
        }
    }

    pub fn remove(&self, reference: &str) {
        if let Ok(mut map) = self.entries.write() {
            map.remove(reference);
        }
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&self, reference: &str) -> AdResult<Arc<[u8]>> {
        let map = self
            .entries
            .read()
            .map_err(|_| AdError::asset("asset map lock poisoned"))?;
        map.get(reference)
            .cloned()
            .ok_or_else(|| AdError::asset(format!("no asset registered for '{reference}'")))
    }
}

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Fetches `http://` and `https://` references with a GET request.
///
/// `fetch` blocks on the surrounding tokio runtime, so call it from the blocking pool (where
/// composition runs) or from outside any runtime, never from an async worker.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("adcraft/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    async fn get(&self, url: &str) -> AdResult<Arc<[u8]>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AdError::asset(format!("GET {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AdError::asset(format!("GET {url}: HTTP {status}")));
        }
        if resp
            .content_length()
            .is_some_and(|n| n > self.max_body_bytes as u64)
        {
            return Err(AdError::asset(format!(
                "GET {url}: body exceeds {} bytes",
                self.max_body_bytes
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AdError::asset(format!("GET {url}: read body: {e}")))?;
        if bytes.len() > self.max_body_bytes {
            return Err(AdError::asset(format!(
                "GET {url}: body exceeds {} bytes",
                self.max_body_bytes
            )));
        }
        tracing::debug!(url, bytes = bytes.len(), "fetched asset");
        Ok(Arc::from(bytes.as_ref()))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, reference: &str) -> AdResult<Arc<[u8]>> {
        let url = reference.trim();
        if !is_url(url) {
            return Err(AdError::asset(format!("not an http(s) url: '{reference}'")));
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.get(url)),
            Err(_) => {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| AdError::asset(format!("http runtime: {e}")))?;
                rt.block_on(self.get(url))
            }
        }
    }
}

/// Sends `http://` and `https://` references to an [`HttpFetcher`] and everything else to a
/// local fetcher.
pub struct RoutingFetcher {
    http: HttpFetcher,
    local: Arc<dyn AssetFetcher>,
}

impl RoutingFetcher {
    pub fn new(local: Arc<dyn AssetFetcher>) -> Self {
        Self::with_http(HttpFetcher::new(), local)
    }

    pub fn with_http(http: HttpFetcher, local: Arc<dyn AssetFetcher>) -> Self {
        Self { http, local }
    }
}

impl AssetFetcher for RoutingFetcher {
    fn fetch(&self, reference: &str) -> AdResult<Arc<[u8]>> {
        if is_url(reference) {
            self.http.fetch(reference)
        } else {
            self.local.fetch(reference)
        }
    }
}

/// True for references with an `http` or `https` scheme (case-insensitive).
pub fn is_url(reference: &str) -> bool {
    let r = reference.trim_start();
    ["http://", "https://"].iter().any(|scheme| {
        r.get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fetch.rs"]
mod tests;
