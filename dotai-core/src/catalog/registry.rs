//! Registry transport
//!
//! Fetches the catalog index and asset documents. Locations starting with
//! `http://` or `https://` go over the network; anything else is read from
//! the filesystem. Network indexes are cached on disk together with their
//! fingerprint, but a cached copy is only reused after the registry confirms
//! it is still current, unless the caller asks for offline mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::index::fingerprint;
use super::{CatalogEntry, CatalogIndex};
use crate::error::{AssetError, Result};

/// How to treat the on-disk index cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Reuse the cache only after the registry confirms it is current
    #[default]
    Validate,
    /// Ignore the cache and download a fresh index
    Refresh,
    /// Use the cache without touching the network
    Offline,
}

/// Network or filesystem access to a registry
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Fetch the catalog index. The returned index carries its fingerprint.
    async fn fetch_index(&self, policy: FetchPolicy) -> Result<CatalogIndex>;

    /// Fetch the raw asset document for an index entry
    async fn fetch_asset_content(&self, index: &CatalogIndex, entry: &CatalogEntry)
        -> Result<Vec<u8>>;
}

/// Cached index metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedIndex {
    /// Index location the cache belongs to
    pub location: String,

    /// Content digest of `raw`
    pub fingerprint: String,

    /// Entity tag returned by the registry, used for conditional requests
    #[serde(default)]
    pub etag: Option<String>,

    /// When the index was fetched (RFC 3339)
    pub fetched_at: String,

    /// The index document as downloaded
    pub raw: String,
}

/// A registry location
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Http(String),
    File(PathBuf),
}

impl Location {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Location::Http(raw.to_string())
        } else {
            Location::File(PathBuf::from(raw.strip_prefix("file://").unwrap_or(raw)))
        }
    }

    fn display(&self) -> String {
        match self {
            Location::Http(url) => url.clone(),
            Location::File(path) => path.display().to_string(),
        }
    }

    /// Directory-like parent used as the default asset base
    fn parent(&self) -> Location {
        match self {
            Location::Http(url) => match url.rfind('/') {
                Some(pos) if pos > url.find("://").map(|p| p + 2).unwrap_or(0) => {
                    Location::Http(url[..pos].to_string())
                }
                _ => Location::Http(url.clone()),
            },
            Location::File(path) => Location::File(
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
        }
    }

    /// Join a relative path onto this location
    fn join(&self, relative: &str) -> Location {
        match self {
            Location::Http(url) => Location::Http(format!(
                "{}/{}",
                url.trim_end_matches('/'),
                relative.trim_start_matches('/')
            )),
            Location::File(dir) => Location::File(dir.join(relative)),
        }
    }
}

enum HttpResponse {
    NotModified,
    Body { content: String, etag: Option<String> },
}

/// Registry reached through a single index location
pub struct Registry {
    location: Location,
    cache_dir: Option<PathBuf>,
    client: reqwest::Client,
}

impl Registry {
    /// Create a registry for an index location (URL or filesystem path)
    pub fn new(location: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dotai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssetError::transport(location, e))?;

        Ok(Self {
            location: Location::parse(location),
            cache_dir: None,
            client,
        })
    }

    /// Enable the on-disk index cache
    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    pub fn location(&self) -> String {
        self.location.display()
    }

    /// Where the asset document for `entry` is fetched from
    pub fn asset_location(&self, index: &CatalogIndex, entry: &CatalogEntry) -> String {
        self.resolve_asset(index, entry).display()
    }

    fn resolve_asset(&self, index: &CatalogIndex, entry: &CatalogEntry) -> Location {
        if let Some(url) = &entry.url {
            let explicit = Location::parse(url);
            return match explicit {
                Location::File(ref path) if path.is_relative() => {
                    self.location.parent().join(url)
                }
                other => other,
            };
        }

        let base = match index.base_url().map(Location::parse) {
            Some(Location::File(path)) if path.is_relative() => {
                self.location.parent().join(&path.to_string_lossy())
            }
            Some(base) => base,
            None => self.location.parent(),
        };

        let version = if entry.version.is_empty() {
            "latest"
        } else {
            entry.version.as_str()
        };
        base.join(&format!("{}/{}.yaml", entry.module, version))
    }

    /// Cache file path for an index location
    fn cache_path(cache_dir: &Path, location: &str) -> PathBuf {
        let digest = fingerprint(location.as_bytes());
        let short = digest.trim_start_matches("sha256:");
        cache_dir.join(format!("index_{}.yaml", &short[..16]))
    }

    fn load_cached(&self, location: &str) -> Option<CachedIndex> {
        let cache_dir = self.cache_dir.as_ref()?;
        let path = Self::cache_path(cache_dir, location);
        if !path.exists() {
            return None;
        }

        let cached = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|c| {
                serde_yaml_ng::from_str::<CachedIndex>(&c).map_err(|e| e.to_string())
            });

        match cached {
            Ok(cached) if cached.location == location => {
                tracing::debug!(
                    "Found cached index for {} (fetched {})",
                    location,
                    cached.fetched_at
                );
                Some(cached)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable index cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Save index to cache (best effort)
    fn save_cached(&self, cached: &CachedIndex) {
        let Some(cache_dir) = &self.cache_dir else {
            return;
        };

        let path = Self::cache_path(cache_dir, &cached.location);
        let result = std::fs::create_dir_all(cache_dir)
            .map_err(|e| e.to_string())
            .and_then(|_| serde_yaml_ng::to_string(cached).map_err(|e| e.to_string()))
            .and_then(|content| std::fs::write(&path, content).map_err(|e| e.to_string()));

        match result {
            Ok(()) => tracing::debug!("Saved index to cache: {}", path.display()),
            Err(e) => tracing::warn!("Failed to save index to cache: {}", e),
        }
    }

    async fn http_get(&self, url: &str, etag: Option<&str>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if let Some(etag) = etag {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AssetError::transport(url, e))?;

        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(HttpResponse::NotModified);
        }
        if !response.status().is_success() {
            return Err(AssetError::transport(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content = response
            .text()
            .await
            .map_err(|e| AssetError::transport(url, e))?;

        Ok(HttpResponse::Body { content, etag })
    }

    async fn fetch_http_index(&self, url: &str, policy: FetchPolicy) -> Result<CatalogIndex> {
        let cached = match policy {
            FetchPolicy::Refresh => None,
            FetchPolicy::Validate | FetchPolicy::Offline => self.load_cached(url),
        };

        if policy == FetchPolicy::Offline {
            let cached = cached.ok_or_else(|| {
                AssetError::transport(url, "no cached index available in offline mode")
            })?;
            tracing::debug!("Offline: using cached index {}", cached.fingerprint);
            return parse_index(url, &cached.raw);
        }

        let etag = cached.as_ref().and_then(|c| c.etag.as_deref());
        match self.http_get(url, etag).await? {
            HttpResponse::NotModified => match cached {
                Some(cached) => {
                    tracing::debug!("Index not modified, reusing cache {}", cached.fingerprint);
                    parse_index(url, &cached.raw)
                }
                None => Err(AssetError::transport(
                    url,
                    "registry answered 304 Not Modified without a cached index",
                )),
            },
            HttpResponse::Body { content, etag } => {
                let index = parse_index(url, &content)?;
                if cached.as_ref().map(|c| c.fingerprint.as_str()) == Some(index.fingerprint()) {
                    tracing::debug!("Index unchanged ({})", index.fingerprint());
                } else {
                    tracing::info!("Fetched catalog index {} ({} assets)", url, index.len());
                }
                self.save_cached(&CachedIndex {
                    location: url.to_string(),
                    fingerprint: index.fingerprint().to_string(),
                    etag,
                    fetched_at: chrono::Utc::now().to_rfc3339(),
                    raw: content,
                });
                Ok(index)
            }
        }
    }
}

fn parse_index(location: &str, content: &str) -> Result<CatalogIndex> {
    CatalogIndex::from_yaml(content).map_err(|e| AssetError::transport(location, e))
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| AssetError::transport(path.display().to_string(), e))
}

#[async_trait]
impl RegistryTransport for Registry {
    async fn fetch_index(&self, policy: FetchPolicy) -> Result<CatalogIndex> {
        match &self.location {
            Location::Http(url) => self.fetch_http_index(url, policy).await,
            Location::File(path) => {
                tracing::debug!("Reading catalog index from {}", path.display());
                let bytes = read_file(path).await?;
                let content = String::from_utf8_lossy(&bytes);
                parse_index(&path.display().to_string(), &content)
            }
        }
    }

    async fn fetch_asset_content(
        &self,
        index: &CatalogIndex,
        entry: &CatalogEntry,
    ) -> Result<Vec<u8>> {
        let location = self.resolve_asset(index, entry);
        tracing::debug!(
            "Fetching {} '{}' from {}",
            entry.category,
            entry.name,
            location.display()
        );

        match location {
            Location::File(path) => read_file(&path).await,
            Location::Http(url) => match self.http_get(&url, None).await? {
                HttpResponse::Body { content, .. } => Ok(content.into_bytes()),
                HttpResponse::NotModified => Err(AssetError::transport(
                    url,
                    "unexpected 304 Not Modified for asset download",
                )),
            },
        }
    }
}

/// Remove every cached index. Returns the number of files removed.
pub fn clear_cache(cache_dir: &Path) -> Result<usize> {
    if !cache_dir.exists() {
        return Ok(0);
    }

    let io_err = |source| AssetError::Io {
        path: cache_dir.to_path_buf(),
        source,
    };

    let mut removed = 0;
    for entry in std::fs::read_dir(cache_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_index = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("index_") && n.ends_with(".yaml"))
            .unwrap_or(false);

        if path.is_file() && is_index {
            std::fs::remove_file(&path).map_err(io_err)?;
            removed += 1;
        }
    }

    Ok(removed)
}
