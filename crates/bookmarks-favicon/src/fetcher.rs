use std::time::Duration;

use async_trait::async_trait;
use bookmarks_shared::constants::DEFAULT_FAVICON_FILE;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use tracing::{debug, warn};
use url::Url;

use crate::discover::{discover_icon_href, page_base, resolve_icon_url};
use crate::error::{FetchError, Result};

/// A downloaded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub file_name: String,
    pub mime_type: String,
    pub payload: Vec<u8>,
}

/// What a fetched resource has to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Any,
    /// The response must carry an `image/*` content type.
    Image,
}

/// Where favicons come from.
#[async_trait]
pub trait IconSource: Send + Sync {
    /// Discover and download the favicon of the page at `page_url`.
    async fn favicon_for_page(&self, page_url: &str) -> Result<Content>;

    /// Download an icon from an explicitly given URL.
    async fn favicon_from_url(&self, icon_url: &str) -> Result<Content>;
}

/// [`IconSource`] backed by HTTP.
#[derive(Debug, Clone)]
pub struct FaviconFetcher {
    client: reqwest::Client,
}

impl FaviconFetcher {
    /// Every request made by this fetcher gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bookmarks-favicon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Look for the icon link in the page's HTML, fall back to
    /// `/favicon.ico` at the origin.
    pub async fn fetch_favicon(&self, page_url: &str) -> Result<Content> {
        let page = page_base(page_url)?;
        let default_url = resolve_icon_url(&page, &format!("/{DEFAULT_FAVICON_FILE}"))?;

        let icon_url = match self.fetch(page.as_str(), FetchKind::Any).await {
            Ok(html) => {
                let html = String::from_utf8_lossy(&html.payload);
                match discover_icon_href(&html) {
                    Some(href) => resolve_icon_url(&page, &href)?,
                    None => {
                        debug!(url = %page, "no icon link in page");
                        default_url.clone()
                    }
                }
            }
            Err(e) => {
                debug!(url = %page, error = %e, "could not load page, trying default icon");
                default_url.clone()
            }
        };

        if icon_url == default_url {
            return self.fetch_url(default_url.as_str(), FetchKind::Image).await;
        }

        match self.fetch_url(icon_url.as_str(), FetchKind::Image).await {
            Ok(content) => Ok(content),
            Err(e) => {
                warn!(url = %icon_url, error = %e, "linked icon failed, trying default icon");
                self.fetch_url(default_url.as_str(), FetchKind::Image).await
            }
        }
    }

    /// Fetch `url` directly; the payload must not be empty.
    pub async fn fetch_url(&self, url: &str, kind: FetchKind) -> Result<Content> {
        let content = self.fetch(url, kind).await?;
        if content.payload.is_empty() {
            return Err(FetchError::EmptyPayload(url.to_string()));
        }
        debug!(url = %url, size = content.payload.len(), name = %content.file_name, "fetched");
        Ok(content)
    }

    async fn fetch(&self, url: &str, kind: FetchKind) -> Result<Content> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let response = self.client.get(parsed.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .unwrap_or_default();
        if kind == FetchKind::Image && !mime_type.starts_with("image/") {
            return Err(FetchError::NotAnImage {
                url: url.to_string(),
                mime_type,
            });
        }

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);
        let file_name = file_name_for(&parsed, disposition);

        let payload = response.bytes().await?.to_vec();
        Ok(Content {
            file_name,
            mime_type,
            payload,
        })
    }
}

#[async_trait]
impl IconSource for FaviconFetcher {
    async fn favicon_for_page(&self, page_url: &str) -> Result<Content> {
        self.fetch_favicon(page_url).await
    }

    async fn favicon_from_url(&self, icon_url: &str) -> Result<Content> {
        self.fetch_url(icon_url, FetchKind::Image).await
    }
}

/// Last path segment if it looks like a file name, else the
/// Content-Disposition name, else `favicon.ico`.
fn file_name_for(url: &Url, disposition: Option<String>) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| s.contains('.'))
        .map(str::to_string);

    segment
        .or(disposition)
        .unwrap_or_else(|| DEFAULT_FAVICON_FILE.to_string())
}

fn disposition_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty() && !name.contains('/'))
}
