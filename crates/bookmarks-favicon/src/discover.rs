use scraper::{Html, Selector};
use url::Url;

use crate::error::{FetchError, Result};

/// Find the `href` of the page's icon link.
///
/// Links whose `rel` contains the token `icon` (which covers
/// `rel="shortcut icon"`) are considered, case-insensitively. A
/// `shortcut icon` link wins over a plain `icon` link.
pub fn discover_icon_href(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("link[rel][href]").ok()?;

    let mut plain = None;
    for link in document.select(&selector) {
        let (Some(rel), Some(href)) = (link.value().attr("rel"), link.value().attr("href")) else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }

        let rel = rel.to_ascii_lowercase();
        let tokens: Vec<&str> = rel.split_ascii_whitespace().collect();
        if !tokens.contains(&"icon") {
            continue;
        }
        if tokens.contains(&"shortcut") {
            return Some(href.to_string());
        }
        if plain.is_none() {
            plain = Some(href.to_string());
        }
    }
    plain
}

/// Parse a page URL and drop a trailing `index.html` / `index.htm`.
pub fn page_base(page_url: &str) -> Result<Url> {
    let mut url = Url::parse(page_url).map_err(|source| FetchError::InvalidUrl {
        url: page_url.to_string(),
        source,
    })?;

    let trimmed = url
        .path()
        .strip_suffix("index.html")
        .or_else(|| url.path().strip_suffix("index.htm"))
        .filter(|rest| rest.ends_with('/'))
        .map(str::to_string);
    if let Some(path) = trimmed {
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve an icon `href` against the page it was found on.
///
/// Absolute URLs are taken as-is, `//host/...` inherits the page's scheme,
/// `/path` is joined to the origin and anything else is joined to the page's
/// directory.
pub fn resolve_icon_url(page: &Url, href: &str) -> Result<Url> {
    page.join(href).map_err(|source| FetchError::InvalidUrl {
        url: href.to_string(),
        source,
    })
}
