use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};
use url::Url;

use platewise_common::error::Result;
use platewise_common::PlatewiseError;

use crate::traits::LinkResolver;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BODY_BYTES: usize = 750_000;
const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";
const UNKNOWN_RESTAURANT: &str = "Unknown Restaurant";

/// Query parameters that may carry the real destination, in lookup order.
const DESTINATION_PARAMS: &[&str] = &["link", "continue", "url", "q", "query"];

static MAPS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:www\.|maps\.)?google\.(?:com?\.)?[a-z]{2,3}/maps/(?:place|search)/[^\s"'<>\\]+"#)
        .expect("valid maps url regex")
});

static RELATIVE_PLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/maps/place/[^\s"'<>\\]+"#).expect("valid relative place regex")
});

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>([^<]+)</title>").expect("valid title regex"));

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>(.*?)</script>").expect("valid script regex")
});

static META_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<(?:meta|link)\s[^>]*?(?:property\s*=\s*["']og:url["']|itemprop\s*=\s*["']url["']|rel\s*=\s*["']canonical["'])[^>]*?(?:content|href)\s*=\s*["']([^"']+)["']"#,
    )
    .expect("valid meta url regex")
});

static META_URL_REV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<(?:meta|link)\s[^>]*?(?:content|href)\s*=\s*["']([^"']+)["'][^>]*?(?:property\s*=\s*["']og:url["']|itemprop\s*=\s*["']url["']|rel\s*=\s*["']canonical["'])"#,
    )
    .expect("valid reversed meta url regex")
});

// --- URL classification ---

/// Shortened share links that need a network round trip to expand.
pub fn is_short_link(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let path = parsed.path();
    match host.as_str() {
        "maps.app.goo.gl" | "goo.gle" => true,
        "goo.gl" => path.starts_with("/maps"),
        "g.co" => path.starts_with("/kgs"),
        _ => false,
    }
}

/// A Google Maps place or search URL the review source can crawl directly.
pub fn is_canonical_maps_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let path = parsed.path();
    is_google_host(&host) && (path.starts_with("/maps/place/") || path.starts_with("/maps/search/"))
}

/// `google.com`, `google.<cc>`, `google.co.<cc>` or `google.com.<cc>`,
/// optionally under `www.` or `maps.`. Nothing may follow the country code.
fn is_google_host(host: &str) -> bool {
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("maps."))
        .unwrap_or(host);
    let Some(suffix) = host.strip_prefix("google.") else {
        return false;
    };
    let country = |label: &str| label.len() == 2 && label.bytes().all(|b| b.is_ascii_lowercase());
    match suffix.split('.').collect::<Vec<_>>().as_slice() {
        [tld] => *tld == "com" || country(tld),
        [second, cc] => matches!(*second, "co" | "com") && country(cc),
        _ => false,
    }
}

/// Google Maps search URL for a free-text query.
pub fn maps_search_url(query: &str) -> String {
    match Url::parse_with_params(MAPS_SEARCH_URL, &[("api", "1"), ("query", query.trim())]) {
        Ok(u) => u.to_string(),
        Err(_) => MAPS_SEARCH_URL.to_string(),
    }
}

/// Best-effort restaurant name from the `/place/<name>/` path segment.
pub fn restaurant_name_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return UNKNOWN_RESTAURANT.to_string();
    };
    let segments: Vec<&str> = parsed.path().split('/').collect();
    let name = segments
        .iter()
        .position(|s| *s == "place")
        .and_then(|i| segments.get(i + 1))
        .map(|raw| decode_component(raw.split('@').next().unwrap_or_default()))
        .map(|n| n.trim().to_string())
        .unwrap_or_default();

    if name.is_empty() {
        UNKNOWN_RESTAURANT.to_string()
    } else {
        name
    }
}

/// Percent-decode a path or query component, treating `+` as a space.
fn decode_component(raw: &str) -> String {
    url::form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

// --- Landing page scanning ---

/// Find a canonical place/search URL given where a short link landed and the
/// landing page HTML. Sources are tried in fixed order; the first hit wins:
/// redirect target, query parameters, page title, embedded links in markup,
/// meta tags, then script contents.
pub fn extract_canonical(final_url: &str, html: &str) -> Option<String> {
    if is_canonical_maps_url(final_url) {
        return Some(final_url.to_string());
    }

    from_query_params(final_url)
        .or_else(|| from_title(html))
        .or_else(|| from_markup(html))
        .or_else(|| from_meta_tags(html))
        .or_else(|| from_scripts(html))
}

fn from_query_params(final_url: &str) -> Option<String> {
    let parsed = Url::parse(final_url).ok()?;
    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

    for key in DESTINATION_PARAMS {
        let Some((_, value)) = pairs.iter().find(|(k, _)| k == key) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if is_canonical_maps_url(value) {
            return Some(value.to_string());
        }
        if matches!(*key, "q" | "query") && Url::parse(value).is_err() {
            return Some(maps_search_url(value));
        }
    }
    None
}

fn from_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = unescape_html(raw.trim());
    let name = title.trim_end_matches("- Google Maps").trim();
    if name.is_empty() || name.eq_ignore_ascii_case("google maps") {
        return None;
    }
    Some(maps_search_url(name))
}

fn from_markup(html: &str) -> Option<String> {
    let without_scripts = SCRIPT_RE.replace_all(html, "");
    let body = match without_scripts.find("<body") {
        Some(start) => &without_scripts[start..],
        None => &without_scripts[..],
    };
    first_maps_url(body)
}

fn from_meta_tags(html: &str) -> Option<String> {
    META_URL_RE
        .captures_iter(html)
        .chain(META_URL_REV_RE.captures_iter(html))
        .filter_map(|cap| cap.get(1).map(|m| unescape_html(m.as_str())))
        .find(|candidate| is_canonical_maps_url(candidate))
}

fn from_scripts(html: &str) -> Option<String> {
    for cap in SCRIPT_RE.captures_iter(html) {
        let Some(body) = cap.get(1) else { continue };
        let script = unescape_js(body.as_str());
        if let Some(found) = first_maps_url(&script) {
            return Some(found);
        }
        if let Some(path) = RELATIVE_PLACE_RE.find(&script) {
            return Some(format!("https://www.google.com{}", path.as_str()));
        }
    }
    None
}

fn first_maps_url(text: &str) -> Option<String> {
    MAPS_URL_RE
        .find_iter(text)
        .map(|m| unescape_html(m.as_str()))
        .find(|candidate| is_canonical_maps_url(candidate))
}

fn unescape_html(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
}

fn unescape_js(s: &str) -> String {
    s.replace("\\/", "/")
        .replace("\\u0026", "&")
        .replace("\\u003d", "=")
        .replace("\\u003D", "=")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
}

// --- HTTP resolver ---

/// Read at most `limit` bytes of a response body, dropping the rest unread.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> reqwest::Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Follows short links over HTTP. Canonical links are returned untouched
/// without a request.
pub struct HttpLinkResolver {
    client: reqwest::Client,
}

impl HttpLinkResolver {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent("Mozilla/5.0 (compatible; PlatewiseBot/1.0; +link resolver)")
            .build()
            .map_err(|e| PlatewiseError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Follow `url` and return where it landed plus the head of the page.
    async fn fetch_landing(&self, url: &str) -> Result<(String, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PlatewiseError::Resolution(format!("failed to follow {url}: {e}")))?;

        let final_url = response.url().to_string();
        debug!(url, final_url = %final_url, status = %response.status(), "Short link followed");

        let body = read_capped(response, MAX_BODY_BYTES)
            .await
            .map_err(|e| PlatewiseError::Resolution(format!("failed to read {final_url}: {e}")))?;
        let html = String::from_utf8_lossy(&body).into_owned();
        Ok((final_url, html))
    }
}

#[async_trait]
impl LinkResolver for HttpLinkResolver {
    async fn resolve(&self, url: &str) -> Result<String> {
        let url = url.trim();
        if !is_short_link(url) {
            return Ok(url.to_string());
        }

        let (final_url, html) = self.fetch_landing(url).await?;

        match extract_canonical(&final_url, &html) {
            Some(canonical) => {
                info!(url, canonical = %canonical, "Short link resolved");
                Ok(canonical)
            }
            None => Err(PlatewiseError::Resolution(format!(
                "no place or search URL found behind {url}"
            ))),
        }
    }
}
