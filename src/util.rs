use std::sync::{Arc, OnceLock};

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest_cookie_store::CookieStoreMutex;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;

/// HTTP client shared by the locator strategies. Wraps `reqwest::Client`
/// with a middleware that retries transient errors, and a cookie store so
/// consent cookies survive the redirect chains YouTube uses.
pub struct HttpClient {
    pub client: ClientWithMiddleware,
    pub cookies: Arc<CookieStoreMutex>,
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),
}

impl HttpClient {
    /// `cookie_header` carries pre-supplied session cookies, already
    /// collapsed into a single `Cookie` header value.
    pub fn new(cookie_header: Option<String>) -> reqwest::Result<HttpClient> {
        let cookies = Arc::new(CookieStoreMutex::default());
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let mut builder = reqwest::Client::builder().cookie_provider(cookies.clone());
        if let Some(header) = cookie_header {
            if let Ok(mut value) = HeaderValue::from_str(&header) {
                value.set_sensitive(true);
                let mut headers = HeaderMap::new();
                headers.insert(COOKIE, value);
                builder = builder.default_headers(headers);
            }
        }
        let client = builder.build()?;

        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(HttpClient { client, cookies })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
            .map_err(|e| e.into())
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| e.into())
    }
}

static SANITIZE_RE: OnceLock<Regex> = OnceLock::new();

/// Strips characters that are unsafe in file names on common filesystems.
/// The broadcast id suffix in the output template keeps sanitized titles
/// from colliding.
pub fn sanitize_title(title: &str) -> String {
    let re = SANITIZE_RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("static pattern"));
    re.replace_all(title, "").into_owned()
}

/// Collapses a Netscape-format cookie file into a single `Cookie` header
/// value. Comment and malformed lines are skipped; `#HttpOnly_` entries
/// are kept. Returns `None` when the blob contains no usable entries.
pub fn cookie_header_from_netscape(blob: &str) -> Option<String> {
    let mut pairs = Vec::new();
    for line in blob.lines() {
        let trimmed = line.trim();
        let line = trimmed.strip_prefix("#HttpOnly_").unwrap_or(trimmed);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        pairs.push(format!("{}={}", fields[5], fields[6]));
    }
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Extracts the JSON object assigned to `marker` in a page's inline
/// scripts, e.g. `var ytInitialData = {...};`.
pub(crate) fn extract_json_object<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    // Find the start of the assignment
    let idx_marker = html.find(marker)? + marker.len();

    // Find the start and end of the JSON object
    let idx_start = html[idx_marker..].find('{')? + idx_marker;
    let idx_end = html[idx_start..].find("};")? + idx_start + 1;

    // Bounds check
    if idx_start >= idx_end || idx_end >= html.len() {
        return None;
    }

    Some(&html[idx_start..idx_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_extraction() {
        let html = r#"<script>var ytInitialData = {"response": "test"};</script>"#;
        let result = extract_json_object(html, "var ytInitialData =").expect("object");
        assert_eq!(result, r#"{"response": "test"}"#);

        let html = r#"<script>var ytInitialData = {"#;
        assert!(extract_json_object(html, "var ytInitialData =").is_none());

        let html = r#"<script>var ytInitialData = "#;
        assert!(extract_json_object(html, "var ytInitialData =").is_none());

        let html = r#"<script>var ytInitialData ="#;
        assert!(extract_json_object(html, "var ytInitialData =").is_none());
    }

    #[test]
    fn sanitize_strips_unsafe_characters() {
        assert_eq!(
            sanitize_title(r#"History: "Mughals" <part 2/3>?*|"#),
            "History Mughals part 23"
        );
        assert_eq!(sanitize_title("plain title"), "plain title");
    }

    #[test]
    fn netscape_blob_collapses_to_header() {
        let blob = "# Netscape HTTP Cookie File\n\
                    .youtube.com\tTRUE\t/\tTRUE\t0\tSID\tabc\n\
                    #HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t0\tHSID\tdef\n\
                    not a cookie line\n";
        assert_eq!(
            cookie_header_from_netscape(blob).as_deref(),
            Some("SID=abc; HSID=def")
        );
    }

    #[test]
    fn netscape_blob_without_entries() {
        assert!(cookie_header_from_netscape("# comments only\n").is_none());
        assert!(cookie_header_from_netscape("").is_none());
    }
}
