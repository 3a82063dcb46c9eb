use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::error::StorageError;

/// Value of the `X-Client-Info` header sent with every request.
pub const CLIENT_INFO: &str = concat!("storage-rs/", env!("CARGO_PKG_VERSION"));

/// Resolves request paths against the storage root and supplies default headers.
///
/// Built once per client and never mutated afterwards; per-call headers are passed
/// to [`Transport::headers`] as an overlay instead.
#[derive(Debug, Clone)]
pub struct Transport {
    default_headers: HeaderMap,
    base_url: Url,
}

impl Transport {
    /// Parse `base_url` and build the default header set.
    ///
    /// `extra_headers` are applied last, so they win over the built-in defaults.
    pub fn new(
        base_url: &str,
        token: &str,
        extra_headers: &BTreeMap<String, String>,
    ) -> Result<Self, StorageError> {
        let mut url = Url::parse(base_url).map_err(|e| {
            StorageError::InvalidConfig(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(StorageError::InvalidConfig(format!(
                "Base URL '{}' cannot carry a path",
                base_url
            )));
        }
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        url.set_fragment(None);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert("x-client-info", HeaderValue::from_static(CLIENT_INFO));
        default_headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| StorageError::InvalidConfig(format!("Invalid auth header: {}", e)))?,
        );

        for (key, value) in extra_headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                StorageError::InvalidConfig(format!("Invalid header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                StorageError::InvalidConfig(format!("Invalid header value for '{}': {}", key, e))
            })?;
            default_headers.insert(name, value);
        }

        Ok(Self {
            default_headers,
            base_url: url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Merge the defaults under a request's own headers.
    ///
    /// Defaults are only added for names the overlay does not already carry.
    pub fn headers(&self, overlay: HeaderMap) -> HeaderMap {
        let mut headers = overlay;
        for (name, value) in &self.default_headers {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers
    }

    /// Resolve a request path to a full URL.
    ///
    /// Absolute URLs pass through unchanged. Anything else is appended to the base
    /// path; a `?query` suffix becomes the URL query.
    pub fn resolve(&self, path: &str) -> Url {
        if !path.starts_with('/') {
            if let Ok(absolute) = Url::parse(path) {
                return absolute;
            }
        }

        let (path_part, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let joined = if path_part.is_empty() || path_part.starts_with('/') {
            format!("{}{}", base_path, path_part)
        } else {
            format!("{}/{}", base_path, path_part)
        };
        url.set_path(&joined);
        url.set_query(query);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        Transport::new("https://abc.supabase.co/storage/v1", "secret", &BTreeMap::new()).unwrap()
    }

    #[test]
    fn default_headers_present() {
        let t = transport();
        let h = t.default_headers();
        assert_eq!(h[ACCEPT], "application/json");
        assert_eq!(h[CONTENT_TYPE], "application/json");
        assert_eq!(h[AUTHORIZATION], "Bearer secret");
        assert_eq!(h["x-client-info"], CLIENT_INFO);
        assert!(CLIENT_INFO.starts_with("storage-rs/"));
    }

    #[test]
    fn extra_headers_override_defaults() {
        let mut extra = BTreeMap::new();
        extra.insert("Content-Type".to_string(), "text/csv".to_string());
        extra.insert("apikey".to_string(), "anon".to_string());
        let t = Transport::new("https://abc.supabase.co/storage/v1", "secret", &extra).unwrap();
        assert_eq!(t.default_headers()[CONTENT_TYPE], "text/csv");
        assert_eq!(t.default_headers()["apikey"], "anon");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = Transport::new("not a url", "secret", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));

        let err = Transport::new("/storage/v1", "secret", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));

        let err = Transport::new("mailto:ops@example.com", "secret", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[test]
    fn invalid_header_value_is_config_error() {
        let mut extra = BTreeMap::new();
        extra.insert("x-bad".to_string(), "line\nbreak".to_string());
        let err = Transport::new("https://abc.supabase.co", "secret", &extra).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let t = Transport::new("https://abc.supabase.co/storage/v1/", "k", &BTreeMap::new()).unwrap();
        assert_eq!(t.base_url().path(), "/storage/v1");
    }

    #[test]
    fn resolve_appends_to_base_path() {
        let t = transport();
        let url = t.resolve("/bucket");
        assert_eq!(url.as_str(), "https://abc.supabase.co/storage/v1/bucket");
        assert!(url.query().is_none());

        let url = t.resolve("bucket/avatars");
        assert_eq!(url.path(), "/storage/v1/bucket/avatars");
    }

    #[test]
    fn resolve_with_query() {
        let t = transport();
        let url = t.resolve("/object/upload/sign/bucket/path?token=abc");
        assert_eq!(url.path(), "/storage/v1/object/upload/sign/bucket/path");
        assert_eq!(url.query(), Some("token=abc"));
    }

    #[test]
    fn resolve_absolute_passes_through() {
        let t = transport();
        let url = t.resolve("https://cdn.example.com/file.png?x=1");
        assert_eq!(url.as_str(), "https://cdn.example.com/file.png?x=1");
    }

    #[test]
    fn resolve_against_root_base() {
        let t = Transport::new("http://127.0.0.1:5000/", "k", &BTreeMap::new()).unwrap();
        assert_eq!(t.resolve("/bucket").as_str(), "http://127.0.0.1:5000/bucket");
    }

    #[test]
    fn overlay_wins_and_defaults_fill_the_rest() {
        let t = transport();
        let mut overlay = HeaderMap::new();
        overlay.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        overlay.insert("x-upsert", HeaderValue::from_static("true"));

        let merged = t.headers(overlay);
        assert_eq!(merged[CONTENT_TYPE], "image/png");
        assert_eq!(merged["x-upsert"], "true");
        assert_eq!(merged[AUTHORIZATION], "Bearer secret");
        assert_eq!(merged.get_all(CONTENT_TYPE).iter().count(), 1);

        // Defaults are untouched by the merge.
        assert_eq!(t.default_headers()[CONTENT_TYPE], "application/json");
        assert!(t.default_headers().get("x-upsert").is_none());
    }
}
