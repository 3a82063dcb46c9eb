use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for connecting to a Storage API endpoint.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage API root (e.g. "https://abc.supabase.co/storage/v1")
    pub url: String,
    /// Bearer token sent as `Authorization: Bearer <token>`
    pub token: String,
    /// Extra default headers; these override the built-in defaults on collision
    pub headers: BTreeMap<String, String>,
    /// Total request timeout, including reading the body
    pub timeout: Option<Duration>,
    /// Timeout for establishing the connection
    pub connect_timeout: Option<Duration>,
}

impl StorageConfig {
    /// Create a new config pointing at a Storage API root.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            headers: BTreeMap::new(),
            timeout: None,
            connect_timeout: None,
        }
    }

    /// Create a config from a Supabase project URL and API key.
    ///
    /// The storage root is `<project_url>/storage/v1` and the key is also sent as
    /// the `apikey` header, which the Supabase gateway requires.
    pub fn from_project_url(project_url: &str, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let base = project_url.trim_end_matches('/');
        Self::new(format!("{}/storage/v1", base), api_key.clone()).header("apikey", api_key)
    }

    /// Add a default header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the total request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}
