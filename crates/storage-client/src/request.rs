use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;

use crate::error::StorageError;

/// Body of an outgoing request.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Pre-encoded JSON payload.
    Json(Vec<u8>),
    /// Opaque bytes, passed through to the wire as-is.
    Raw(reqwest::Body),
}

/// A request relative to the storage root, ready for [`StorageClient::execute`].
///
/// `headers` is the per-call overlay; the transport's defaults are merged under it
/// when the request is sent.
///
/// [`StorageClient::execute`]: crate::StorageClient::execute
#[derive(Debug)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    /// Encode `body` as the JSON payload.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, StorageError> {
        self.body = RequestBody::Json(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Send `body` unmodified.
    pub fn bytes(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = RequestBody::Raw(body.into());
        self
    }

    /// Set a header for this request only, replacing any earlier value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Like [`ApiRequest::header`], validating a caller-supplied value.
    pub fn try_header(self, name: HeaderName, value: &str) -> Result<Self, StorageError> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            StorageError::InvalidConfig(format!("Invalid header value for '{}': {}", name, e))
        })?;
        Ok(self.header(name, value))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// The explicit content type of this request, if the overlay sets one.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }
}
