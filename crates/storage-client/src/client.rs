use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::bucket_api::StorageBucketApi;
use crate::config::StorageConfig;
use crate::error::{is_success, service_error, StorageError};
use crate::request::{ApiRequest, RequestBody};
use crate::transport::Transport;
use crate::types::*;

/// HTTP client for the Storage API.
///
/// Cloning is cheap: clones share the connection pool and the (immutable) transport,
/// so one client can serve any number of concurrent calls.
///
/// # Example
/// ```ignore
/// use storage_client::StorageClient;
///
/// let storage = StorageClient::new("https://your-project.supabase.co/storage/v1", "service-key")?;
/// let buckets = storage.list_buckets().await?;
/// let file_api = storage.from("avatars");
/// ```
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    transport: Arc<Transport>,
}

impl StorageClient {
    /// Create a new storage client.
    ///
    /// `url` is the Storage API root (e.g., `https://your-project.supabase.co/storage/v1`).
    /// `token` is sent as `Authorization: Bearer <token>`.
    pub fn new(url: &str, token: &str) -> Result<Self, StorageError> {
        Self::with_config(StorageConfig::new(url, token))
    }

    /// Create a client from a full [`StorageConfig`].
    pub fn with_config(config: StorageConfig) -> Result<Self, StorageError> {
        let transport = Transport::new(&config.url, &config.token, &config.headers)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            StorageError::InvalidConfig(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            http,
            transport: Arc::new(transport),
        })
    }

    /// Get the base URL for the storage API.
    pub fn base_url(&self) -> &Url {
        self.transport.base_url()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    // ─── Request Pipeline ────────────────────────────────────────

    /// Send a request and classify the response.
    ///
    /// Returns the response untouched on a 2xx/3xx status so callers can read the body
    /// in whatever form they need. Any other status becomes [`StorageError::Api`].
    pub async fn execute(&self, request: ApiRequest) -> Result<reqwest::Response, StorageError> {
        let ApiRequest {
            method,
            path,
            headers,
            body,
        } = request;
        let url = self.transport.resolve(&path);
        let headers = self.transport.headers(headers);
        debug!(method = %method, url = %redacted(&url), "Sending storage request");

        let builder = self.http.request(method, url).headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Raw(body) => builder.body(body),
        };

        let response = builder.send().await?;
        classify(response).await
    }

    /// Send a request and decode its JSON body into `T`.
    ///
    /// A success with a blank body (e.g. `204 No Content`) yields `T::default()`.
    pub async fn execute_json<T: DeserializeOwned + Default>(
        &self,
        request: ApiRequest,
    ) -> Result<T, StorageError> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        decode_body(status, &body)
    }

    /// Send a request and return its raw body.
    pub async fn execute_bytes(&self, request: ApiRequest) -> Result<Bytes, StorageError> {
        let response = self.execute(request).await?;
        Ok(response.bytes().await?)
    }

    // ─── Bucket Operations ───────────────────────────────────────

    /// List all buckets.
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>, StorageError> {
        self.execute_json(ApiRequest::get("/bucket")).await
    }

    /// Get a bucket by ID.
    pub async fn get_bucket(&self, id: &str) -> Result<Bucket, StorageError> {
        self.execute_json(ApiRequest::get(format!("/bucket/{}", id)))
            .await
    }

    /// Create a new bucket.
    ///
    /// Fields the service leaves out of its answer (often everything but the name)
    /// are filled in from the request.
    pub async fn create_bucket(
        &self,
        id: &str,
        options: BucketOptions,
    ) -> Result<Bucket, StorageError> {
        let request = ApiRequest::post("/bucket").json(&BucketBody::new(id, &options))?;
        let created: CreatedBucket = self.execute_json(request).await?;
        let mut bucket = created.bucket;
        if bucket.id.is_empty() {
            bucket.id = id.to_string();
        }
        if bucket.name.is_empty() {
            bucket.name = id.to_string();
        }
        bucket.public = created.public.unwrap_or(options.public);
        Ok(bucket)
    }

    /// Update a bucket.
    pub async fn update_bucket(
        &self,
        id: &str,
        options: BucketOptions,
    ) -> Result<MessageResponse, StorageError> {
        let request =
            ApiRequest::put(format!("/bucket/{}", id)).json(&BucketBody::new(id, &options))?;
        self.execute_json(request).await
    }

    /// Empty a bucket (remove all files).
    pub async fn empty_bucket(&self, id: &str) -> Result<MessageResponse, StorageError> {
        let request = ApiRequest::post(format!("/bucket/{}/empty", id)).json(&json!({}))?;
        self.execute_json(request).await
    }

    /// Delete a bucket. The bucket must be empty first.
    pub async fn delete_bucket(&self, id: &str) -> Result<MessageResponse, StorageError> {
        let request = ApiRequest::delete(format!("/bucket/{}", id)).json(&json!({}))?;
        self.execute_json(request).await
    }

    // ─── File API Factory ────────────────────────────────────────

    /// Create a file operations API scoped to a bucket.
    ///
    /// Mirrors `supabase.storage.from('bucket')`.
    pub fn from(&self, bucket: &str) -> StorageBucketApi {
        StorageBucketApi::new(self.clone(), bucket.to_string())
    }
}

/// Pass successful responses through; turn everything else into a service error.
async fn classify(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status().as_u16();
    if is_success(status) {
        return Ok(response);
    }
    // An unreadable error body still produces an error carrying the status.
    let body = response.bytes().await.unwrap_or_default();
    let err = service_error(status, &body);
    debug!(status, error = %err, "Storage API returned an error");
    Err(err)
}

/// `url` without its query or fragment. Signed upload URLs carry their token in the
/// query.
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.to_string()
}

/// Decode a success body. A blank body is not decoded and gives `T::default()`.
pub(crate) fn decode_body<T: DeserializeOwned + Default>(
    status: u16,
    body: &[u8],
) -> Result<T, StorageError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|source| StorageError::Decode { status, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_new_ok() {
        let client = StorageClient::new("https://example.supabase.co/storage/v1", "test-key");
        assert!(client.is_ok());
    }

    #[test]
    fn client_new_invalid_url() {
        let err = StorageClient::new("example.supabase.co", "test-key").unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[test]
    fn client_from_project_config() {
        let client =
            StorageClient::with_config(StorageConfig::from_project_url("https://example.supabase.co/", "k"))
                .unwrap();
        assert_eq!(client.base_url().path(), "/storage/v1");
        assert_eq!(client.transport().default_headers()["apikey"], "k");
    }

    #[test]
    fn client_is_shareable() {
        fn assert_shareable<T: Send + Sync + Clone + 'static>() {}
        assert_shareable::<StorageClient>();
        assert_shareable::<StorageBucketApi>();
    }

    #[test]
    fn redacted_url_drops_query() {
        let url = Url::parse(
            "https://abc.supabase.co/storage/v1/object/upload/sign/b/a.txt?token=secret#x",
        )
        .unwrap();
        let logged = redacted(&url);
        assert_eq!(
            logged,
            "https://abc.supabase.co/storage/v1/object/upload/sign/b/a.txt"
        );
        assert!(!logged.contains("secret"));
    }

    #[test]
    fn created_bucket_keeps_reported_public() {
        let created: CreatedBucket =
            decode_body(200, br#"{"name":"docs","public":false}"#).unwrap();
        assert_eq!(created.public, Some(false));
        assert_eq!(created.bucket.name, "docs");

        let created: CreatedBucket = decode_body(200, br#"{"name":"docs"}"#).unwrap();
        assert_eq!(created.public, None);
    }

    #[test]
    fn decode_body_json() {
        let bucket: Bucket = decode_body(200, br#"{"id":"a","name":"a","public":true}"#).unwrap();
        assert_eq!(bucket.id, "a");
        assert!(bucket.public);
    }

    #[test]
    fn decode_body_blank_gives_default() {
        decode_body::<()>(204, b"").unwrap();
        let nothing: Option<Bucket> = decode_body(200, b"  ").unwrap();
        assert!(nothing.is_none());

        let message: MessageResponse = decode_body(204, b"").unwrap();
        assert!(message.message.is_empty());
        let file: FileResponse = decode_body(200, b"\n").unwrap();
        assert!(file.key.is_none());
        let buckets: Vec<Bucket> = decode_body(200, b"").unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn decode_body_null_is_not_blank() {
        let err = decode_body::<MessageResponse>(200, b"null").unwrap_err();
        assert!(matches!(err, StorageError::Decode { status: 200, .. }));
    }

    #[test]
    fn decode_body_malformed_is_decode_error() {
        let err = decode_body::<Vec<Bucket>>(200, b"<html>oops</html>").unwrap_err();
        match err {
            StorageError::Decode { status, .. } => assert_eq!(status, 200),
            other => panic!("Expected Decode variant, got: {:?}", other),
        }
    }
}
