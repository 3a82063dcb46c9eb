use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use serde_json::json;

use crate::client::StorageClient;
use crate::error::StorageError;
use crate::query::build_url;
use crate::request::ApiRequest;
use crate::types::*;

/// File operations API scoped to a specific bucket.
///
/// Created via `StorageClient::from("bucket_name")`.
///
/// # Example
/// ```ignore
/// let file_api = storage.from("avatars");
/// file_api.upload("photo.png", data, FileOptions::new()).await?;
/// let bytes = file_api.download("photo.png", UrlOptions::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StorageBucketApi {
    client: StorageClient,
    bucket_id: String,
}

impl StorageBucketApi {
    pub(crate) fn new(client: StorageClient, bucket_id: String) -> Self {
        Self { client, bucket_id }
    }

    /// Upload a file to the bucket.
    ///
    /// Mirrors `supabase.storage.from('bucket').upload(path, file, options)`.
    pub async fn upload(
        &self,
        path: &str,
        data: impl Into<reqwest::Body>,
        options: FileOptions,
    ) -> Result<FileResponse, StorageError> {
        self.upload_or_update(path, data, options, false).await
    }

    /// Update (replace) a file in the bucket.
    ///
    /// Mirrors `supabase.storage.from('bucket').update(path, file, options)`.
    pub async fn update(
        &self,
        path: &str,
        data: impl Into<reqwest::Body>,
        options: FileOptions,
    ) -> Result<FileResponse, StorageError> {
        self.upload_or_update(path, data, options, true).await
    }

    /// Upload (POST) or replace (PUT) an object.
    pub async fn upload_or_update(
        &self,
        path: &str,
        data: impl Into<reqwest::Body>,
        options: FileOptions,
        update: bool,
    ) -> Result<FileResponse, StorageError> {
        let object = format!("/object/{}", self.object_key(path));
        let request = if update {
            ApiRequest::put(object)
        } else {
            ApiRequest::post(object)
        };
        let request = with_file_headers(request, &options)?.bytes(data);
        self.client.execute_json(request).await
    }

    /// Download a file from the bucket.
    ///
    /// With `options.transform` set the image render endpoint is used, so the server
    /// returns the transformed image instead of the stored bytes.
    pub async fn download(&self, path: &str, options: UrlOptions) -> Result<Bytes, StorageError> {
        let key = self.object_key(path);
        let path = if options.transform.is_some() {
            format!("/render/image/authenticated/{}", key)
        } else {
            format!("/object/{}", key)
        };
        let url = build_url(self.client.transport().resolve(&path).as_str(), &options)?;
        self.client.execute_bytes(ApiRequest::get(url)).await
    }

    /// List files in the bucket.
    ///
    /// `prefix` is the folder to list (`""` for the root). Unset options fall back to
    /// `limit=100`, `offset=0`, sorted by `name` ascending.
    pub async fn list(
        &self,
        prefix: &str,
        options: SearchOptions,
    ) -> Result<Vec<FileObject>, StorageError> {
        let body = ListRequestBody::new(prefix, &options);
        let request = ApiRequest::post(format!("/object/list/{}", self.bucket_id)).json(&body)?;
        self.client.execute_json(request).await
    }

    /// Move a file within the bucket.
    ///
    /// Mirrors `supabase.storage.from('bucket').move(from, to)`.
    pub async fn move_file(&self, from: &str, to: &str) -> Result<FileResponse, StorageError> {
        let request = ApiRequest::post("/object/move").json(&json!({
            "bucketId": self.bucket_id,
            "sourceKey": from,
            "destinationKey": to,
        }))?;
        self.client.execute_json(request).await
    }

    /// Copy a file within the bucket.
    pub async fn copy(&self, from: &str, to: &str) -> Result<FileResponse, StorageError> {
        let request = ApiRequest::post("/object/copy").json(&json!({
            "bucketId": self.bucket_id,
            "sourceKey": from,
            "destinationKey": to,
        }))?;
        self.client.execute_json(request).await
    }

    /// Remove files from the bucket.
    ///
    /// Mirrors `supabase.storage.from('bucket').remove([paths])`.
    pub async fn remove(&self, paths: Vec<&str>) -> Result<Vec<FileResponse>, StorageError> {
        let request = ApiRequest::delete(format!("/object/{}", self.bucket_id))
            .json(&json!({ "prefixes": paths }))?;
        self.client.execute_json(request).await
    }

    /// Create a signed URL for time-limited access to a file.
    ///
    /// `expires_in` is the number of seconds until the URL expires.
    pub async fn create_signed_url(
        &self,
        path: &str,
        expires_in: u64,
    ) -> Result<SignedUrlResponse, StorageError> {
        self.sign(path, json!({ "expiresIn": expires_in })).await
    }

    /// Create a signed URL that serves a transformed image.
    ///
    /// Mirrors `supabase.storage.from('bucket').createSignedUrl(path, expiresIn, { transform })`.
    pub async fn create_signed_url_with_transform(
        &self,
        path: &str,
        expires_in: u64,
        transform: &TransformOptions,
    ) -> Result<SignedUrlResponse, StorageError> {
        let mut body = json!({ "expiresIn": expires_in });
        if !transform.is_empty() {
            body["transform"] = transform.to_json();
        }
        self.sign(path, body).await
    }

    async fn sign(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<SignedUrlResponse, StorageError> {
        let request =
            ApiRequest::post(format!("/object/sign/{}", self.object_key(path))).json(&body)?;
        let mut result: SignedUrlResponse = self.client.execute_json(request).await?;
        result.signed_url = self.absolute_url(&result.signed_url);
        Ok(result)
    }

    /// Create signed URLs for multiple files.
    ///
    /// `expires_in` is the number of seconds until the URLs expire.
    pub async fn create_signed_urls(
        &self,
        paths: Vec<&str>,
        expires_in: u64,
    ) -> Result<Vec<SignedUrlBatchEntry>, StorageError> {
        let request = ApiRequest::post(format!("/object/sign/{}", self.bucket_id)).json(&json!({
            "expiresIn": expires_in,
            "paths": paths,
        }))?;
        let mut results: Vec<SignedUrlBatchEntry> = self.client.execute_json(request).await?;
        for entry in &mut results {
            if let Some(signed_url) = entry.signed_url.as_mut() {
                let absolute = self.absolute_url(signed_url);
                *signed_url = absolute;
            }
        }
        Ok(results)
    }

    /// Get the public URL for a file (no HTTP call, just URL construction).
    ///
    /// Only works for files in public buckets. A transform switches to the
    /// `/render/image/public/` endpoint.
    pub fn get_public_url(&self, path: &str, options: UrlOptions) -> Result<String, StorageError> {
        let key = self.object_key(path);
        let path = if options.transform.is_some() {
            format!("/render/image/public/{}", key)
        } else {
            format!("/object/public/{}", key)
        };
        let base = self.client.transport().resolve(&path);
        Ok(build_url(base.as_str(), &options)?)
    }

    /// Create a signed upload URL for delegated uploads.
    pub async fn create_signed_upload_url(
        &self,
        path: &str,
    ) -> Result<SignedUploadUrlResponse, StorageError> {
        let request = ApiRequest::post(format!("/object/upload/sign/{}", self.object_key(path)))
            .json(&json!({}))?;
        self.client.execute_json(request).await
    }

    /// Upload a file using a URL from [`create_signed_upload_url`].
    ///
    /// `signed_url` is the `url` field of the response, relative to the storage root;
    /// an absolute URL is used as-is.
    ///
    /// [`create_signed_upload_url`]: StorageBucketApi::create_signed_upload_url
    pub async fn upload_to_signed_url(
        &self,
        signed_url: &str,
        data: impl Into<reqwest::Body>,
        options: FileOptions,
    ) -> Result<UploadToSignedUrlResponse, StorageError> {
        let request = with_file_headers(ApiRequest::put(signed_url), &options)?.bytes(data);
        self.client.execute_json(request).await
    }

    /// Get file metadata.
    ///
    /// Mirrors `supabase.storage.from('bucket').info(path)`.
    pub async fn info(&self, path: &str) -> Result<FileInfo, StorageError> {
        let request = ApiRequest::get(format!(
            "/object/info/authenticated/{}",
            self.object_key(path)
        ));
        self.client.execute_json(request).await
    }

    /// Check if a file exists.
    ///
    /// Returns `false` when the server answers 400 or 404.
    pub async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let request = ApiRequest::head(format!("/object/{}", self.object_key(path)));
        match self.client.execute(request).await {
            Ok(_) => Ok(true),
            Err(StorageError::Api {
                status: 400 | 404, ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get the bucket ID this API is scoped to.
    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    /// `bucket/path` with separators collapsed and every segment percent-encoded,
    /// ready to be placed in a request path.
    fn object_key(&self, path: &str) -> String {
        normalize_path(&format!("{}/{}", self.bucket_id, path))
            .split('/')
            .map(|segment| utf8_percent_encode(segment, &SEGMENT_CHARS).to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            let base = self.client.base_url().as_str().trim_end_matches('/');
            format!("{}{}", base, url)
        } else {
            url.to_string()
        }
    }
}

/// Characters encoded inside one segment of an object key.
///
/// `?` and `#` would otherwise end the path, and `%` must not be read back as an
/// escape.
const SEGMENT_CHARS: AsciiSet = CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Per-call header overlay for uploads. Unset options take the upload defaults.
fn with_file_headers(request: ApiRequest, options: &FileOptions) -> Result<ApiRequest, StorageError> {
    let upsert = options.upsert.unwrap_or(DEFAULT_UPSERT);
    let mut request = request
        .try_header(CACHE_CONTROL, &options.cache_control_header())?
        .try_header(
            CONTENT_TYPE,
            options.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
        )?
        .header(
            HeaderName::from_static("x-upsert"),
            HeaderValue::from_static(if upsert { "true" } else { "false" }),
        );
    if let Some(duplex) = &options.duplex {
        request = request.try_header(HeaderName::from_static("duplex"), duplex)?;
    }
    if let Some(metadata) = &options.metadata {
        let encoded = serde_json::to_string(metadata)?;
        request = request.try_header(HeaderName::from_static("x-metadata"), &encoded)?;
    }
    Ok(request)
}

/// Collapse runs of `/` into one, e.g. `b//a///c.txt` -> `b/a/c.txt`.
pub(crate) fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestBody;

    fn api() -> StorageBucketApi {
        StorageClient::new("https://example.supabase.co/storage/v1", "test-key")
            .unwrap()
            .from("avatars")
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_path("b//a//b.txt"), "b/a/b.txt");
        assert_eq!(normalize_path("b///a.txt"), "b/a.txt");
        assert_eq!(normalize_path("b/a.txt"), "b/a.txt");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn object_key_joins_bucket_and_path() {
        let api = api();
        assert_eq!(api.object_key("/folder//photo.png"), "avatars/folder/photo.png");
        assert_eq!(api.object_key("photo.png"), "avatars/photo.png");
    }

    #[test]
    fn object_key_encodes_reserved_characters() {
        let api = api();
        assert_eq!(api.object_key("what?.txt"), "avatars/what%3F.txt");
        assert_eq!(api.object_key("100%/a#b.txt"), "avatars/100%25/a%23b.txt");
        assert_eq!(api.object_key("my file.txt"), "avatars/my%20file.txt");
    }

    #[test]
    fn public_url_keeps_question_mark_in_key() {
        let url = api()
            .get_public_url("what?.txt", UrlOptions::default())
            .unwrap();
        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/object/public/avatars/what%3F.txt"
        );
        let parsed = url::Url::parse(&url).unwrap();
        assert!(parsed.query().is_none());

        let url = api()
            .get_public_url("50%.png", UrlOptions::new().download(true))
            .unwrap();
        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/object/public/avatars/50%25.png?download=true"
        );
    }

    #[test]
    fn public_url_construction() {
        let url = api()
            .get_public_url("folder/photo.png", UrlOptions::default())
            .unwrap();
        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/object/public/avatars/folder/photo.png"
        );
    }

    #[test]
    fn public_url_with_transform_uses_render_path() {
        let options = UrlOptions::new().transform(
            TransformOptions::new()
                .width(100)
                .height(50)
                .resize(ResizeMode::Contain),
        );
        let url = api().get_public_url("photo.png", options).unwrap();
        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/render/image/public/avatars/photo.png?height=50&resize=contain&width=100"
        );
    }

    #[test]
    fn public_url_download_flag() {
        let url = api()
            .get_public_url("doc.pdf", UrlOptions::new().download(true))
            .unwrap();
        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/object/public/avatars/doc.pdf?download=true"
        );
    }

    #[test]
    fn absolute_url_prefixes_relative_paths() {
        let api = api();
        assert_eq!(
            api.absolute_url("/object/sign/avatars/a.png?token=t"),
            "https://example.supabase.co/storage/v1/object/sign/avatars/a.png?token=t"
        );
        assert_eq!(api.absolute_url("https://cdn/x"), "https://cdn/x");
    }

    #[test]
    fn file_headers_defaults() {
        let req = with_file_headers(ApiRequest::post("/object/a/b"), &FileOptions::new()).unwrap();
        let headers = req.headers();
        assert_eq!(headers[CACHE_CONTROL], "max-age=3600");
        assert_eq!(headers[CONTENT_TYPE], "text/plain;charset=UTF-8");
        assert_eq!(headers["x-upsert"], "false");
        assert!(headers.get("duplex").is_none());
        assert!(headers.get("x-metadata").is_none());
    }

    #[test]
    fn file_headers_from_options() {
        let options = FileOptions::new()
            .content_type("image/png")
            .cache_control("60")
            .upsert(true)
            .duplex("half")
            .metadata(json!({"owner": "me"}));
        let req = with_file_headers(ApiRequest::put("/object/a/b"), &options)
            .unwrap()
            .bytes(vec![0u8; 4]);
        let headers = req.headers();
        assert_eq!(headers[CACHE_CONTROL], "max-age=60");
        assert_eq!(headers[CONTENT_TYPE], "image/png");
        assert_eq!(headers["x-upsert"], "true");
        assert_eq!(headers["duplex"], "half");
        assert_eq!(headers["x-metadata"], r#"{"owner":"me"}"#);
        assert!(matches!(req.body(), RequestBody::Raw(_)));
    }
}
