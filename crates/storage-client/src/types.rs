use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default `limit` for file listings.
pub const DEFAULT_LIMIT: u32 = 100;
/// Default `offset` for file listings.
pub const DEFAULT_OFFSET: u32 = 0;
/// Default sort column for file listings.
pub const DEFAULT_SORT_COLUMN: &str = "name";
/// Default cache lifetime, in seconds, for uploads.
pub const DEFAULT_CACHE_CONTROL: &str = "3600";
/// Default content type for uploads.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";
/// Default upsert flag for uploads.
pub const DEFAULT_UPSERT: bool = false;

/// A storage bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub file_size_limit: Option<i64>,
    #[serde(default, alias = "allowed_mine_types", deserialize_with = "null_as_empty")]
    pub allowed_mime_types: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Options for creating or updating a bucket.
///
/// `file_size_limit` and `allowed_mime_types` are only sent when set and non-empty.
#[derive(Debug, Clone, Default)]
pub struct BucketOptions {
    pub public: bool,
    pub file_size_limit: Option<String>,
    pub allowed_mime_types: Option<Vec<String>>,
}

impl BucketOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    /// Accepts a byte count (`5_000_000`) or a size string (`"5MB"`).
    pub fn file_size_limit(mut self, limit: impl ToString) -> Self {
        self.file_size_limit = Some(limit.to_string());
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = Some(types.into_iter().map(Into::into).collect());
        self
    }
}

/// Request body for bucket create/update.
#[derive(Debug, Serialize)]
pub(crate) struct BucketBody<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<&'a [String]>,
}

impl<'a> BucketBody<'a> {
    pub fn new(id: &'a str, options: &'a BucketOptions) -> Self {
        Self {
            id,
            name: id,
            public: options.public,
            file_size_limit: options
                .file_size_limit
                .as_deref()
                .filter(|limit| !limit.is_empty()),
            allowed_mime_types: options
                .allowed_mime_types
                .as_deref()
                .filter(|types| !types.is_empty()),
        }
    }
}

/// Response from `POST /bucket`. Older servers answer with the name only, so
/// `public` is kept apart to tell "omitted" from `false`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CreatedBucket {
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(flatten)]
    pub bucket: Bucket,
}

/// Generic `{ "message": ... }` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// A file object returned from list operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileObject {
    pub name: String,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_accessed_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Options for file upload/update.
///
/// Every field that is set overrides one request header for that call only.
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// Cache lifetime in seconds. Defaults to 3600.
    ///
    /// The header carries the directive form: `"3600"` goes out as
    /// `cache-control: max-age=3600`, not as the bare number. A value that is not all
    /// digits (e.g. `"no-cache"`) is sent verbatim.
    pub cache_control: Option<String>,
    /// Defaults to `text/plain;charset=UTF-8`.
    pub content_type: Option<String>,
    /// Overwrite an existing object instead of failing. Defaults to false.
    pub upsert: Option<bool>,
    pub duplex: Option<String>,
    /// Custom metadata, sent JSON-encoded in `x-metadata`.
    pub metadata: Option<serde_json::Value>,
}

impl FileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache lifetime in seconds; sent as `max-age=<value>`.
    pub fn cache_control(mut self, value: &str) -> Self {
        self.cache_control = Some(value.to_string());
        self
    }

    pub fn content_type(mut self, value: &str) -> Self {
        self.content_type = Some(value.to_string());
        self
    }

    pub fn upsert(mut self, value: bool) -> Self {
        self.upsert = Some(value);
        self
    }

    pub fn duplex(mut self, value: &str) -> Self {
        self.duplex = Some(value.to_string());
        self
    }

    pub fn metadata(mut self, value: serde_json::Value) -> Self {
        self.metadata = Some(value);
        self
    }

    /// `cache-control` header value: bare seconds become `max-age=<n>`.
    pub(crate) fn cache_control_header(&self) -> String {
        let value = self
            .cache_control
            .as_deref()
            .unwrap_or(DEFAULT_CACHE_CONTROL);
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            format!("max-age={}", value)
        } else {
            value.to_string()
        }
    }
}

/// Options for listing files in a bucket.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_column: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub search: Option<String>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn sort_by(mut self, column: &str, order: SortOrder) -> Self {
        self.sort_column = Some(column.to_string());
        self.sort_order = Some(order);
        self
    }

    pub fn search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }
}

/// Sort configuration for file listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub column: String,
    pub order: String,
}

/// Request body for `POST /object/list/{bucket}`, with defaults applied.
#[derive(Debug, Serialize)]
pub(crate) struct ListRequestBody<'a> {
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: SortBy,
    pub prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<&'a str>,
}

impl<'a> ListRequestBody<'a> {
    pub fn new(prefix: &'a str, options: &'a SearchOptions) -> Self {
        Self {
            limit: options.limit.unwrap_or(DEFAULT_LIMIT),
            offset: options.offset.unwrap_or(DEFAULT_OFFSET),
            sort_by: SortBy {
                column: options
                    .sort_column
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_SORT_COLUMN.to_string()),
                order: options.sort_order.unwrap_or_default().as_str().to_string(),
            },
            prefix,
            search: options.search.as_deref(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response from upload/update/move/copy/remove operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileResponse {
    #[serde(default, rename = "Key", alias = "key")]
    pub key: Option<String>,
    #[serde(default, rename = "Id", alias = "id")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response from create_signed_url.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignedUrlResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    pub signed_url: String,
}

/// Entry in a batch signed URL response.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrlBatchEntry {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "signedURL")]
    pub signed_url: Option<String>,
}

/// Response from create_signed_upload_url.
///
/// `url` is relative to the storage root and carries the upload token as a query
/// parameter; pass it unchanged to `upload_to_signed_url`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignedUploadUrlResponse {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl SignedUploadUrlResponse {
    /// The upload token, from the body or else from the `token` query parameter of `url`.
    pub fn token(&self) -> Option<String> {
        if let Some(token) = &self.token {
            return Some(token.clone());
        }
        let query = self.url.split_once('?')?.1;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    }
}

/// Response from upload_to_signed_url.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadToSignedUrlResponse {
    #[serde(default, rename = "Key", alias = "key")]
    pub key: String,
}

/// Image resize mode for transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Crop to fit exact dimensions (default).
    Cover,
    /// Scale down to fit within dimensions, preserving aspect ratio.
    Contain,
    /// Stretch to fill exact dimensions.
    Fill,
}

impl ResizeMode {
    pub fn as_str(&self) -> &str {
        match self {
            ResizeMode::Cover => "cover",
            ResizeMode::Contain => "contain",
            ResizeMode::Fill => "fill",
        }
    }
}

impl std::fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cover" => Ok(ResizeMode::Cover),
            "contain" => Ok(ResizeMode::Contain),
            "fill" => Ok(ResizeMode::Fill),
            other => Err(format!("unknown resize mode '{}'", other)),
        }
    }
}

impl From<ResizeMode> for String {
    fn from(mode: ResizeMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Options for server-side image transformation.
///
/// `resize` is kept as a string: values outside `cover|contain|fill` are dropped
/// when the URL or request body is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resize: Option<String>,
    pub format: Option<String>,
    pub quality: Option<u32>,
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn resize(mut self, resize: impl Into<String>) -> Self {
        self.resize = Some(resize.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// The resize mode, if set to a recognized value.
    pub fn resize_mode(&self) -> Option<ResizeMode> {
        self.resize.as_deref().and_then(|r| r.parse().ok())
    }

    /// Query parameters for the set fields, in the order the builder emits them.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(h) = self.height.filter(|h| *h > 0) {
            pairs.push(("height", h.to_string()));
        }
        if let Some(w) = self.width.filter(|w| *w > 0) {
            pairs.push(("width", w.to_string()));
        }
        if let Some(f) = self.format.as_deref().filter(|f| !f.is_empty()) {
            pairs.push(("format", f.to_string()));
        }
        if let Some(q) = self.quality.filter(|q| *q > 0) {
            pairs.push(("quality", q.to_string()));
        }
        if let Some(r) = self.resize_mode() {
            pairs.push(("resize", r.to_string()));
        }
        pairs
    }

    /// Convert to a JSON value for inclusion in signed URL request bodies.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if let Some(w) = self.width.filter(|w| *w > 0) {
            map.insert("width".into(), serde_json::json!(w));
        }
        if let Some(h) = self.height.filter(|h| *h > 0) {
            map.insert("height".into(), serde_json::json!(h));
        }
        if let Some(r) = self.resize_mode() {
            map.insert("resize".into(), serde_json::json!(r.as_str()));
        }
        if let Some(q) = self.quality.filter(|q| *q > 0) {
            map.insert("quality".into(), serde_json::json!(q));
        }
        if let Some(f) = self.format.as_deref().filter(|f| !f.is_empty()) {
            map.insert("format".into(), serde_json::json!(f));
        }
        serde_json::Value::Object(map)
    }

    /// Returns true if no transform option would be sent.
    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }
}

/// Options for public/download URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// When set, the image render endpoint is used instead of the plain object path.
    pub transform: Option<TransformOptions>,
    /// Ask the server to send `Content-Disposition: attachment`.
    pub download: bool,
}

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(mut self, transform: TransformOptions) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }
}

/// File metadata returned by `info()`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub cache_control: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}
