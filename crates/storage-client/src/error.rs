use serde::Deserialize;

/// Error response format from the Storage API.
///
/// `statusCode` is sent as a string by some server versions and as a number by others.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "statusCode")]
    pub status_code: Option<StatusCodeField>,
}

/// The `statusCode` field of an error body, in either of its wire forms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StatusCodeField {
    Number(u16),
    Text(String),
}

impl StatusCodeField {
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            StatusCodeField::Number(n) => Some(*n),
            StatusCodeField::Text(s) => s.parse().ok(),
        }
    }
}

impl StorageApiErrorResponse {
    /// Extract the most informative error message from the response.
    pub fn error_message(&self) -> String {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("Unknown error")
            .to_string()
    }
}

/// Storage-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Transport failure from reqwest: connect, timeout, or body read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API returned an error response.
    #[error("Storage API error ({status}): {message}")]
    Api {
        status: u16,
        error: Option<String>,
        message: String,
    },

    /// Invalid configuration (base URL, token or header values).
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// The request body could not be serialized.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The server reported success but the body was not the expected JSON.
    #[error("Failed to decode response body (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl StorageError {
    /// HTTP status of a service error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Api { status, .. } => Some(*status),
            StorageError::Decode { status, .. } => Some(*status),
            StorageError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Api { status: 404, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Http(e) if e.is_timeout())
    }
}

/// Build the service error for a non-success response.
///
/// Never fails: an empty or non-JSON body still yields an `Api` error carrying `status`.
pub(crate) fn service_error(status: u16, body: &[u8]) -> StorageError {
    if let Ok(resp) = serde_json::from_slice::<StorageApiErrorResponse>(body) {
        return StorageError::Api {
            status,
            error: resp.error.clone(),
            message: resp.error_message(),
        };
    }
    let text = String::from_utf8_lossy(body);
    let message = if text.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        text.into_owned()
    };
    StorageError::Api {
        status,
        error: None,
        message,
    }
}

/// Returns true when `status` counts as success: anything in `[200, 400)`.
pub(crate) fn is_success(status: u16) -> bool {
    (200..400).contains(&status)
}
