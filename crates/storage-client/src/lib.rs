//! Supabase Storage HTTP client.
//!
//! This crate provides an HTTP client for the Storage REST API (`/storage/v1/...`):
//! bucket management, object upload/download, signed URLs and image transforms.
//!
//! Every operation goes through one request pipeline: [`Transport`] resolves the path
//! and merges default headers under the per-call ones, the response is classified
//! (status outside `[200, 400)` becomes [`StorageError::Api`]) and only then is the
//! body decoded.
//!
//! # Usage
//!
//! ```ignore
//! use storage_client::{BucketOptions, FileOptions, StorageClient, UrlOptions};
//!
//! let storage = StorageClient::new("https://your-project.supabase.co/storage/v1", key)?;
//!
//! // Bucket operations
//! let buckets = storage.list_buckets().await?;
//! storage.create_bucket("photos", BucketOptions::new().public(true)).await?;
//!
//! // File operations
//! let file_api = storage.from("photos");
//! file_api.upload("photo.png", data, FileOptions::new().content_type("image/png")).await?;
//! let bytes = file_api.download("photo.png", UrlOptions::default()).await?;
//! ```

pub mod bucket_api;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod request;
pub mod transport;
pub mod types;

// Re-exports for convenient access
pub use bucket_api::StorageBucketApi;
pub use client::StorageClient;
pub use config::StorageConfig;
pub use error::{StatusCodeField, StorageApiErrorResponse, StorageError};
pub use query::build_url;
pub use request::{ApiRequest, RequestBody};
pub use transport::{Transport, CLIENT_INFO};
pub use types::*;
