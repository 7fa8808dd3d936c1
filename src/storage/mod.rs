// ABOUTME: Blob upload gateway for chat images backed by an external object store
// ABOUTME: Uploads return permanent public URLs stored by the message tables
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Blob Upload Gateway
//!
//! Image bytes are uploaded to an external object store before any database
//! transaction opens; the store returns a permanently public URL which is the
//! only thing the database ever holds. The trait seam keeps the HTTP client
//! out of the data path and lets tests substitute an in-memory store,
//! including one that fails mid-batch.

use crate::config::BlobStoreConfig;
use crate::errors::{AppError, AppResult};
use crate::ids;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Content types accepted for chat image uploads
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Maximum size of a single uploaded image (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum number of images in one multi-image send
pub const MAX_IMAGES_PER_MESSAGE: usize = 9;

/// Check whether a content type is an accepted image type
#[must_use]
pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// File extension for an accepted image content type
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".jpg",
    }
}

/// Object file name for one uploaded image
///
/// Carries the random id tail so the concurrent uploads of a multi-image
/// batch never mint the same path within one millisecond.
fn object_file_name(content_type: &str) -> String {
    format!("{}{}", ids::new_id("img"), extension_for(content_type))
}

/// External object store accepting bytes and returning public URLs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload one blob, returning its permanent public URL
    async fn upload(&self, bytes: Bytes, content_type: &str) -> AppResult<String>;
}

/// Upload a batch of images concurrently
///
/// All uploads run in parallel; any single failure fails the whole batch, so
/// the caller never reaches the database with a partial set. Already-uploaded
/// blobs from a failed batch are accepted orphans, not recovered.
///
/// # Errors
///
/// Returns the first upload error encountered.
pub async fn upload_all(
    store: &dyn BlobStore,
    files: Vec<(Bytes, String)>,
) -> AppResult<Vec<String>> {
    let uploads = files
        .iter()
        .map(|(bytes, content_type)| store.upload(bytes.clone(), content_type));
    futures_util::future::try_join_all(uploads).await
}

/// Supabase-style storage API client
///
/// Objects land under `messages/` in the configured bucket; the public URL is
/// `{base}/object/public/{bucket}/{path}`.
pub struct HttpBlobStore {
    client: reqwest::Client,
    config: BlobStoreConfig,
}

impl HttpBlobStore {
    /// Create a client from blob store configuration
    #[must_use]
    pub fn new(config: BlobStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn object_path(&self, file_name: &str) -> String {
        format!("messages/{file_name}")
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.config.base_url, self.config.bucket, path
        )
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, bytes: Bytes, content_type: &str) -> AppResult<String> {
        let file_name = object_file_name(content_type);
        let path = self.object_path(&file_name);
        let url = format!(
            "{}/object/{}/{}",
            self.config.base_url, self.config.bucket, path
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::upload(format!("Image upload failed: {e}")).with_source(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upload(format!(
                "Image upload rejected ({status}): {body}"
            )));
        }

        Ok(self.public_url(&path))
    }
}

/// In-memory store for tests and local development
///
/// Holds uploaded blobs in a map keyed by synthetic public URL. `fail_after`
/// makes the Nth and later uploads fail, which is how the upload-abort
/// behavior of multi-image sends gets exercised.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, (Bytes, String)>>,
    uploads: AtomicUsize,
    fail_after: Option<usize>,
}

impl MemoryBlobStore {
    /// Create an empty store that never fails
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose uploads fail once `fail_after` have succeeded
    #[must_use]
    pub fn failing_after(fail_after: usize) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            fail_after: Some(fail_after),
        }
    }

    /// Number of blobs currently held
    ///
    /// # Panics
    ///
    /// Panics if the interior lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// Whether the store holds no blobs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: Bytes, content_type: &str) -> AppResult<String> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if n >= limit {
                return Err(AppError::upload("Simulated storage failure"));
            }
        }
        let url = format!(
            "memory://chat-images/messages/img_{n}{}",
            extension_for(content_type)
        );
        self.blobs
            .lock()
            .unwrap()
            .insert(url.clone(), (bytes, content_type.to_owned()));
        Ok(url)
    }
}
