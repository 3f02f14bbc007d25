//! ABOUTME: Evidence object storage behind a substitutable trait
//! ABOUTME: Names, filters, and writes uploaded files to GCS, local disk, or memory

use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use fg_core::{time::unix_millis, MonotonicTimer};
use object_store::{
    gcp::GoogleCloudStorageBuilder, local::LocalFileSystem, memory::InMemory, path::Path,
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload,
};
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Extensions accepted for evidence files, compared case-insensitively
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "pdf", "doc", "docx"];

/// MIME types accepted for evidence files
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for fg_core::Error {
    fn from(err: StorageError) -> Self {
        fg_core::Error::Storage(err.to_string())
    }
}

/// Message returned when an upload fails the type filter
pub fn allowed_filetypes_message() -> String {
    format!(
        "File upload only supports the following filetypes: {}",
        ALLOWED_EXTENSIONS.join(", ")
    )
}

/// Extension of `filename` including the leading dot, case preserved; empty when absent
pub fn file_extension(filename: &str) -> &str {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx..],
        _ => "",
    }
}

/// Both the declared MIME type and the filename extension must be on the allow-list
pub fn is_allowed_evidence(filename: &str, content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let extension = file_extension(filename)
        .trim_start_matches('.')
        .to_ascii_lowercase();

    ALLOWED_MIME_TYPES.contains(&mime.as_str()) && ALLOWED_EXTENSIONS.contains(&extension.as_str())
}

/// Deterministic object name: `evidence-<millis>-<suffix><ext>`
pub fn evidence_object_name(original_filename: &str, millis: u128, suffix: u32) -> String {
    format!(
        "evidence-{}-{}{}",
        millis,
        suffix,
        file_extension(original_filename)
    )
}

/// Fresh, collision-resistant object name for an upload
pub fn new_evidence_object_name(original_filename: &str) -> String {
    let suffix = OsRng.next_u32() % 1_000_000_000;
    evidence_object_name(original_filename, unix_millis(), suffix)
}

/// Result of a successful evidence write
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub name: String,
    pub url: String,
    pub size: usize,
    pub etag: Option<String>,
    pub checksum: String,
}

/// Destination for evidence files attached to story submissions
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Bucket the objects land in
    fn bucket(&self) -> &str;

    /// Write `data` as a single object and return its public location
    async fn put_evidence(
        &self,
        object_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError>;

    /// Remove an object written by `put_evidence`
    async fn delete_evidence(&self, object_name: &str) -> Result<(), StorageError>;
}

/// `ObjectStore`-backed bucket
pub struct BucketStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    public_base_url: String,
    // LocalFileSystem rejects object attributes
    supports_attributes: bool,
}

impl BucketStore {
    /// Wrap an already configured object store
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            supports_attributes: true,
        }
    }

    /// Google Cloud Storage; credentials come from `service_account_path` or the
    /// standard `GOOGLE_APPLICATION_CREDENTIALS` environment
    pub fn gcs(
        bucket: &str,
        service_account_path: Option<&str>,
        public_base_url: &str,
    ) -> Result<Self, StorageError> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
        if let Some(path) = service_account_path {
            builder = builder.with_service_account_path(path);
        }

        let store = builder.build()?;
        info!(bucket = %bucket, "Initialized GCS evidence storage");
        Ok(Self::new(Arc::new(store), bucket, public_base_url))
    }

    /// Local directory, one file per object
    pub fn local(
        dir: impl AsRef<FsPath>,
        bucket: &str,
        public_base_url: &str,
    ) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let store = LocalFileSystem::new_with_prefix(dir)?;
        debug!("Initialized local evidence storage at: {:?}", dir);

        let mut bucket_store = Self::new(Arc::new(store), bucket, public_base_url);
        bucket_store.supports_attributes = false;
        Ok(bucket_store)
    }

    /// Process-local store, contents lost on exit
    pub fn in_memory(bucket: &str) -> Self {
        Self::new(
            Arc::new(InMemory::new()),
            bucket,
            "https://storage.googleapis.com",
        )
    }

    /// Publicly reachable URL of an object in this bucket
    pub fn public_url(&self, object_name: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, object_name)
    }

    /// Underlying object store, for inspection
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// Calculate MD5 checksum
    fn calculate_checksum(data: &[u8]) -> String {
        let digest = md5::compute(data);
        hex::encode(digest.0)
    }
}

#[async_trait]
impl EvidenceStore for BucketStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, bytes = data.len()))]
    async fn put_evidence(
        &self,
        object_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let timer = MonotonicTimer::new();
        let path = Path::from(object_name);
        let size = data.len();
        let checksum = Self::calculate_checksum(&data);

        let mut opts = PutOptions::default();
        if self.supports_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            opts.attributes = attributes;
        }

        let result = self
            .store
            .put_opts(&path, PutPayload::from(data), opts)
            .await?;

        info!(
            object = %object_name,
            bytes = size,
            checksum = %checksum,
            elapsed_ms = timer.elapsed_ms(),
            "Stored evidence object"
        );

        Ok(StoredObject {
            name: object_name.to_string(),
            url: self.public_url(object_name),
            size,
            etag: result.e_tag,
            checksum,
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete_evidence(&self, object_name: &str) -> Result<(), StorageError> {
        self.store.delete(&Path::from(object_name)).await?;
        info!(object = %object_name, "Deleted evidence object");
        Ok(())
    }
}
