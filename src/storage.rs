//! Object-storage boundary: a narrow async trait the pipeline uploads
//! through, plus the S3 implementation and the per-file upload wrapper.
//!
//! Every failure at this boundary is converted into a typed value the
//! orchestrator can branch on; nothing here raises past the trait.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use object_store::aws::AmazonS3Builder;
use object_store::{Attribute, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload};

/// Kind of storage failure, for branching and log verbosity. Replaces
/// exception-type inspection with one explicit enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    NotFound,
    PermissionDenied,
    Transport,
    Timeout,
    LocalIo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for StorageError {}

impl From<object_store::Error> for StorageError {
    fn from(e: object_store::Error) -> Self {
        let kind = match &e {
            object_store::Error::NotFound { .. } => StorageErrorKind::NotFound,
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => StorageErrorKind::PermissionDenied,
            _ => StorageErrorKind::Transport,
        };
        StorageError::new(kind, e.to_string())
    }
}

/// A single object to upload: key, body and object attributes.
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Destination object key (the local file's base name).
    pub key: String,
    /// Raw file body.
    pub body: Vec<u8>,
    /// MIME type recorded on the object.
    pub content_type: String,
    /// Custom object metadata attached to the upload.
    pub metadata: BTreeMap<String, String>,
}

/// Narrow interface the pipeline requires of an object-storage client.
///
/// Implemented by [`S3Store`] for production and by the generated
/// `MockObjectStorage` in tests.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Verify the configured bucket exists and is reachable. Must be called
    /// once before any upload; failure is a fatal startup condition.
    async fn verify_bucket(&self) -> Result<(), StorageError>;

    /// Create or overwrite one remote object.
    async fn put(&self, req: PutRequest) -> Result<(), StorageError>;
}

/// Production store backed by S3 via the `object_store` crate.
pub struct S3Store {
    bucket_name: String,
    inner: Arc<dyn ObjectStore>,
}

impl S3Store {
    /// Builds a client for `bucket_name` from the ambient AWS environment
    /// (env vars, config files, instance profile). Bounded connect and
    /// request timeouts so no call can hang a run.
    pub fn from_env(bucket_name: &str) -> anyhow::Result<Self> {
        info!(bucket = %bucket_name, "Creating S3 client");
        let client_options = ClientOptions::new()
            .with_connect_timeout(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(60));
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket_name)
            .with_client_options(client_options)
            .build()?;
        Ok(Self {
            bucket_name: bucket_name.to_string(),
            inner: Arc::new(store),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Store {
    async fn verify_bucket(&self) -> Result<(), StorageError> {
        // The client is scoped to one bucket, so existence is checked by
        // probing it rather than enumerating the account's buckets.
        match self.inner.list_with_delimiter(None).await {
            Ok(_) => {
                info!(bucket = %self.bucket_name, "Bucket verified");
                Ok(())
            }
            Err(e) => {
                error!(bucket = %self.bucket_name, error = %e, "Bucket verification failed");
                Err(StorageError::from(e))
            }
        }
    }

    async fn put(&self, req: PutRequest) -> Result<(), StorageError> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, req.content_type.clone().into());
        for (key, value) in &req.metadata {
            attributes.insert(Attribute::Metadata(key.clone().into()), value.clone().into());
        }
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };
        let path = object_store::path::Path::from(req.key.as_str());
        self.inner
            .put_opts(&path, PutPayload::from(req.body), opts)
            .await
            .map(|_| ())
            .map_err(StorageError::from)
    }
}

/// Result of one upload attempt; consumed immediately by relocation.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_path: PathBuf,
    pub succeeded: bool,
    pub error: Option<StorageError>,
}

impl UploadOutcome {
    fn success(file_path: PathBuf) -> Self {
        Self {
            file_path,
            succeeded: true,
            error: None,
        }
    }

    fn failure(file_path: PathBuf, error: StorageError) -> Self {
        Self {
            file_path,
            succeeded: false,
            error: Some(error),
        }
    }
}

/// Uploads one local file as a JSON object, bounded by `timeout`.
///
/// Every failure mode (local read, transport, timeout) comes back as a
/// failed [`UploadOutcome`]; the caller always receives a value to branch on.
pub async fn upload_file(
    store: &dyn ObjectStorage,
    path: &Path,
    object_metadata: BTreeMap<String, String>,
    timeout: Duration,
) -> UploadOutcome {
    let key = match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => {
            return UploadOutcome::failure(
                path.to_path_buf(),
                StorageError::new(StorageErrorKind::LocalIo, "path has no file name"),
            )
        }
    };

    let body = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(file = %path.display(), error = %e, "Failed to read file for upload");
            return UploadOutcome::failure(
                path.to_path_buf(),
                StorageError::new(StorageErrorKind::LocalIo, e.to_string()),
            );
        }
    };

    debug!(file = %path.display(), key = %key, size = body.len(), "Uploading file");
    let req = PutRequest {
        key: key.clone(),
        body,
        content_type: "application/json".to_string(),
        metadata: object_metadata,
    };

    match tokio::time::timeout(timeout, store.put(req)).await {
        Ok(Ok(())) => {
            info!(file = %path.display(), key = %key, "Successfully uploaded file");
            UploadOutcome::success(path.to_path_buf())
        }
        Ok(Err(e)) => {
            error!(file = %path.display(), key = %key, error = %e, "Failed to upload file");
            UploadOutcome::failure(path.to_path_buf(), e)
        }
        Err(_) => {
            error!(file = %path.display(), key = %key, timeout = ?timeout, "Upload timed out");
            UploadOutcome::failure(
                path.to_path_buf(),
                StorageError::new(
                    StorageErrorKind::Timeout,
                    format!("upload exceeded {timeout:?}"),
                ),
            )
        }
    }
}

/// Fields of the metadata document carried over as object metadata on the
/// content upload.
const OBJECT_METADATA_FIELDS: [&str; 8] = [
    "library_uuid",
    "min_mtp_version",
    "latest_version",
    "version_history",
    "name",
    "description",
    "type",
    "library_type",
];

/// Projects a metadata document onto the object-metadata fields attached to
/// the content upload. Absent or null fields are omitted; values are
/// compact-JSON encoded, with newlines stripped from descriptions.
pub fn project_object_metadata(document: &serde_json::Value) -> BTreeMap<String, String> {
    let mut projected = BTreeMap::new();
    let Some(map) = document.as_object() else {
        return projected;
    };
    for field in OBJECT_METADATA_FIELDS {
        let Some(value) = map.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let encoded = if field == "description" {
            match value.as_str() {
                Some(s) => serde_json::Value::String(s.replace('\n', "")).to_string(),
                None => value.to_string(),
            }
        } else {
            value.to_string()
        };
        projected.insert(field.to_string(), encoded);
    }
    projected
}
