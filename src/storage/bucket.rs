//! Object store bucket access (GCS, S3, R2, Azure, local)

use super::source::ObjectSource;
use super::validate::validate_blob_name;
use crate::error::{Error, Result};
use crate::retry::{with_retry, RetryPolicy};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode, PutOptions};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, info};

/// Async reader over a streamed object body
type ObjectReader = StreamReader<BoxStream<'static, std::io::Result<Bytes>>, Bytes>;

/// One object listed from the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    /// Object name relative to the bucket root
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
}

impl ObjectEntry {
    /// Final path segment
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Result of a single upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Full object URI
    pub uri: String,
    /// Bytes written
    pub bytes: u64,
    /// Throughput in MB/s
    pub mb_per_sec: f64,
}

/// Storage bucket parsed from URL
#[derive(Debug, Clone)]
pub struct StorageBucket {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Bucket, container or local directory
    root: String,
    /// Base path prefix within the bucket
    prefix: String,
    /// Original URL scheme for logging
    scheme: String,
    /// Retry behavior for network calls
    retry: RetryPolicy,
}

impl StorageBucket {
    /// Parse a bucket URL and create appropriate object store
    ///
    /// Supported formats:
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `az://container/path/` - Azure Blob Storage
    /// - `/local/path/` or `./path/` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else if url.starts_with("s3://") {
            Self::parse_s3(url, false)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true)
        } else if url.starts_with("az://") {
            Self::parse_azure(url)
        } else {
            Self::parse_local(url)
        }
    }

    /// Bucket for a bare GCS bucket name, or any URL accepted by [`Self::parse`]
    pub fn for_bucket(bucket: &str) -> Result<Self> {
        if bucket.contains("://") || bucket.starts_with('/') || bucket.starts_with('.') {
            Self::parse(bucket)
        } else {
            Self::parse(&format!("gs://{bucket}"))
        }
    }

    fn split_url<'a>(url: &'a str, scheme: &str) -> Result<(&'a str, String)> {
        let without_scheme = url
            .strip_prefix(&format!("{scheme}://"))
            .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].trim_end_matches('/').to_string(),
            ),
            None => (without_scheme, String::new()),
        };

        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket name in URL: {url}")));
        }
        Ok((bucket, prefix))
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let (bucket, prefix) = Self::split_url(url, "gs")?;

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self::from_store(Arc::new(store), bucket, prefix, "gs"))
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let (bucket, prefix) = Self::split_url(url, scheme)?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self::from_store(Arc::new(store), bucket, prefix, scheme))
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let (container, prefix) = Self::split_url(url, "az")?;

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self::from_store(Arc::new(store), container, prefix, "az"))
    }

    /// Parse local filesystem path
    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        let root = std::fs::canonicalize(path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.to_string());

        let bucket = Self::from_store(Arc::new(store), &root, String::new(), "file");
        Ok(bucket.with_retry(RetryPolicy::none()))
    }

    /// Wrap an existing object store
    pub fn from_store(
        store: Arc<dyn ObjectStore>,
        root: &str,
        prefix: String,
        scheme: &str,
    ) -> Self {
        Self {
            store,
            root: root.trim_end_matches('/').to_string(),
            prefix,
            scheme: scheme.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check if this is a cloud bucket (not local)
    pub fn is_cloud(&self) -> bool {
        self.scheme != "file"
    }

    /// Get the scheme (gs, s3, r2, az, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Bucket name or local root directory
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Full object path including the bucket prefix
    fn object_path(&self, name: &str) -> ObjectPath {
        let name = name.trim_start_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(name)
        } else if name.is_empty() {
            ObjectPath::from(self.prefix.as_str())
        } else {
            ObjectPath::from(format!("{}/{name}", self.prefix))
        }
    }

    /// Strip the bucket prefix from a listed path
    fn relative_name(&self, path: &ObjectPath) -> String {
        let full = path.as_ref();
        if self.prefix.is_empty() {
            full.to_string()
        } else {
            full.strip_prefix(&format!("{}/", self.prefix))
                .unwrap_or(full)
                .to_string()
        }
    }

    /// Full URI for an object, as external tables reference it
    ///
    /// `gs://bucket/prefix/name` for cloud buckets, an absolute path for local ones.
    pub fn uri(&self, name: &str) -> String {
        let path = self.object_path(name);
        if self.is_cloud() {
            format!("{}://{}/{path}", self.scheme, self.root)
        } else {
            format!("{}/{path}", self.root)
        }
    }

    /// List all objects under `prefix`, sorted by path
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectEntry>> {
        let base = match prefix {
            Some(p) if !p.trim_matches('/').is_empty() => {
                Some(self.object_path(p.trim_end_matches('/')))
            }
            _ if !self.prefix.is_empty() => Some(ObjectPath::from(self.prefix.as_str())),
            _ => None,
        };

        let metas: Vec<object_store::ObjectMeta> = with_retry("list", &self.retry, || {
            self.store.list(base.as_ref()).try_collect::<Vec<_>>()
        })
        .await?;

        let mut entries: Vec<ObjectEntry> = metas
            .into_iter()
            .map(|meta| ObjectEntry {
                path: self.relative_name(&meta.location),
                size: meta.size as u64,
                last_modified: meta.last_modified,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("Listed {} objects under {:?}", entries.len(), prefix);
        Ok(entries)
    }

    /// File names (last path segment) of all objects under `prefix`
    pub async fn list_file_names(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        Ok(self
            .list(prefix)
            .await?
            .iter()
            .map(|e| e.file_name().to_string())
            .collect())
    }

    /// Check if an object exists
    pub async fn exists(&self, name: &str) -> Result<bool> {
        validate_blob_name(name)?;
        let path = self.object_path(name);
        match with_retry("head", &self.retry, || self.store.head(&path)).await {
            Ok(_) => Ok(true),
            Err(Error::ObjectStore(object_store::Error::NotFound { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Upload a local file, failing if the object already exists
    pub async fn upload_file(&self, local: &Path, name: &str) -> Result<UploadOutcome> {
        validate_blob_name(name)?;
        let path = self.object_path(name);

        let data = Bytes::from(tokio::fs::read(local).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: local.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?);
        let size = data.len() as u64;

        let start = Instant::now();
        let result = with_retry("upload", &self.retry, || {
            let opts = PutOptions {
                mode: PutMode::Create,
                ..PutOptions::default()
            };
            self.store.put_opts(&path, data.clone().into(), opts)
        })
        .await;

        match result {
            Ok(_) => {}
            Err(Error::ObjectStore(object_store::Error::AlreadyExists { .. })) => {
                return Err(Error::AlreadyExists {
                    path: self.uri(name),
                });
            }
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);
        let mb = size as f64 / (1024.0 * 1024.0);
        let outcome = UploadOutcome {
            uri: self.uri(name),
            bytes: size,
            mb_per_sec: mb / elapsed,
        };
        info!(
            "Uploaded {} ({:.2} MB) in {:.2}s at {:.2} MB/s",
            outcome.uri, mb, elapsed, outcome.mb_per_sec
        );
        Ok(outcome)
    }

    /// Write bytes to an object, overwriting any existing one
    pub async fn write(&self, name: &str, data: Bytes) -> Result<String> {
        validate_blob_name(name)?;
        let path = self.object_path(name);
        with_retry("write", &self.retry, || {
            self.store.put(&path, data.clone().into())
        })
        .await?;
        Ok(self.uri(name))
    }

    /// Open an object as an async byte stream
    async fn open_stream(&self, name: &str) -> Result<ObjectReader> {
        validate_blob_name(name)?;
        let path = self.object_path(name);
        let result = match with_retry("get", &self.retry, || self.store.get(&path)).await {
            Ok(result) => result,
            Err(Error::ObjectStore(object_store::Error::NotFound { .. })) => {
                return Err(Error::ObjectNotFound {
                    path: self.uri(name),
                });
            }
            Err(e) => return Err(e),
        };
        let stream = result
            .into_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .boxed();
        Ok(StreamReader::new(stream))
    }
}

impl ObjectSource for StorageBucket {
    /// Stream an object through a blocking reader
    ///
    /// Must be called from a blocking context inside a Tokio runtime, e.g.
    /// `tokio::task::spawn_blocking`.
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        let handle = Handle::try_current()
            .map_err(|e| Error::config(format!("No async runtime for object reads: {e}")))?;
        let reader = handle.block_on(self.open_stream(location))?;
        Ok(Box::new(SyncIoBridge::new_with_handle(reader, handle)))
    }
}
