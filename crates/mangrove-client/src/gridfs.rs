//! GridFS send/save helpers.
//!
//! [`GridFs`] layers two conveniences over the driver's bucket API:
//!
//! - [`save`](GridFs::save) computes a SHA-1 checksum while streaming the
//!   content into the bucket and records it under `metadata.sha1`, since
//!   the store does not maintain a trustworthy checksum of its own.
//! - [`send_by_name`](GridFs::send_by_name) / [`send_by_id`](GridFs::send_by_id)
//!   build a cacheable HTTP response: `ETag` from the recorded checksum
//!   (computed from content for legacy documents that lack one),
//!   `Last-Modified`, `Cache-Control`, and a 304 reply on a matching
//!   `If-None-Match`.
//!
//! Revision selection follows the files-collection convention: version
//! `n >= 0` is the nth oldest upload of a filename, `-1` the newest, `-2`
//! the one before it, and so on.

use bson::{doc, Document};
use bytes::Bytes;
use futures_util::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use futures_util::TryStreamExt;
use http::{header, HeaderMap, StatusCode};
use mangrove_bson::Oid;
use mangrove_core::{MangroveError, MangroveResult};
use mongodb::gridfs::{FilesCollectionDocument, GridFsBucket};
use mongodb::options::GridFsBucketOptions;
use mongodb::{Collection, Database};
use sha1::{Digest, Sha1};
use std::time::SystemTime;

/// Axum response type produced by the send helpers.
pub type FileResponse = axum::response::Response;

/// Options for [`GridFs::save`].
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    content_type: Option<String>,
    metadata: Option<Document>,
}

impl SaveOptions {
    /// Sets the MIME content type explicitly.
    ///
    /// Without this, the type is inferred from the filename.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attaches arbitrary key-value properties to the stored file document.
    #[must_use]
    pub fn metadata(mut self, metadata: Document) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Options for [`GridFs::send_by_name`] and [`GridFs::send_by_id`].
#[derive(Debug, Clone)]
pub struct SendOptions {
    version: i64,
    cache_for: u32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            version: -1,
            cache_for: 31_536_000,
        }
    }
}

impl SendOptions {
    /// Selects a file revision (nth oldest if `>= 0`, nth newest if negative).
    #[must_use]
    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Sets how many seconds clients should cache the response.
    #[must_use]
    pub fn cache_for(mut self, seconds: u32) -> Self {
        self.cache_for = seconds;
        self
    }
}

/// Helper over one GridFS bucket of one database.
#[derive(Clone)]
pub struct GridFs {
    bucket: GridFsBucket,
    files: Collection<FilesCollectionDocument>,
    bucket_name: String,
}

impl std::fmt::Debug for GridFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridFs")
            .field("bucket", &self.bucket_name)
            .finish()
    }
}

impl GridFs {
    /// The conventional default bucket name.
    pub const DEFAULT_BUCKET: &'static str = "fs";

    /// Creates a helper for the named bucket of `db`.
    #[must_use]
    pub fn new(db: &Database, base: &str) -> Self {
        let bucket = db.gridfs_bucket(
            GridFsBucketOptions::builder()
                .bucket_name(base.to_string())
                .build(),
        );
        let files = db.collection(&format!("{base}.files"));
        Self {
            bucket,
            files,
            bucket_name: base.to_string(),
        }
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Streams `reader` into the bucket under `filename`.
    ///
    /// The content type is taken from the options, an existing
    /// `contentType` metadata entry, or inferred from the filename. A
    /// SHA-1 of the content is computed during the upload and recorded as
    /// `metadata.sha1` for later cache validation.
    ///
    /// # Errors
    ///
    /// Returns driver or I/O errors from the upload; they propagate to the
    /// host framework's error handling.
    pub async fn save<R>(
        &self,
        filename: &str,
        mut reader: R,
        options: SaveOptions,
    ) -> MangroveResult<Oid>
    where
        R: AsyncRead + Unpin,
    {
        let mut metadata = options.metadata.unwrap_or_default();
        if !metadata.contains_key("contentType") {
            let content_type = options
                .content_type
                .or_else(|| guess_content_type(filename));
            if let Some(content_type) = content_type {
                metadata.insert("contentType", content_type);
            }
        }

        let mut upload = self
            .bucket
            .open_upload_stream(filename)
            .metadata(metadata)
            .await?;
        let id = upload.id().clone();

        let mut hasher = Sha1::new();
        let mut buf = [0u8; 64 * 1024];
        let mut written = 0u64;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            upload.write_all(&buf[..n]).await?;
            written += n as u64;
        }
        upload.close().await?;

        let checksum = hex::encode(hasher.finalize());
        // The bucket fixes metadata at open time, so the checksum lands in
        // a follow-up update on the files document.
        self.files
            .update_one(
                doc! {"_id": id.clone()},
                doc! {"$set": {"metadata.sha1": &checksum}},
            )
            .await?;

        tracing::debug!(filename, bytes = written, %checksum, "stored GridFS file");

        id.as_object_id().map(Oid::from).ok_or_else(|| {
            MangroveError::config("GridFS produced a non-ObjectId file id")
        })
    }

    /// Saves an in-memory byte slice (see [`save`](Self::save)).
    ///
    /// # Errors
    ///
    /// Same as [`save`](Self::save).
    pub async fn save_bytes(
        &self,
        filename: &str,
        bytes: &[u8],
        options: SaveOptions,
    ) -> MangroveResult<Oid> {
        self.save(filename, bytes, options).await
    }

    /// Responds with the named file.
    ///
    /// # Errors
    ///
    /// Returns the not-found error when no matching file or revision
    /// exists in the bucket; driver errors propagate.
    pub async fn send_by_name(
        &self,
        filename: &str,
        request_headers: &HeaderMap,
        options: SendOptions,
    ) -> MangroveResult<FileResponse> {
        let file = self.find_by_name(filename, options.version).await?;
        self.send(file, request_headers, options.cache_for).await
    }

    /// Responds with the file stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns the not-found error when no file has that id; driver errors
    /// propagate.
    pub async fn send_by_id(
        &self,
        id: Oid,
        request_headers: &HeaderMap,
        options: SendOptions,
    ) -> MangroveResult<FileResponse> {
        let file = self
            .files
            .find_one(doc! {"_id": id})
            .await?
            .ok_or_else(|| MangroveError::not_found("file"))?;
        self.send(file, request_headers, options.cache_for).await
    }

    async fn find_by_name(
        &self,
        filename: &str,
        version: i64,
    ) -> MangroveResult<FilesCollectionDocument> {
        let (sort, skip) = if version >= 0 {
            (doc! {"uploadDate": 1}, version.unsigned_abs())
        } else {
            (doc! {"uploadDate": -1}, (-(version + 1)).unsigned_abs())
        };

        let mut cursor = self
            .files
            .find(doc! {"filename": filename})
            .sort(sort)
            .skip(skip)
            .limit(1)
            .await?;

        cursor
            .try_next()
            .await?
            .ok_or_else(|| MangroveError::not_found("file"))
    }

    async fn send(
        &self,
        file: FilesCollectionDocument,
        request_headers: &HeaderMap,
        cache_for: u32,
    ) -> MangroveResult<FileResponse> {
        let head = FileHead::from_document(&file);
        let if_none_match = request_headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());

        // A recorded checksum lets the 304 short-circuit skip the download.
        if let Some(checksum) = &head.checksum {
            let etag = quote_etag(checksum);
            if etag_matches(if_none_match, &etag) {
                return Ok(not_modified_response(&etag, cache_for));
            }
            let bytes = self.download(file.id.clone()).await?;
            return Ok(file_response(&head, bytes, &etag, cache_for));
        }

        // Legacy document without a recorded checksum: derive it from content.
        let bytes = self.download(file.id.clone()).await?;
        let etag = quote_etag(&hex::encode(Sha1::digest(&bytes)));
        if etag_matches(if_none_match, &etag) {
            return Ok(not_modified_response(&etag, cache_for));
        }
        Ok(file_response(&head, bytes, &etag, cache_for))
    }

    async fn download(&self, id: bson::Bson) -> MangroveResult<Vec<u8>> {
        let mut stream = self.bucket.open_download_stream(id).await?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        Ok(bytes)
    }
}

/// Cache-relevant fields of a stored file document.
#[derive(Debug, Clone)]
struct FileHead {
    filename: Option<String>,
    content_type: Option<String>,
    upload_date: SystemTime,
    checksum: Option<String>,
}

impl FileHead {
    fn from_document(file: &FilesCollectionDocument) -> Self {
        let metadata = file.metadata.as_ref();
        Self {
            filename: file.filename.clone(),
            content_type: metadata
                .and_then(|m| m.get_str("contentType").ok())
                .map(str::to_string),
            upload_date: file.upload_date.to_system_time(),
            checksum: metadata
                .and_then(|m| m.get_str("sha1").ok())
                .map(str::to_string),
        }
    }

    fn resolved_content_type(&self) -> String {
        self.content_type
            .clone()
            .or_else(|| self.filename.as_deref().and_then(guess_content_type))
            .unwrap_or_else(|| mime_guess::mime::APPLICATION_OCTET_STREAM.to_string())
    }
}

fn guess_content_type(filename: &str) -> Option<String> {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.to_string())
}

fn quote_etag(checksum: &str) -> String {
    format!("\"{checksum}\"")
}

fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    let Some(header_value) = if_none_match else {
        return false;
    };
    header_value == "*"
        || header_value
            .split(',')
            .any(|candidate| candidate.trim() == etag)
}

fn not_modified_response(etag: &str, cache_for: u32) -> FileResponse {
    http::Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, format!("max-age={cache_for}"))
        .body(axum::body::Body::empty())
        .expect("failed to build response")
}

fn file_response(head: &FileHead, bytes: Vec<u8>, etag: &str, cache_for: u32) -> FileResponse {
    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, head.resolved_content_type())
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, format!("max-age={cache_for}"))
        .header(
            header::LAST_MODIFIED,
            httpdate::fmt_http_date(head.upload_date),
        )
        .body(axum::body::Body::from(Bytes::from(bytes)))
        .expect("failed to build response")
}
