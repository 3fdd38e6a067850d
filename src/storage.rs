//! Secure file storage for photo uploads.
//!
//! Uploaded bytes are validated (size, filename, sniffed content type),
//! stored under a fresh UUID-based key, and thumbnailed best-effort. Nothing
//! the client declares (filename, MIME type, extension) is trusted for a
//! validation or storage decision; the claimed filename only contributes a
//! cosmetic extension and a display name.
//!
//! Both storage roots must live outside any publicly served directory, and
//! key resolution never lets a crafted key escape them.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

pub mod sniff;

/// Maximum accepted upload size: 10 MiB. A payload of exactly this size is
/// accepted; one byte more is rejected.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Thumbnails fit a 300x300 bounding box, aspect ratio preserved.
const THUMBNAIL_MAX_DIM: u32 = 300;

/// Thumbnail keys are the original key with this prefix, in a separate root.
const THUMBNAIL_PREFIX: &str = "thumb_";

/// Upload pipeline failure taxonomy.
///
/// `Validation`-class variants are user-correctable and surface as 400s;
/// `Storage` is an I/O failure the user cannot fix and is shown only as a
/// generic retry message (the real error is logged server-side).
#[derive(Debug)]
pub enum UploadError {
    EmptyFile,
    FileTooLarge,
    InvalidFilename,
    DisallowedType,
    Storage(std::io::Error),
}

impl UploadError {
    /// Whether the error is correctable by the caller (vs. a server fault).
    pub fn is_validation(&self) -> bool {
        !matches!(self, UploadError::Storage(_))
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::EmptyFile => write!(f, "The file is empty or missing"),
            UploadError::FileTooLarge => write!(
                f,
                "The file exceeds the maximum allowed size ({} MB)",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            ),
            UploadError::InvalidFilename => write!(f, "Invalid filename"),
            UploadError::DisallowedType => write!(
                f,
                "File type not allowed. Accepted types: JPEG, PNG, GIF, WebP"
            ),
            UploadError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Storage(e)
    }
}

/// Descriptor returned by a successful store operation.
///
/// `thumbnail_key` equals `storage_key` when thumbnail derivation failed and
/// the original stands in for its own thumbnail.
#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub storage_key: String,
    pub thumbnail_key: String,
    pub content_type: &'static str,
    pub original_filename: String,
    pub size_bytes: u64,
}

/// Blob storage over two directories: originals and thumbnails.
#[derive(Debug, Clone)]
pub struct FileStorage {
    photo_root: PathBuf,
    thumbnail_root: PathBuf,
}

impl FileStorage {
    /// Create (if needed) both storage directories.
    pub async fn new(
        photo_root: impl Into<PathBuf>,
        thumbnail_root: impl Into<PathBuf>,
    ) -> std::io::Result<Self> {
        let photo_root = photo_root.into();
        let thumbnail_root = thumbnail_root.into();

        fs::create_dir_all(&photo_root).await?;
        fs::create_dir_all(&thumbnail_root).await?;

        tracing::info!(path = %photo_root.display(), "photo storage initialized");
        tracing::info!(path = %thumbnail_root.display(), "thumbnail storage initialized");

        Ok(FileStorage {
            photo_root,
            thumbnail_root,
        })
    }

    /// Validate and persist an uploaded file, then derive its thumbnail.
    ///
    /// The claimed filename must be present and free of `..`; the claimed
    /// content type is ignored for every decision (only logged when it
    /// disagrees with the sniffed type). The detected type must be on the
    /// JPEG/PNG/GIF/WebP allow-list.
    ///
    /// Thumbnail failure never fails the upload: the descriptor then carries
    /// the original key as its own thumbnail.
    pub async fn store_photo(
        &self,
        bytes: &[u8],
        claimed_filename: Option<&str>,
        claimed_content_type: Option<&str>,
    ) -> Result<StoredPhoto, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        if bytes.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(UploadError::FileTooLarge);
        }

        let original_filename = match claimed_filename {
            Some(name) if !name.is_empty() && !name.contains("..") => name,
            _ => return Err(UploadError::InvalidFilename),
        };

        let image_type = sniff::detect_image(bytes).ok_or(UploadError::DisallowedType)?;
        let content_type = image_type.mime_type();

        if let Some(claimed) = claimed_content_type {
            if claimed != content_type {
                tracing::debug!(
                    claimed,
                    detected = content_type,
                    "client-declared content type disagrees with sniffed type"
                );
            }
        }

        // Fresh random key per upload; the extension is cosmetic, taken from
        // the claimed name, never used for validation.
        let storage_key = format!(
            "{}{}",
            Uuid::new_v4(),
            file_extension(original_filename)
        );

        let target = self.photo_root.join(&storage_key);
        fs::write(&target, bytes).await?;

        tracing::info!(
            original = original_filename,
            key = storage_key,
            size = bytes.len(),
            "stored photo"
        );

        let thumbnail_key = self.generate_thumbnail(&target, &storage_key).await;

        Ok(StoredPhoto {
            storage_key,
            thumbnail_key,
            content_type,
            original_filename: original_filename.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Derive a bounded thumbnail for the stored original. Best-effort: any
    /// failure logs a warning and returns the original key as the fallback.
    async fn generate_thumbnail(&self, source: &Path, storage_key: &str) -> String {
        let thumbnail_key = format!("{}{}", THUMBNAIL_PREFIX, storage_key);
        let thumbnail_path = self.thumbnail_root.join(&thumbnail_key);
        let source = source.to_path_buf();

        // Image decoding and resizing are CPU-bound; keep them off the
        // async executor.
        let result = tokio::task::spawn_blocking(move || -> Result<(), image::ImageError> {
            let img = image::open(&source)?;
            let thumb = img.thumbnail(THUMBNAIL_MAX_DIM, THUMBNAIL_MAX_DIM);
            thumb.save(&thumbnail_path)?;
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {
                tracing::info!(key = thumbnail_key, "generated thumbnail");
                thumbnail_key
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    key = storage_key,
                    error = %e,
                    "thumbnail generation failed, falling back to original"
                );
                storage_key.to_string()
            }
            Err(e) => {
                tracing::warn!(
                    key = storage_key,
                    error = %e,
                    "thumbnail task panicked, falling back to original"
                );
                storage_key.to_string()
            }
        }
    }

    /// Read an original by key. Traversal attempts and missing files both
    /// come back as `Ok(None)`; only genuine read failures are errors.
    pub async fn load_original(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        let Some(path) = resolve_key(&self.photo_root, key) else {
            return Ok(None);
        };

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a thumbnail by the *original* key. Falls back to the original
    /// bytes when no thumbnail exists (the upload-time fallback case).
    pub async fn load_thumbnail(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        let thumbnail_key = format!("{}{}", THUMBNAIL_PREFIX, key);

        if let Some(path) = resolve_key(&self.thumbnail_root, &thumbnail_key) {
            match fs::read(&path).await {
                Ok(bytes) => return Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        self.load_original(key).await
    }

    /// Remove the original and its thumbnail. Idempotent: returns whether the
    /// original actually existed; a never-created thumbnail is not an error.
    pub async fn delete_photo(&self, key: &str) -> bool {
        let thumbnail_key = format!("{}{}", THUMBNAIL_PREFIX, key);
        let _ = delete_file(&self.thumbnail_root, &thumbnail_key).await;

        let deleted = delete_file(&self.photo_root, key).await;
        if deleted {
            tracing::info!(key, "deleted photo blob");
        }
        deleted
    }
}

/// Resolve a storage key against a root, defending against path traversal.
///
/// A valid key is a single normal path component; anything else (parent-dir
/// sequences, absolute paths, separators) is logged as a security event and
/// treated as not-found so the response is indistinguishable from a missing
/// file.
fn resolve_key(root: &Path, key: &str) -> Option<PathBuf> {
    if key.is_empty() {
        return None;
    }

    let mut components = Path::new(key).components();
    let is_single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();

    if !is_single_normal {
        tracing::warn!(key, "path traversal attempt on storage key");
        return None;
    }

    Some(root.join(key))
}

async fn delete_file(root: &Path, key: &str) -> bool {
    let Some(path) = resolve_key(root, key) else {
        return false;
    };

    match fs::remove_file(&path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::error!(key, error = %e, "failed to delete file");
            false
        }
    }
}

/// Extension of the claimed filename, lowercased, including the dot.
/// Empty when there is none. Display/cosmetic only.
fn file_extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) => filename[idx..].to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    async fn make_storage() -> (TempDir, FileStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("photos"), dir.path().join("thumbnails"))
            .await
            .unwrap();
        (dir, storage)
    }

    /// A genuinely valid PNG, produced by the same codec that decodes it.
    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 30, 200]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    /// Passes the sniffer (GIF signature) but cannot be decoded as an image.
    fn undecodable_gif(total: usize) -> Vec<u8> {
        let mut d = b"GIF89a".to_vec();
        d.resize(total, 0);
        d
    }

    #[tokio::test]
    async fn store_and_load_round_trip() {
        let (_dir, storage) = make_storage().await;
        let bytes = png_bytes(4, 4);

        // Claimed type lies; the sniffed type wins.
        let stored = storage
            .store_photo(&bytes, Some("Photo.PNG"), Some("image/jpeg"))
            .await
            .unwrap();

        assert_eq!(stored.content_type, "image/png");
        assert!(stored.storage_key.ends_with(".png"));
        assert_eq!(stored.original_filename, "Photo.PNG");
        assert_eq!(stored.size_bytes, bytes.len() as u64);

        let loaded = storage.load_original(&stored.storage_key).await.unwrap();
        assert_eq!(loaded, Some(bytes));
    }

    #[tokio::test]
    async fn jpeg_upload_detects_jpeg() {
        let (_dir, storage) = make_storage().await;

        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();

        let stored = storage
            .store_photo(&bytes, Some("shot.jpeg"), Some("application/octet-stream"))
            .await
            .unwrap();

        assert_eq!(stored.content_type, "image/jpeg");
        let loaded = storage.load_original(&stored.storage_key).await.unwrap();
        assert_eq!(loaded, Some(bytes));
    }

    #[tokio::test]
    async fn spoofed_content_type_is_rejected() {
        let (dir, storage) = make_storage().await;

        let err = storage
            .store_photo(b"this is plain text", Some("x.jpg"), Some("image/jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::DisallowedType));
        assert!(err.is_validation());

        // Nothing may be left behind on rejection.
        let mut entries = std::fs::read_dir(dir.path().join("photos")).unwrap();
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn size_boundary_is_inclusive() {
        let (_dir, storage) = make_storage().await;

        let at_limit = undecodable_gif(MAX_UPLOAD_BYTES as usize);
        let stored = storage
            .store_photo(&at_limit, Some("big.gif"), None)
            .await
            .unwrap();
        assert_eq!(stored.content_type, "image/gif");

        let over_limit = undecodable_gif(MAX_UPLOAD_BYTES as usize + 1);
        let err = storage
            .store_photo(&over_limit, Some("big.gif"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge));
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let (_dir, storage) = make_storage().await;
        let err = storage
            .store_photo(&[], Some("empty.png"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::EmptyFile));
    }

    #[tokio::test]
    async fn traversal_filename_is_rejected() {
        let (_dir, storage) = make_storage().await;
        let bytes = png_bytes(2, 2);

        let err = storage
            .store_photo(&bytes, Some("../../../etc/evil.png"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidFilename));

        let err = storage.store_photo(&bytes, None, None).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidFilename));
    }

    #[tokio::test]
    async fn identical_uploads_get_distinct_keys() {
        let (_dir, storage) = make_storage().await;
        let bytes = png_bytes(3, 3);

        let first = storage
            .store_photo(&bytes, Some("same.png"), None)
            .await
            .unwrap();
        let second = storage
            .store_photo(&bytes, Some("same.png"), None)
            .await
            .unwrap();

        assert_ne!(first.storage_key, second.storage_key);
    }

    #[tokio::test]
    async fn thumbnail_is_generated_for_valid_image() {
        let (_dir, storage) = make_storage().await;
        let bytes = png_bytes(600, 400);

        let stored = storage
            .store_photo(&bytes, Some("wide.png"), None)
            .await
            .unwrap();

        assert_eq!(
            stored.thumbnail_key,
            format!("thumb_{}", stored.storage_key)
        );

        let thumb = storage
            .load_thumbnail(&stored.storage_key)
            .await
            .unwrap()
            .expect("thumbnail bytes");
        // The thumbnail is a real resize, not a copy of the original.
        assert_ne!(thumb, bytes);
    }

    #[tokio::test]
    async fn thumbnail_failure_falls_back_to_original() {
        let (_dir, storage) = make_storage().await;
        let bytes = undecodable_gif(128);

        let stored = storage
            .store_photo(&bytes, Some("broken.gif"), None)
            .await
            .unwrap();

        // Upload still succeeded; the original stands in for the thumbnail.
        assert_eq!(stored.thumbnail_key, stored.storage_key);

        let thumb = storage.load_thumbnail(&stored.storage_key).await.unwrap();
        assert_eq!(thumb, Some(bytes));
    }

    #[tokio::test]
    async fn load_defends_against_path_traversal() {
        let (_dir, storage) = make_storage().await;

        assert_eq!(
            storage.load_original("../../etc/passwd").await.unwrap(),
            None
        );
        assert_eq!(storage.load_original("/etc/passwd").await.unwrap(), None);
        assert_eq!(storage.load_original("a/b.png").await.unwrap(), None);
        assert_eq!(storage.load_original("").await.unwrap(), None);
        assert!(!storage.delete_photo("../escape.png").await);
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_reports_existence() {
        let (_dir, storage) = make_storage().await;
        let bytes = png_bytes(5, 5);

        let stored = storage
            .store_photo(&bytes, Some("gone.png"), None)
            .await
            .unwrap();

        assert!(storage.delete_photo(&stored.storage_key).await);
        assert!(!storage.delete_photo(&stored.storage_key).await);
        assert_eq!(
            storage.load_original(&stored.storage_key).await.unwrap(),
            None
        );
        assert_eq!(
            storage.load_thumbnail(&stored.storage_key).await.unwrap(),
            None
        );
    }

    #[test]
    fn extension_extraction() {
        assert_eq!(file_extension("photo.JPG"), ".jpg");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(file_extension(".hidden"), ".hidden");
    }
}
