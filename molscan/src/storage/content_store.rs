use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{MolscanError, Result};
use crate::models::Image;

/// Number of digest bytes kept in a content id (10 hex characters).
///
/// Short ids keep URLs readable. At this width collisions become plausible
/// after roughly a million distinct images; ids are not a security boundary.
pub const DIGEST_BYTES: usize = 5;

const BLOB_EXTENSION: &str = "image";
const METADATA_EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content address for a byte sequence: truncated SHA-256, lowercase hex.
pub fn content_id(bytes: &[u8]) -> String {
    Sha256::digest(bytes)[..DIGEST_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Whether `id` has the shape of a content id. Anything else is never looked
/// up on disk.
pub fn is_content_id(id: &str) -> bool {
    id.len() == DIGEST_BYTES * 2
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMetadata {
    id: String,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    size: u64,
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(work_dir = %root.display(), "Content store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{BLOB_EXTENSION}"))
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{METADATA_EXTENSION}"))
    }

    /// Persist `bytes` under their content id.
    ///
    /// If the metadata already exists it is not rewritten: the first writer's
    /// media type and encoding win and are what the returned image carries.
    pub async fn store(
        &self,
        bytes: Vec<u8>,
        media_type: Option<String>,
        encoding: Option<String>,
    ) -> Result<Image> {
        let id = content_id(&bytes);

        let blob_path = self.blob_path(&id);
        let metadata_path = self.metadata_path(&id);
        let blob_exists = path_exists(&blob_path).await;
        let metadata_exists = path_exists(&metadata_path).await;

        // Blob before metadata: fetch requires both, so a crash in between
        // leaves nothing retrievable and the next store repairs it.
        if !blob_exists {
            self.write_atomically(&blob_path, &bytes).await?;
        }
        if metadata_exists {
            let record = self.read_metadata(&id).await?;
            debug!(id = %id, repaired_blob = !blob_exists, "Image already stored");
            return Ok(Image::new(record.id, record.media_type, record.encoding).with_bytes(bytes));
        }

        let record = StoredMetadata {
            id: id.clone(),
            media_type,
            encoding,
            size: bytes.len() as u64,
        };
        let json = serde_json::to_vec(&record)?;
        self.write_atomically(&metadata_path, &json).await?;

        debug!(id = %id, size = bytes.len(), path = %blob_path.display(), "Stored image");
        Ok(Image::new(record.id, record.media_type, record.encoding).with_bytes(bytes))
    }

    /// Write to a unique temporary sibling, then rename into place.
    async fn write_atomically(&self, target: &Path, contents: &[u8]) -> Result<()> {
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MolscanError::Internal(format!("Bad store path: {}", target.display())))?;
        let temp = self
            .root
            .join(format!(".{file_name}.{}.{seq}.tmp", std::process::id()));

        if let Err(e) = tokio::fs::write(&temp, contents).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Load an image, bytes included.
    ///
    /// Missing metadata or a missing blob both report `NotFound`.
    pub async fn fetch(&self, id: &str) -> Result<Image> {
        let record = self.read_metadata(id).await?;
        let bytes = match tokio::fs::read(self.blob_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_found(id));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Image::new(record.id, record.media_type, record.encoding).with_bytes(bytes))
    }

    /// Path of the blob for workers that read from the filesystem.
    pub async fn locate(&self, id: &str) -> Result<PathBuf> {
        if !is_content_id(id) {
            return Err(not_found(id));
        }
        let blob = self.blob_path(id);
        if path_exists(&blob).await && path_exists(&self.metadata_path(id)).await {
            Ok(blob)
        } else {
            Err(not_found(id))
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.locate(id).await.is_ok()
    }

    async fn read_metadata(&self, id: &str) -> Result<StoredMetadata> {
        if !is_content_id(id) {
            return Err(not_found(id));
        }
        let raw = match tokio::fs::read(self.metadata_path(id)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_found(id));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }
}

fn not_found(id: &str) -> MolscanError {
    MolscanError::NotFound(format!("Unknown image: {id}"))
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
