use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use crate::error::{MinutaError, Result, UploadError};

use super::{BlobStorage, UploadReceipt, PDF_MIME_TYPE};

const DESTINATION_SCHEME: &str = "file://";
const PENDING_SUFFIX: &str = ".upload";

/// Blob storage on the local filesystem.
///
/// Destinations are one-shot: each `request_upload_destination` call
/// reserves a fresh id that accepts exactly one upload.
pub struct FsBlobStore {
    dir: PathBuf,
    pending: Mutex<HashSet<String>>,
    accepted_types: Vec<String>,
}

impl FsBlobStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            pending: Mutex::new(HashSet::new()),
            accepted_types: vec![PDF_MIME_TYPE.to_string()],
        })
    }

    fn blob_path(&self, storage_id: &str) -> Result<PathBuf> {
        // Storage ids are UUIDs; anything else could escape the blob dir
        let id = Uuid::parse_str(storage_id)
            .map_err(|_| MinutaError::Storage(format!("Invalid storage id: {}", storage_id)))?;
        Ok(self.dir.join(format!("{}.pdf", id)))
    }

    fn take_pending(&self, destination: &str) -> std::result::Result<String, UploadError> {
        let name = destination
            .strip_prefix(DESTINATION_SCHEME)
            .map(Path::new)
            .filter(|p| p.parent() == Some(self.dir.as_path()))
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(PENDING_SUFFIX))
            .ok_or_else(|| UploadError::Rejected(format!("unknown destination: {}", destination)))?
            .to_string();

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| UploadError::Transfer("destination registry poisoned".to_string()))?;
        if pending.remove(&name) {
            Ok(name)
        } else {
            Err(UploadError::Rejected(format!(
                "destination already used or expired: {}",
                destination
            )))
        }
    }
}

impl BlobStorage for FsBlobStore {
    fn request_upload_destination(&self) -> std::result::Result<String, UploadError> {
        let id = Uuid::new_v4().to_string();
        let destination = format!(
            "{}{}",
            DESTINATION_SCHEME,
            self.dir.join(format!("{}{}", id, PENDING_SUFFIX)).display()
        );
        self.pending
            .lock()
            .map_err(|_| UploadError::Destination("destination registry poisoned".to_string()))?
            .insert(id);
        Ok(destination)
    }

    fn upload(
        &self,
        destination: &str,
        blob: &[u8],
        content_type: &str,
    ) -> std::result::Result<UploadReceipt, UploadError> {
        if !self.accepted_types.iter().any(|t| t == content_type) {
            return Err(UploadError::Rejected(format!(
                "content type not accepted: {}",
                content_type
            )));
        }
        let storage_id = self.take_pending(destination)?;

        let staging = self.dir.join(format!("{}{}", storage_id, PENDING_SUFFIX));
        let target = self.dir.join(format!("{}.pdf", storage_id));
        fs::write(&staging, blob).map_err(|e| UploadError::Transfer(e.to_string()))?;
        fs::rename(&staging, &target).map_err(|e| {
            let _ = fs::remove_file(&staging);
            UploadError::Transfer(e.to_string())
        })?;

        debug!(storage_id = %storage_id, bytes = blob.len(), "blob stored");
        Ok(UploadReceipt {
            storage_id,
            size: blob.len() as u64,
        })
    }

    fn download_url(&self, storage_id: &str) -> Result<Option<String>> {
        let path = self.blob_path(storage_id)?;
        if path.exists() {
            Ok(Some(format!("{}{}", DESTINATION_SCHEME, path.display())))
        } else {
            Ok(None)
        }
    }

    fn delete(&self, storage_id: &str) -> Result<()> {
        let path = self.blob_path(storage_id)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
