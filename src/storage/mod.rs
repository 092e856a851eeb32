use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::compose::{EditRequest, ImagePayload, PayloadRole, PixelFormat};

const MANIFEST_FILE: &str = "request.json";
const INSTRUCTION_FILE: &str = "instruction.txt";
const MASK_FILE: &str = "mask.png";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request id is empty")]
    MissingRequestId,
    #[error("request id {0:?} must be a single path component")]
    InvalidRequestId(String),
    #[error("payload is not a mask")]
    NotAMask,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize request manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    file: String,
    role: PayloadRole,
    format: PixelFormat,
    width: u32,
    height: u32,
    media_type: &'a str,
}

#[derive(Debug, Serialize)]
struct RequestManifest<'a> {
    instruction: &'a str,
    images: Vec<ManifestEntry<'a>>,
}

/// Writes composed edit requests to disk, one directory per request.
#[derive(Debug, Clone)]
pub struct RequestStorage {
    root_dir: PathBuf,
}

impl RequestStorage {
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn validate_request_id(request_id: &str) -> StorageResult<()> {
        if request_id.is_empty() {
            return Err(StorageError::MissingRequestId);
        }
        if request_id == "."
            || request_id == ".."
            || request_id.contains(['/', '\\'])
            || Path::new(request_id).is_absolute()
        {
            return Err(StorageError::InvalidRequestId(request_id.to_string()));
        }
        Ok(())
    }

    pub fn request_dir(&self, request_id: &str) -> StorageResult<PathBuf> {
        Self::validate_request_id(request_id)?;
        Ok(self.root_dir.join(request_id))
    }

    /// Writes every payload as `NN_role.png` in request order, plus the instruction and a
    /// JSON manifest. Existing files with the same names are overwritten.
    pub fn write_request(
        &self,
        request_id: &str,
        request: &EditRequest,
    ) -> StorageResult<PathBuf> {
        let dir = self.request_dir(request_id)?;
        fs::create_dir_all(&dir)?;

        let mut images = Vec::with_capacity(request.images().len());
        for (index, payload) in request.images().iter().enumerate() {
            let file = payload_file_name(index, payload.role);
            fs::write(dir.join(&file), &payload.bytes)?;
            images.push(ManifestEntry {
                file,
                role: payload.role,
                format: payload.format,
                width: payload.width,
                height: payload.height,
                media_type: payload.media_type,
            });
        }

        fs::write(dir.join(INSTRUCTION_FILE), request.instruction())?;
        let manifest = RequestManifest {
            instruction: request.instruction(),
            images,
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        tracing::info!(
            path = %dir.display(),
            images = request.images().len(),
            "wrote edit request"
        );
        Ok(dir)
    }

    /// Writes a mask payload as `mask.png`.
    pub fn write_mask(&self, request_id: &str, mask: &ImagePayload) -> StorageResult<PathBuf> {
        if mask.role != PayloadRole::Mask {
            return Err(StorageError::NotAMask);
        }
        let dir = self.request_dir(request_id)?;
        fs::create_dir_all(&dir)?;
        let path = dir.join(MASK_FILE);
        fs::write(&path, &mask.bytes)?;
        tracing::info!(path = %path.display(), "wrote mask");
        Ok(path)
    }
}

fn payload_file_name(index: usize, role: PayloadRole) -> String {
    format!("{index:02}_{}.png", role.label())
}
