//! Data types for the transfer flow.

use std::path::PathBuf;

use thunderdrive_api::Entry;

use crate::folders::FolderRef;

/// A remote file to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Display name; also the local file name.
    pub name: String,
    /// Content hash used to address the download.
    pub hash: String,
    /// Declared size in bytes (0 when unknown).
    pub size: u64,
}

impl From<&Entry> for RemoteFile {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            hash: entry.hash.clone(),
            size: entry.file_size.unwrap_or(0),
        }
    }
}

/// One file to move, fixed once handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferTask {
    Upload {
        local_path: PathBuf,
        folder: FolderRef,
    },
    Download {
        file: RemoteFile,
        dest_dir: PathBuf,
    },
}

impl TransferTask {
    /// Short human label used in logs and batch reports.
    pub fn label(&self) -> String {
        match self {
            Self::Upload { local_path, .. } => local_path.display().to_string(),
            Self::Download { file, .. } => file.name.clone(),
        }
    }
}
