//! Sequential batch driver.
//!
//! Files are moved one at a time, each under its own retry budget. A file
//! that exhausts its retries is logged and recorded; the batch moves on.

use std::path::{Path, PathBuf};

use thunderdrive_api::Entry;
use thunderdrive_transfer::RetryPolicy;
use tracing::{error, info};

use crate::engine::TransferEngine;
use crate::error::DriveError;
use crate::folders::FolderRef;
use crate::types::{RemoteFile, TransferTask};

/// Per-file outcomes of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, DriveError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs many transfers through one engine.
pub struct BatchRunner<'a> {
    engine: TransferEngine<'a>,
    policy: RetryPolicy,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: TransferEngine<'a>, policy: RetryPolicy) -> Self {
        Self { engine, policy }
    }

    /// Runs a single task under the per-file policy, failing fast.
    pub async fn run_one(&self, task: &TransferTask) -> Result<(), DriveError> {
        self.engine.run_with_retry(task, &self.policy).await
    }

    /// Downloads every file entry into `dest_dir`; folders are skipped.
    pub async fn download_all(&self, entries: &[Entry], dest_dir: &Path) -> BatchReport {
        let total = entries.len();
        let mut report = BatchReport::default();
        for (k, entry) in entries.iter().enumerate() {
            if entry.is_folder() {
                info!(folder = %entry.name, "skipping folder");
                report.skipped.push(entry.name.clone());
                continue;
            }
            info!("downloading {}/{}: {}", k + 1, total, entry.name);
            let task = TransferTask::Download {
                file: RemoteFile::from(entry),
                dest_dir: dest_dir.to_path_buf(),
            };
            self.run_recorded(&task, &mut report).await;
        }
        log_summary(&report);
        report
    }

    /// Uploads every regular file in `paths` into `folder`.
    pub async fn upload_all(&self, paths: &[PathBuf], folder: &FolderRef) -> BatchReport {
        let total = paths.len();
        let mut report = BatchReport::default();
        for (k, path) in paths.iter().enumerate() {
            let is_file = tokio::fs::metadata(path)
                .await
                .is_ok_and(|meta| meta.is_file());
            if !is_file {
                info!(path = %path.display(), "skipping, not a regular file");
                report.skipped.push(path.display().to_string());
                continue;
            }
            info!("uploading {}/{}: {}", k + 1, total, path.display());
            let task = TransferTask::Upload {
                local_path: path.clone(),
                folder: folder.clone(),
            };
            self.run_recorded(&task, &mut report).await;
        }
        log_summary(&report);
        report
    }

    async fn run_recorded(&self, task: &TransferTask, report: &mut BatchReport) {
        let label = task.label();
        match self.run_one(task).await {
            Ok(()) => report.completed.push(label),
            Err(e) => {
                error!(file = %label, error = %e, "transfer failed, continuing with next file");
                report.failed.push((label, e));
            }
        }
    }
}

fn log_summary(report: &BatchReport) {
    info!(
        completed = report.completed.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "batch finished"
    );
}
