//! Single-file transfer engine.
//!
//! One call moves one file: downloads are re-sliced into fixed chunks and
//! written to a truncated destination, uploads are streamed from disk as a
//! multipart body. Both sample throughput at fixed checkpoints, redraw the
//! progress bar, and honour the shared [`RestartFlag`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::StreamExt;
use thunderdrive_api::ByteStream;
use thunderdrive_transfer::{
    ChunkProgress, DOWNLOAD_CHUNK_SIZE, DOWNLOAD_SAMPLE_EVERY, ProgressReporter, Rechunker,
    RestartFlag, RetryPolicy, STALL_THRESHOLD, SpeedTracker, StallDetected, UPLOAD_READ_SIZE,
    UPLOAD_SAMPLE_EVERY, format_size, retry,
};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::connection::DriveConnection;
use crate::error::DriveError;
use crate::folders::FolderRef;
use crate::types::{RemoteFile, TransferTask};

const DOWNLOAD_LABEL: &str = "D:";
const UPLOAD_LABEL: &str = "P:";

/// Moves single files over a [`DriveConnection`].
pub struct TransferEngine<'a> {
    conn: &'a dyn DriveConnection,
    reporter: Arc<ProgressReporter>,
    restart: RestartFlag,
    stall_threshold: u64,
}

impl<'a> TransferEngine<'a> {
    pub fn new(
        conn: &'a dyn DriveConnection,
        reporter: Arc<ProgressReporter>,
        restart: RestartFlag,
    ) -> Self {
        Self {
            conn,
            reporter,
            restart,
            stall_threshold: STALL_THRESHOLD,
        }
    }

    /// Overrides the stall threshold (bytes/second).
    pub fn with_stall_threshold(mut self, threshold: u64) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Runs one attempt of `task`.
    pub async fn run(&self, task: &TransferTask) -> Result<(), DriveError> {
        match task {
            TransferTask::Download { file, dest_dir } => self.download(file, dest_dir).await.map(drop),
            TransferTask::Upload { local_path, folder } => {
                self.upload(local_path, folder).await.map(drop)
            }
        }
    }

    /// Runs `task` under `policy`. Every failure, `Cancelled` and stalls
    /// included, starts the file over from scratch.
    pub async fn run_with_retry(
        &self,
        task: &TransferTask,
        policy: &RetryPolicy,
    ) -> Result<(), DriveError> {
        let label = task.label();
        retry(policy, &label, || self.run(task)).await
    }

    /// Downloads `file` into `dest_dir`, returning the written path.
    ///
    /// The destination is only created once the server accepted the
    /// request, and every attempt truncates it.
    pub async fn download(&self, file: &RemoteFile, dest_dir: &Path) -> Result<PathBuf, DriveError> {
        let name = Path::new(&file.name).file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable file name: {:?}", file.name),
            )
        })?;
        let path = dest_dir.join(name);

        info!(file = %file.name, size = %format_size(file.size), at = %stamp(), "download started");
        let download = self.conn.download(&file.hash).await?;
        let total = download
            .content_length
            .filter(|n| *n > 0)
            .or((file.size > 0).then_some(file.size));

        let mut out = File::create(&path).await?;
        let mut progress = ChunkProgress::new(total);
        let copied = self.copy_body(download.body, &mut out, &mut progress).await;
        if copied.is_err() {
            self.reporter.abandon();
        }
        // Partial output stays on disk; the next attempt truncates it.
        out.flush().await?;
        copied?;

        self.reporter.finish(DOWNLOAD_LABEL);
        info!(
            file = %file.name,
            bytes = %format_size(progress.bytes_moved),
            at = %stamp(),
            "download finished"
        );
        Ok(path)
    }

    async fn copy_body(
        &self,
        mut body: ByteStream,
        out: &mut File,
        progress: &mut ChunkProgress,
    ) -> Result<(), DriveError> {
        let mut speed = SpeedTracker::with_threshold(self.stall_threshold);
        speed.reset();
        self.render(DOWNLOAD_LABEL, progress, "");

        let mut chunks = Rechunker::new(DOWNLOAD_CHUNK_SIZE);
        while let Some(frame) = body.next().await {
            chunks.push(&frame?);
            while let Some(chunk) = chunks.next_chunk() {
                self.write_chunk(out, &chunk, progress, &mut speed).await?;
            }
        }
        if let Some(tail) = chunks.finish() {
            self.write_chunk(out, &tail, progress, &mut speed).await?;
        }
        Ok(())
    }

    async fn write_chunk(
        &self,
        out: &mut File,
        chunk: &Bytes,
        progress: &mut ChunkProgress,
        speed: &mut SpeedTracker,
    ) -> Result<(), DriveError> {
        out.write_all(chunk).await?;
        progress.record(chunk.len());

        if progress.at_checkpoint(DOWNLOAD_SAMPLE_EVERY) {
            let annotation = speed.sample(progress.bytes_moved, progress.total_bytes)?;
            self.render(DOWNLOAD_LABEL, progress, &annotation);
        }
        if self.restart.take() {
            debug!(chunk = progress.chunk_index, "restart requested during download");
            return Err(DriveError::Cancelled);
        }
        Ok(())
    }

    /// Uploads the file at `path` into `folder`, returning its size.
    pub async fn upload(&self, path: &Path, folder: &FolderRef) -> Result<u64, DriveError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unusable file name: {}", path.display()),
                )
            })?
            .to_string();

        let file = File::open(path).await?;
        let len = file.metadata().await?.len();

        info!(file = %path.display(), size = %format_size(len), at = %stamp(), "upload started");

        let abort = Arc::new(Mutex::new(None));
        let mut monitor = UploadMonitor {
            progress: ChunkProgress::new(Some(len)),
            speed: SpeedTracker::with_threshold(self.stall_threshold),
            reporter: Arc::clone(&self.reporter),
            restart: self.restart.clone(),
            abort: Arc::clone(&abort),
        };
        monitor.speed.reset();
        self.render(UPLOAD_LABEL, &monitor.progress, "");

        let stream = ReaderStream::with_capacity(file, UPLOAD_READ_SIZE)
            .map(move |read| monitor.observe(read));
        let result = self
            .conn
            .upload(&folder.id, &file_name, len, Box::pin(stream))
            .await;

        let reason = abort.lock().unwrap_or_else(|e| e.into_inner()).take();
        if reason.is_some() || result.is_err() {
            self.reporter.abandon();
        }
        if let Some(reason) = reason {
            return Err(reason.into());
        }
        result?;

        self.reporter.finish(UPLOAD_LABEL);
        info!(file = %path.display(), at = %stamp(), "upload finished");
        Ok(len)
    }

    fn render(&self, label: &str, progress: &ChunkProgress, annotation: &str) {
        let total = progress.total_bytes.unwrap_or(0);
        self.reporter
            .render(progress.bytes_moved as f64, total as f64, label, annotation);
    }
}

/// Why the upload body stream ended early.
#[derive(Debug)]
enum AbortReason {
    Restart,
    Stall(StallDetected),
}

impl From<AbortReason> for DriveError {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::Restart => DriveError::Cancelled,
            AbortReason::Stall(stall) => DriveError::Stall(stall),
        }
    }
}

/// Observes every read the multipart encoder pulls from the file.
struct UploadMonitor {
    progress: ChunkProgress,
    speed: SpeedTracker,
    reporter: Arc<ProgressReporter>,
    restart: RestartFlag,
    abort: Arc<Mutex<Option<AbortReason>>>,
}

impl UploadMonitor {
    fn observe(&mut self, read: io::Result<Bytes>) -> io::Result<Bytes> {
        let chunk = read?;
        self.progress.record(chunk.len());
        if !self.progress.at_checkpoint(UPLOAD_SAMPLE_EVERY) {
            return Ok(chunk);
        }

        if self.restart.take() {
            debug!(read = self.progress.chunk_index, "restart requested during upload");
            return Err(self.fail(AbortReason::Restart));
        }
        match self.speed.sample(self.progress.bytes_moved, self.progress.total_bytes) {
            Ok(annotation) => {
                let total = self.progress.total_bytes.unwrap_or(0);
                self.reporter.render(
                    self.progress.bytes_moved as f64,
                    total as f64,
                    UPLOAD_LABEL,
                    &annotation,
                );
                Ok(chunk)
            }
            Err(stall) => Err(self.fail(AbortReason::Stall(stall))),
        }
    }

    fn fail(&self, reason: AbortReason) -> io::Error {
        let err = io::Error::other(match &reason {
            AbortReason::Restart => "upload aborted: restart requested".to_string(),
            AbortReason::Stall(stall) => format!("upload aborted: {stall}"),
        });
        *self.abort.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason);
        err
    }
}

fn stamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
