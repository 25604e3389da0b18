//! In-memory drive used by the unit tests.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use thunderdrive_api::{
    ApiError, Download, EntriesPage, EntryQuery, RemoteFolder, UploadStream,
};
use thunderdrive_transfer::RestartFlag;

use crate::connection::{DriveConnection, DriveFuture};

pub(crate) const FRAME: usize = 512 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Uploaded {
    pub parent_id: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct MockDrive {
    pub folders: Mutex<Vec<RemoteFolder>>,
    /// Folder that appears in the list once `create_folder` succeeds.
    pub created_folder: Mutex<Option<RemoteFolder>>,
    pub fail_create: bool,
    pub creates: Mutex<Vec<(String, String)>>,
    pub folder_calls: AtomicUsize,

    pub pages: Mutex<Vec<EntriesPage>>,
    pub queries: Mutex<Vec<(EntryQuery, u32)>>,

    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub restart_at: Option<(RestartFlag, usize)>,
    pub download_calls: AtomicUsize,

    pub uploads: Mutex<Vec<Uploaded>>,
    pub failing_uploads: Vec<String>,
    pub upload_calls: AtomicUsize,

    /// Sleep before every download frame and every 100th upload chunk.
    pub pace: Option<Duration>,
}

impl MockDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folders(self, folders: Vec<RemoteFolder>) -> Self {
        *self.folders.lock().unwrap() = folders;
        self
    }

    pub fn with_pages(self, pages: Vec<EntriesPage>) -> Self {
        *self.pages.lock().unwrap() = pages;
        self
    }

    pub fn with_file(self, hash: &str, content: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(hash.into(), content);
        self
    }

    /// Raises `flag` while yielding frame `frame` of the first download.
    pub fn restart_on_first_download(mut self, flag: RestartFlag, frame: usize) -> Self {
        self.restart_at = Some((flag, frame));
        self
    }

    pub fn paced(mut self, pause: Duration) -> Self {
        self.pace = Some(pause);
        self
    }

    pub fn failing_upload(mut self, file_name: &str) -> Self {
        self.failing_uploads.push(file_name.into());
        self
    }
}

pub(crate) fn folder(id: u64, name: &str) -> RemoteFolder {
    RemoteFolder {
        id,
        hash: format!("hash{id}"),
        name: name.into(),
        parent_id: None,
    }
}

impl DriveConnection for MockDrive {
    fn list_entries<'a>(&'a self, query: &'a EntryQuery, page: u32) -> DriveFuture<'a, EntriesPage> {
        Box::pin(async move {
            self.queries.lock().unwrap().push((query.clone(), page));
            let pages = self.pages.lock().unwrap();
            pages
                .get(page.saturating_sub(1) as usize)
                .cloned()
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    body: format!("no page {page}"),
                })
        })
    }

    fn list_folders(&self) -> DriveFuture<'_, Vec<RemoteFolder>> {
        Box::pin(async move {
            self.folder_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.folders.lock().unwrap().clone())
        })
    }

    fn create_folder<'a>(&'a self, name: &'a str, parent_id: &'a str) -> DriveFuture<'a, ()> {
        Box::pin(async move {
            self.creates
                .lock()
                .unwrap()
                .push((name.to_string(), parent_id.to_string()));
            if self.fail_create {
                return Err(ApiError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            if let Some(created) = self.created_folder.lock().unwrap().take() {
                self.folders.lock().unwrap().push(created);
            }
            Ok(())
        })
    }

    fn upload<'a>(
        &'a self,
        parent_id: &'a str,
        file_name: &'a str,
        len: u64,
        mut body: UploadStream,
    ) -> DriveFuture<'a, ()> {
        Box::pin(async move {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_uploads.iter().any(|f| f == file_name) {
                return Err(ApiError::Status {
                    status: 500,
                    body: "upload refused".into(),
                });
            }
            let mut data = Vec::new();
            let mut chunks = 0usize;
            while let Some(chunk) = body.next().await {
                chunks += 1;
                if let Some(pause) = self.pace
                    && chunks % 100 == 0
                {
                    tokio::time::sleep(pause).await;
                }
                let chunk = chunk.map_err(|e| ApiError::Unexpected(e.to_string()))?;
                data.extend_from_slice(&chunk);
            }
            if data.len() as u64 != len {
                return Err(ApiError::Unexpected(format!(
                    "declared {len} bytes, got {}",
                    data.len()
                )));
            }
            self.uploads.lock().unwrap().push(Uploaded {
                parent_id: parent_id.to_string(),
                file_name: file_name.to_string(),
                data,
            });
            Ok(())
        })
    }

    fn download<'a>(&'a self, hash: &'a str) -> DriveFuture<'a, Download> {
        Box::pin(async move {
            let call = self.download_calls.fetch_add(1, Ordering::SeqCst);
            let content = self
                .files
                .lock()
                .unwrap()
                .get(hash)
                .cloned()
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    body: "not found".into(),
                })?;
            let trigger = if call == 0 { self.restart_at.clone() } else { None };
            let len = content.len() as u64;
            let frames: Vec<Bytes> = content.chunks(FRAME).map(Bytes::copy_from_slice).collect();
            let body = stream::iter(frames.into_iter().enumerate().map(move |(i, frame)| {
                if let Some((flag, at)) = &trigger
                    && i == *at
                {
                    flag.request();
                }
                Ok::<_, ApiError>(frame)
            }));
            let pace = self.pace;
            let body = body.then(move |frame| async move {
                if let Some(pause) = pace {
                    tokio::time::sleep(pause).await;
                }
                frame
            });
            Ok(Download {
                content_length: Some(len),
                body: Box::pin(body),
            })
        })
    }

    fn user_name(&self) -> &str {
        "me@example.com"
    }
}

/// Cloneable writer for capturing progress output.
#[derive(Clone, Default)]
pub(crate) struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
