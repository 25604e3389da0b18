//! Drive connection trait.
//!
//! `DriveConnection` is the seam between transfer logic and the HTTP
//! session. Using a trait keeps the engine, resolver and batch driver
//! testable with in-memory mocks.

use std::future::Future;
use std::pin::Pin;

use thunderdrive_api::{
    ApiError, Download, EntriesPage, EntryQuery, RemoteFolder, Session, UploadStream,
};

/// Boxed future returned by [`DriveConnection`] methods.
pub type DriveFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Abstract authenticated connection to the drive.
pub trait DriveConnection: Send + Sync {
    /// Fetches one page (1-based) of a listing.
    fn list_entries<'a>(&'a self, query: &'a EntryQuery, page: u32) -> DriveFuture<'a, EntriesPage>;

    /// Fetches the complete folder list, in server order.
    fn list_folders(&self) -> DriveFuture<'_, Vec<RemoteFolder>>;

    /// Creates `name` under `parent_id` (empty = root).
    fn create_folder<'a>(&'a self, name: &'a str, parent_id: &'a str) -> DriveFuture<'a, ()>;

    /// Streams `len` bytes from `body` as `file_name` into `parent_id`.
    fn upload<'a>(
        &'a self,
        parent_id: &'a str,
        file_name: &'a str,
        len: u64,
        body: UploadStream,
    ) -> DriveFuture<'a, ()>;

    /// Opens the status-checked body of the file with content hash `hash`.
    fn download<'a>(&'a self, hash: &'a str) -> DriveFuture<'a, Download>;

    /// Account name of the logged-in user.
    fn user_name(&self) -> &str;
}

impl DriveConnection for Session {
    fn list_entries<'a>(&'a self, query: &'a EntryQuery, page: u32) -> DriveFuture<'a, EntriesPage> {
        Box::pin(Session::list_entries(self, query, page))
    }

    fn list_folders(&self) -> DriveFuture<'_, Vec<RemoteFolder>> {
        Box::pin(Session::list_folders(self))
    }

    fn create_folder<'a>(&'a self, name: &'a str, parent_id: &'a str) -> DriveFuture<'a, ()> {
        Box::pin(Session::create_folder(self, name, parent_id))
    }

    fn upload<'a>(
        &'a self,
        parent_id: &'a str,
        file_name: &'a str,
        len: u64,
        body: UploadStream,
    ) -> DriveFuture<'a, ()> {
        Box::pin(Session::upload(self, parent_id, file_name, len, body))
    }

    fn download<'a>(&'a self, hash: &'a str) -> DriveFuture<'a, Download> {
        Box::pin(Session::download(self, hash))
    }

    fn user_name(&self) -> &str {
        Session::user_name(self)
    }
}
