//! ThunderDrive web API session.
//!
//! A thin async layer over `reqwest`: one authenticated [`Session`] per run,
//! sharing its cookie jar (and therefore the XSRF token) across every call.

pub mod client;
pub mod error;
pub mod types;

pub use client::{
    ByteStream, Credentials, DEFAULT_BASE_URL, Download, FAILURE_SENTINEL, Session, SessionConfig,
    UploadStream,
};
pub use error::ApiError;
pub use types::{Entry, EntriesPage, EntryQuery, EntryUser, RemoteFolder, SpaceUsage};
