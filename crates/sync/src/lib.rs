//! Transfer orchestration on top of a drive connection.
//!
//! This crate holds the **business logic** of the tool: moving single files
//! with progress, stall detection and cooperative restarts, retrying them,
//! resolving folder names, paging through listings, and driving batches.
//! The network sits behind [`DriveConnection`], implemented for
//! [`thunderdrive_api::Session`] and mocked in tests.
//!
//! # Pipeline
//!
//! 1. **Resolve**: map a target folder name to an id (optionally creating it)
//! 2. **List**: page through search or recent results
//! 3. **Transfer**: one file at a time, each attempt retried independently
//! 4. **Report**: per-file outcomes collected into a [`BatchReport`]

pub mod batch;
pub mod connection;
pub mod engine;
pub mod error;
pub mod folders;
pub mod listing;
pub mod types;

#[cfg(test)]
mod testing;

pub use batch::{BatchReport, BatchRunner};
pub use connection::DriveConnection;
pub use engine::TransferEngine;
pub use error::DriveError;
pub use folders::{FolderRef, FolderResolver, FolderSnapshot};
pub use listing::{fetch_entries, recent, search};
pub use types::{RemoteFile, TransferTask};
