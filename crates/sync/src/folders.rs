//! Folder name resolution against a snapshot of the remote folder list.

use thunderdrive_api::RemoteFolder;
use thunderdrive_transfer::{RetryPolicy, retry};
use tracing::{info, warn};

use crate::connection::DriveConnection;
use crate::error::DriveError;

/// Upload destination. Both fields empty means the drive root; this is
/// also what a failed lookup resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub hash: String,
}

impl FolderRef {
    /// The empty sentinel pair.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.id.is_empty() && self.hash.is_empty()
    }
}

impl From<&RemoteFolder> for FolderRef {
    fn from(folder: &RemoteFolder) -> Self {
        Self {
            id: folder.id.to_string(),
            hash: folder.hash.clone(),
        }
    }
}

/// The remote folder list, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSnapshot {
    folders: Vec<RemoteFolder>,
}

impl FolderSnapshot {
    pub fn new(folders: Vec<RemoteFolder>) -> Self {
        Self { folders }
    }

    /// First folder whose name matches `name` case-insensitively.
    pub fn find(&self, name: &str) -> Option<&RemoteFolder> {
        let wanted = name.to_lowercase();
        self.folders.iter().find(|f| f.name.to_lowercase() == wanted)
    }

    pub fn folders(&self) -> &[RemoteFolder] {
        &self.folders
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

/// Maps folder names to [`FolderRef`]s, creating missing folders on request.
pub struct FolderResolver<'a> {
    conn: &'a dyn DriveConnection,
    snapshot: FolderSnapshot,
    policy: RetryPolicy,
}

impl<'a> FolderResolver<'a> {
    /// Fetches the folder list and builds a resolver over it.
    pub async fn load(conn: &'a dyn DriveConnection, policy: RetryPolicy) -> Result<Self, DriveError> {
        let folders = retry(&policy, "list folders", || conn.list_folders()).await?;
        Ok(Self::with_snapshot(conn, FolderSnapshot::new(folders), policy))
    }

    pub fn with_snapshot(
        conn: &'a dyn DriveConnection,
        snapshot: FolderSnapshot,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            conn,
            snapshot,
            policy,
        }
    }

    pub fn snapshot(&self) -> &FolderSnapshot {
        &self.snapshot
    }

    /// Replaces the snapshot with a fresh folder list.
    pub async fn refresh(&mut self) -> Result<(), DriveError> {
        let conn = self.conn;
        let folders = retry(&self.policy, "list folders", || conn.list_folders()).await?;
        self.snapshot = FolderSnapshot::new(folders);
        Ok(())
    }

    /// Looks `name` up without touching the remote side.
    ///
    /// An empty name is the root. A miss is logged and yields the root
    /// sentinel.
    pub fn lookup(&self, name: &str) -> FolderRef {
        if name.is_empty() {
            return FolderRef::root();
        }
        match self.snapshot.find(name) {
            Some(folder) => folder.into(),
            None => {
                info!(folder = name, "folder not found");
                FolderRef::root()
            }
        }
    }

    /// Resolves `name`, creating it under `parent_name` when missing and
    /// `allow_create` is set.
    ///
    /// Creation is attempted at most once: after creating and refreshing,
    /// the name is looked up again without the create flag. Any failure
    /// along the way yields the root sentinel.
    pub async fn resolve(&mut self, name: &str, parent_name: &str, allow_create: bool) -> FolderRef {
        if name.is_empty() {
            return FolderRef::root();
        }
        if let Some(folder) = self.snapshot.find(name) {
            return folder.into();
        }
        if !allow_create {
            info!(folder = name, "folder not found");
            return FolderRef::root();
        }

        let parent = self.lookup(parent_name);
        info!(folder = name, parent = parent_name, "creating folder");
        let conn = self.conn;
        let created = retry(&self.policy, "create folder", || {
            conn.create_folder(name, &parent.id)
        })
        .await;
        if let Err(e) = created {
            warn!(folder = name, error = %e, "folder creation failed");
            return FolderRef::root();
        }
        if let Err(e) = self.refresh().await {
            warn!(folder = name, error = %e, "folder list refresh failed");
            return FolderRef::root();
        }
        self.lookup(name)
    }
}
