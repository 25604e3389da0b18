//! API request and response types.

use serde::{Deserialize, Serialize};

/// Owner record attached to a drive entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryUser {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub email: String,
}

/// A file or folder as returned by `drive/entries`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    /// `"folder"` for folders, a media kind (`"file"`, `"image"`, ...) otherwise.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub users: Vec<EntryUser>,
}

impl Entry {
    pub fn is_folder(&self) -> bool {
        self.kind == "folder"
    }

    /// Email of the first listed owner, if any.
    pub fn owner_email(&self) -> Option<&str> {
        self.users.first().map(|u| u.email.as_str())
    }
}

/// One page of `drive/entries`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntriesPage {
    #[serde(default)]
    pub data: Vec<Entry>,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
}

fn first_page() -> u32 {
    1
}

/// A folder from the user's full folder list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: u64,
    #[serde(default)]
    pub hash: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

/// Response of `drive/users/{id}/folders`.
#[derive(Debug, Deserialize)]
pub(crate) struct FoldersResponse {
    #[serde(default)]
    pub folders: Vec<RemoteFolder>,
}

/// Response of `auth/login`.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub user: Option<EntryUser>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `drive/user/space-usage`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceUsage {
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub available: u64,
}

/// What a `drive/entries` listing should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryQuery {
    /// The user's root folder.
    Root,
    /// Contents of the folder with the given hash.
    Folder(String),
    /// Name search across the whole drive.
    Search(String),
    /// Most recently modified entries first.
    Recent,
}

impl EntryQuery {
    /// Query parameters for the given page (1-based).
    pub fn params(&self, page: u32) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        match self {
            Self::Root => {
                params.push(("orderBy".into(), "name".into()));
                params.push(("orderDir".into(), String::new()));
            }
            Self::Folder(hash) => {
                params.push(("orderBy".into(), "name".into()));
                params.push(("orderDir".into(), String::new()));
                params.push(("folderId".into(), hash.clone()));
            }
            Self::Search(query) => {
                params.push(("orderBy".into(), "name".into()));
                params.push(("orderDir".into(), String::new()));
                params.push(("type".into(), String::new()));
                params.push(("query".into(), query.clone()));
            }
            Self::Recent => {
                params.push(("orderBy".into(), "updated_at".into()));
                params.push(("orderDir".into(), "desc".into()));
                params.push(("recentOnly".into(), "true".into()));
            }
        }
        if page > 1 {
            params.push(("page".into(), page.to_string()));
        }
        params
    }
}
