//! Domain model structs persisted in the bookmarks database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! straight to the HTTP layer.

use bookmarks_shared::path::folder_full_path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// Kind of a bookmark row. Stored as an integer; immutable after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum NodeType {
    #[default]
    Node,
    Folder,
    FileItem,
}

impl NodeType {
    pub fn as_i32(self) -> i32 {
        match self {
            NodeType::Node => 0,
            NodeType::Folder => 1,
            NodeType::FileItem => 2,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(NodeType::Node),
            1 => Some(NodeType::Folder),
            2 => Some(NodeType::FileItem),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bookmark
// ---------------------------------------------------------------------------

/// A node, folder or file item owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    /// UUID-shaped id; assigned on create when empty.
    pub id: String,
    pub user_name: String,
    /// Canonical path of the parent folder, `/` for top-level entries.
    pub path: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub url: String,
    pub sort_order: i32,
    /// Number of direct children. Only meaningful for folders.
    pub child_count: i32,
    pub access_count: i32,
    pub highlight: i32,
    /// Content-addressed favicon name, empty until one was acquired.
    pub favicon: String,
    pub invert_favicon_color: i32,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
    pub file_id: Option<String>,
}

impl Bookmark {
    /// A draft with everything but the identifying fields left at defaults.
    pub fn new(
        user_name: impl Into<String>,
        path: impl Into<String>,
        display_name: impl Into<String>,
        node_type: NodeType,
    ) -> Self {
        Self {
            id: String::new(),
            user_name: user_name.into(),
            path: path.into(),
            display_name: display_name.into(),
            node_type,
            url: String::new(),
            sort_order: 0,
            child_count: 0,
            access_count: 0,
            highlight: 0,
            favicon: String::new(),
            invert_favicon_color: 0,
            created: Utc::now(),
            modified: None,
            file_id: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// Canonical path of this row when addressed as a folder.
    pub fn full_path(&self) -> String {
        folder_full_path(&self.path, &self.display_name)
    }
}

/// Number of direct children found under one path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeCount {
    pub path: String,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Favicon
// ---------------------------------------------------------------------------

/// A favicon payload stored in the `FAVICONS` blob table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Favicon {
    pub id: String,
    #[serde(skip_serializing)]
    pub payload: Vec<u8>,
    pub modified: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// File / FileObject
// ---------------------------------------------------------------------------

/// Metadata of a file backing a file item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct File {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub modified: DateTime<Utc>,
    pub file_object_id: Option<String>,
}

/// The payload belonging to a [`File`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObject {
    pub id: String,
    pub payload: Vec<u8>,
}
