//! Inputs and outputs of the bookmark use cases.

use bookmarks_store::NodeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied fields for create and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BookmarkInput {
    /// Required for update, ignored on create.
    #[serde(default)]
    pub id: String,
    pub path: String,
    pub display_name: String,
    /// Ignored on update: the stored type is kept.
    #[serde(default, rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub highlight: i32,
    #[serde(default)]
    pub invert_favicon_color: i32,
    /// Download the favicon from this URL instead of discovering it.
    #[serde(default)]
    pub custom_favicon_url: Option<String>,
    /// Payload of a file item.
    #[serde(default)]
    pub file: Option<FileUpload>,
}

impl BookmarkInput {
    pub fn folder(path: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
            node_type: NodeType::Folder,
            ..Default::default()
        }
    }

    pub fn node(
        path: impl Into<String>,
        display_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
            node_type: NodeType::Node,
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Inline file content of a file item. The payload travels base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    #[serde(with = "base64_payload")]
    pub payload: Vec<u8>,
}

/// New sort positions: `sort_order[i]` belongs to `ids[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SortOrderInput {
    pub ids: Vec<String>,
    pub sort_order: Vec<i32>,
}

/// A binary object handed back to callers (favicons, files).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub payload: Vec<u8>,
    pub modified: DateTime<Utc>,
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Mime type guessed from a file name's extension.
pub fn mime_for(name: &str) -> &'static str {
    let ext = bookmarks_shared::hashing::extension(name).to_ascii_lowercase();
    match ext.as_str() {
        ".svg" => "image/svg+xml",
        ".png" => "image/png",
        ".ico" => "image/x-icon",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_defaults_and_type_field() {
        let input: BookmarkInput = serde_json::from_str(
            r#"{"path":"/","display_name":"A","type":"Folder"}"#,
        )
        .unwrap();
        assert_eq!(input.node_type, NodeType::Folder);
        assert!(input.url.is_empty());
        assert!(input.file.is_none());
    }

    #[test]
    fn file_payload_is_base64() {
        let upload = FileUpload {
            name: "a.txt".into(),
            mime_type: "text/plain".into(),
            payload: b"hello".to_vec(),
        };
        let json = serde_json::to_value(&upload).unwrap();
        assert_eq!(json["payload"], "aGVsbG8=");
        let back: FileUpload = serde_json::from_value(json).unwrap();
        assert_eq!(back, upload);
    }

    #[test]
    fn mime_guess() {
        assert_eq!(mime_for("x.SVG"), "image/svg+xml");
        assert_eq!(mime_for("abc_def.ico"), "image/x-icon");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
