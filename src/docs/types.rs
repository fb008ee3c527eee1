use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Path-addressed node ID (blake3 hex hash of the node's tree path).
pub type DocId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Folder,
    Text,
    Image,
    Audio,
    Video,
    Pdf,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Folder => "folder",
            FileKind::Text => "text",
            FileKind::Image => "image",
            FileKind::Audio => "audio",
            FileKind::Video => "video",
            FileKind::Pdf => "pdf",
        }
    }

    /// Guess a kind from a file extension. Unknown extensions are treated as text.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" => FileKind::Image,
            "mp3" | "wav" | "ogg" | "m4a" => FileKind::Audio,
            "mp4" | "webm" | "mov" => FileKind::Video,
            "pdf" => FileKind::Pdf,
            _ => FileKind::Text,
        }
    }
}

/// One node of the knowledge-base tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    /// Filled in by the tree loader when absent from the source JSON.
    #[serde(default)]
    pub id: DocId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Text body for `text` nodes, a URL for media nodes.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub children: Vec<FileNode>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileNode {
    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }

    /// Text body, only for text nodes.
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            FileKind::Text => self.content.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading { level: u8 },
    ListItem,
    /// Image or embedded video line; `raw_text` holds the image alt text.
    Media,
    Paragraph,
}

/// A renderable unit of a text document: one non-empty source line with its
/// block-level marker removed. Inline markup stays in `raw_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub raw_text: String,
}

/// Table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub id: String,
    pub level: u8,
    pub text: String,
}
