// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio document browser.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::uri::TreeUri;

/// What a [`FileNode`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file on the local filesystem.
    File,
    /// Directory on the local filesystem.
    Folder,
    /// Document inside a permission-granted tree.
    ExternalFile,
    /// Directory inside a permission-granted tree.
    ExternalFolder,
    /// Top of a permission-granted tree.
    ExternalRoot,
}

impl FileKind {
    /// Stable ordering rank used by the folder-first sort orders.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Folder => 1,
            Self::File => 2,
            Self::ExternalFile => 6,
            Self::ExternalRoot => 7,
            Self::ExternalFolder => 9,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Folder | Self::ExternalFolder | Self::ExternalRoot)
    }

    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ExternalFile | Self::ExternalFolder | Self::ExternalRoot
        )
    }
}

/// Where a node lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLocation {
    Local(PathBuf),
    Tree(TreeUri),
}

/// A single row of the document browser.
///
/// Nodes are produced by the populators and handed to the UI as part of a
/// snapshot. The `hidden` flag marks descendants collected for recursive
/// search; they are never shown in the folder listing itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub kind: FileKind,
    pub location: NodeLocation,
    /// Display name (last path component).
    pub name: String,
    pub modified: Option<DateTime<Utc>>,
    pub size: u64,
    pub mime_type: Option<String>,
    /// Password-protected document.
    pub secured: bool,
    pub hidden: bool,
}

impl FileNode {
    /// Build a local node without touching the filesystem.
    pub fn local(kind: FileKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = if kind.is_directory() {
            None
        } else {
            DocumentType::from_path(&path).map(|t| t.mime_type().to_owned())
        };
        Self {
            kind,
            location: NodeLocation::Local(path),
            name,
            modified: None,
            size: 0,
            mime_type,
            secured: false,
            hidden: false,
        }
    }

    /// Build a local node, filling timestamps and size from `metadata`.
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let kind = if metadata.is_dir() {
            FileKind::Folder
        } else {
            FileKind::File
        };
        let mut node = Self::local(kind, path);
        node.modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        if !metadata.is_dir() {
            node.size = metadata.len();
        }
        node
    }

    /// Build a node for an entry of a permission-granted tree.
    pub fn tree(
        kind: FileKind,
        uri: TreeUri,
        name: impl Into<String>,
        modified: Option<DateTime<Utc>>,
        size: u64,
        mime_type: Option<String>,
    ) -> Self {
        Self {
            kind,
            location: NodeLocation::Tree(uri),
            name: name.into(),
            modified,
            size,
            mime_type,
            secured: false,
            hidden: false,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    /// Local path, if this node is on the local filesystem.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            NodeLocation::Local(path) => Some(path),
            NodeLocation::Tree(_) => None,
        }
    }

    /// Tree URI, if this node lives inside a granted tree.
    pub fn uri(&self) -> Option<&TreeUri> {
        match &self.location {
            NodeLocation::Tree(uri) => Some(uri),
            NodeLocation::Local(_) => None,
        }
    }

    /// Lower-case extension, or an empty string.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// Full path (local) or full document path (tree) as a display string.
    pub fn absolute_path(&self) -> String {
        match &self.location {
            NodeLocation::Local(path) => path.display().to_string(),
            NodeLocation::Tree(uri) => uri.document_id().to_owned(),
        }
    }

    /// Path of the containing directory as a display string.
    pub fn parent_path(&self) -> String {
        match &self.location {
            NodeLocation::Local(path) => path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            NodeLocation::Tree(uri) => {
                let doc = uri.document_id();
                match doc.rfind('/') {
                    Some(idx) => doc[..idx].to_owned(),
                    None => String::new(),
                }
            }
        }
    }

    /// Modification time as milliseconds since the epoch (0 if unknown).
    pub fn raw_modified(&self) -> i64 {
        self.modified.map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

/// Document formats the viewer can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Word,
    PowerPoint,
    Excel,
    Jpeg,
    Gif,
    Png,
    Bmp,
    /// Comic book archive (zip of images).
    ComicZip,
    Markdown,
}

impl DocumentType {
    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Word => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::PowerPoint => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::ComicZip => "application/vnd.comicbook+zip",
            Self::Markdown => "text/markdown",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Word),
            "pptx" => Some(Self::PowerPoint),
            "xlsx" => Some(Self::Excel),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "cbz" => Some(Self::ComicZip),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Infer document type from a MIME type reported by a document provider.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let lower = mime.to_ascii_lowercase();
        match lower.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/msword" => Some(Self::Word),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/png" => Some(Self::Png),
            "image/bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "application/x-cbz" | "application/vnd.comicbook+zip" => Some(Self::ComicZip),
            "text/markdown" | "text/x-markdown" => Some(Self::Markdown),
            other => [Self::Word, Self::PowerPoint, Self::Excel]
                .into_iter()
                .find(|t| t.mime_type() == other),
        }
    }
}

/// Whether documents of this MIME type can be opened by the viewer.
pub fn is_mime_type_handled(mime: &str) -> bool {
    DocumentType::from_mime_type(mime).is_some()
}

/// Lower-case extension of a file name, empty when there is none.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => name[idx + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}
