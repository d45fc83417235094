// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Browser configuration.

use serde::{Deserialize, Serialize};

/// File extensions the document browser lists by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "pptx", "xlsx", "jpeg", "jpg", "gif", "png", "bmp", "cbz", "md",
];

/// How browser rows are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Case-insensitive file name, A to Z.
    #[default]
    FileName,
    /// Parent directory, then full path.
    AbsolutePath,
    /// Parent directory, then newest first.
    ModifiedDate,
    /// Newest first regardless of directory.
    ModifiedDateOnly,
    /// Folders before files, then full path.
    FolderPath,
    /// Folders before files, then newest first.
    FolderDate,
    /// Directories first, then name (document trees).
    ExternalPath,
    /// Directories first, then newest first (document trees).
    ExternalDate,
}

impl SortOrder {
    /// Parse the command-line spelling of a sort order.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "name" => Some(Self::FileName),
            "path" => Some(Self::AbsolutePath),
            "date" => Some(Self::ModifiedDate),
            "date-only" => Some(Self::ModifiedDateOnly),
            "folder-path" => Some(Self::FolderPath),
            "folder-date" => Some(Self::FolderDate),
            "external-path" => Some(Self::ExternalPath),
            "external-date" => Some(Self::ExternalDate),
            _ => None,
        }
    }
}

/// Persistent document browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Lower-case extensions of files to list.
    pub extensions: Vec<String>,
    /// List dot-files and dot-directories.
    pub accept_hidden: bool,
    /// Include removable (SD card) storage.
    pub accept_external_storage: bool,
    /// Show folder rows next to file rows.
    pub list_folders: bool,
    /// Collect all descendants as hidden rows for recursive search.
    pub recursive_search: bool,
    /// Publish partial results while a whole-storage scan runs.
    pub update_progress: bool,
    pub sort_order: SortOrder,
    /// Folders whose removable-storage answer is remembered.
    pub sd_cache_capacity: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            accept_hidden: false,
            accept_external_storage: true,
            list_folders: true,
            recursive_search: false,
            update_progress: true,
            sort_order: SortOrder::FileName,
            sd_cache_capacity: 64,
        }
    }
}
