// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for storage access.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::error::Result;
use folio_core::uri::TreeUri;

/// Unified bridge that groups the storage capabilities the browser needs.
pub trait PlatformBridge: StorageBridge + DocumentTreeProvider + Send + Sync {
    /// Human-readable platform name (e.g. "Android 14", "Desktop").
    fn platform_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Storage layout
// ---------------------------------------------------------------------------

/// Where the platform mounts its storage volumes.
///
/// On Android this is `/storage` with primary storage at
/// `/storage/emulated/0` and one directory per removable volume; the
/// app-specific files directories are the only reliable way to find those
/// volumes, so they are carried here as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    /// Directory every volume is mounted under.
    pub storage_root: PathBuf,
    /// The user's primary storage directory.
    pub primary_storage: PathBuf,
    /// App-specific files directories, one per mounted volume.
    pub external_files_dirs: Vec<PathBuf>,
    /// Older platform releases expose the same files through several mount
    /// aliases (`/emulated/legacy/`, `/storage/sdcard0/`).
    pub legacy_mounts: bool,
}

impl StorageLayout {
    /// Layout of the machine we are running on.
    pub fn detect() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        let user = std::env::var("USER").unwrap_or_default();

        let storage_root = ["/run/media", "/media"]
            .iter()
            .map(|base| Path::new(base).join(&user))
            .find(|p| !user.is_empty() && p.is_dir())
            .unwrap_or_else(|| PathBuf::from("/media"));

        let mut external_files_dirs = vec![home.clone()];
        if let Ok(entries) = std::fs::read_dir(&storage_root) {
            external_files_dirs.extend(
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_dir()),
            );
        }

        Self {
            storage_root,
            primary_storage: home,
            external_files_dirs,
            legacy_mounts: false,
        }
    }

    /// Parent of primary storage (`/storage/emulated` on Android).
    pub fn emulated_dir(&self) -> Option<&Path> {
        self.primary_storage.parent()
    }

    /// Whether the emulated storage directory is present on disk.
    pub fn emulated_exists(&self) -> bool {
        self.storage_root.join("emulated").exists()
    }

    /// Top-level volume directory containing `dir`, found by climbing until
    /// the parent is the storage root. `None` when the climb passes through
    /// primary storage or never reaches the storage root.
    pub fn volume_root_of(&self, dir: &Path) -> Option<PathBuf> {
        let mut current = dir;
        loop {
            if current == self.primary_storage {
                return None;
            }
            let parent = current.parent()?;
            if parent == self.storage_root {
                return Some(current.to_path_buf());
            }
            if parent == Path::new("/") {
                return None;
            }
            current = parent;
        }
    }

    /// Removable volume roots, excluding primary storage.
    pub fn removable_volumes(&self) -> Vec<PathBuf> {
        let mut volumes: Vec<PathBuf> = Vec::new();
        for dir in &self.external_files_dirs {
            if dir.starts_with(&self.primary_storage) {
                continue;
            }
            match self.volume_root_of(dir) {
                Some(root) if !volumes.contains(&root) => volumes.push(root),
                _ => {}
            }
        }
        volumes
    }

    /// Whether `path` lives on a removable volume.
    pub fn is_removable(&self, path: &Path) -> bool {
        if path == self.storage_root || path.parent().is_none() {
            return false;
        }
        self.removable_volumes()
            .iter()
            .any(|volume| path.starts_with(volume))
    }
}

/// Query the storage volumes of the device.
pub trait StorageBridge {
    fn storage_layout(&self) -> Result<StorageLayout>;

    /// Whether `path` is on an SD card or other removable volume.
    fn is_sd_card(&self, path: &Path) -> Result<bool> {
        Ok(self.storage_layout()?.is_removable(path))
    }

    /// Root directories of all removable volumes.
    fn sd_card_roots(&self) -> Result<Vec<PathBuf>> {
        Ok(self.storage_layout()?.removable_volumes())
    }
}

// ---------------------------------------------------------------------------
// Document trees
// ---------------------------------------------------------------------------

/// One document inside a granted tree, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub uri: TreeUri,
    pub name: String,
    pub is_directory: bool,
    pub mime_type: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub size: u64,
    /// Provider-level hidden attribute, independent of the name.
    pub hidden: bool,
    pub exists: bool,
}

/// Access to document trees the user granted persistent permission for.
pub trait DocumentTreeProvider {
    /// All persisted tree grants, including ones whose tree has vanished.
    fn persisted_trees(&self) -> Result<Vec<TreeUri>>;

    /// Persist a grant for the directory at `path`.
    fn grant_tree(&self, path: &Path) -> Result<TreeUri>;

    /// Drop the persisted grant for `tree`.
    fn release_tree(&self, tree: &TreeUri) -> Result<()>;

    /// Look up a single document. `Ok(None)` when it does not exist.
    fn document_info(&self, uri: &TreeUri) -> Result<Option<TreeEntry>>;

    /// Direct children of a directory document.
    fn list_children(&self, parent: &TreeUri) -> Result<Vec<TreeEntry>>;

    fn tree_exists(&self, tree: &TreeUri) -> bool {
        matches!(self.document_info(tree), Ok(Some(entry)) if entry.exists)
    }

    /// Resolve `target` relative to `base`. `Ok(None)` when `target` is not
    /// inside `base` or no longer exists.
    fn build_tree(&self, base: &TreeUri, target: &TreeUri) -> Result<Option<TreeEntry>> {
        if !base.contains(target) {
            return Ok(None);
        }
        self.document_info(target)
    }
}
