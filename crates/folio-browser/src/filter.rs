// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Entry acceptance rules shared by all populators.

use std::collections::HashSet;
use std::fs::{File, Metadata};
use std::path::Path;

use folio_bridge::{StorageLayout, TreeEntry};
use folio_core::config::BrowserConfig;
use folio_core::types::{extension_of, is_mime_type_handled};

/// Path fragments under which older releases expose duplicate mounts.
const LEGACY_EMULATED_MARKER: &str = "/emulated/legacy/";
const LEGACY_SDCARD_MARKER: &str = "/storage/sdcard0/";

/// Which entries a populator keeps.
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// Lower-case extensions of files to keep.
    pub extensions: HashSet<String>,
    /// When false only directories are accepted.
    pub accept_files: bool,
    pub accept_hidden: bool,
    pub accept_external_storage: bool,
    /// Emit folder rows. Folders are traversed either way.
    pub list_folders: bool,
    /// Skip paths reached through a legacy duplicate mount.
    pub skip_legacy_aliases: bool,
    /// Whether the emulated storage directory exists; the `sdcard0` alias
    /// only duplicates files when it does.
    pub emulated_exists: bool,
}

impl FileFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            accept_files: true,
            accept_hidden: false,
            accept_external_storage: true,
            list_folders: true,
            skip_legacy_aliases: false,
            emulated_exists: false,
        }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        let mut filter = Self::new(&config.extensions);
        filter.accept_hidden = config.accept_hidden;
        filter.accept_external_storage = config.accept_external_storage;
        filter.list_folders = config.list_folders;
        filter
    }

    /// Adopt the legacy-mount facts of a storage layout.
    pub fn with_layout(mut self, layout: &StorageLayout) -> Self {
        self.skip_legacy_aliases = layout.legacy_mounts;
        self.emulated_exists = layout.emulated_exists();
        self
    }

    pub fn allows_extension(&self, name: &str) -> bool {
        self.extensions.contains(&extension_of(name))
    }

    /// Whether `path` is a duplicate reached through a legacy mount alias.
    pub fn is_legacy_alias(&self, path: &Path) -> bool {
        if !self.skip_legacy_aliases {
            return false;
        }
        let path = path.to_string_lossy();
        path.contains(LEGACY_EMULATED_MARKER)
            || (self.emulated_exists && path.contains(LEGACY_SDCARD_MARKER))
    }

    /// Name and location rules alone: hidden entries and legacy aliases are
    /// rejected. Walks use this to prune whole subtrees.
    pub fn accept_path(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if hidden && !self.accept_hidden {
            return false;
        }
        !self.is_legacy_alias(path)
    }

    /// Acceptance rule for local filesystem entries. Files must also be
    /// openable by this process.
    pub fn accept_local(&self, path: &Path, metadata: &Metadata) -> bool {
        if !self.accept_path(path) {
            return false;
        }
        if metadata.is_dir() {
            return true;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.accept_files && self.allows_extension(&name) && File::open(path).is_ok()
    }

    /// Acceptance rule for document-tree entries.
    pub fn accept_tree(&self, entry: &TreeEntry) -> bool {
        if !entry.exists || entry.hidden || entry.name.starts_with('.') {
            return false;
        }
        if entry.is_directory {
            return true;
        }
        self.accept_files
            && entry
                .mime_type
                .as_deref()
                .is_some_and(|mime| is_mime_type_handled(&mime.to_ascii_lowercase()))
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use folio_core::uri::TreeUri;
    use tempfile::TempDir;

    use super::*;

    fn accepts(filter: &FileFilter, path: &Path) -> bool {
        filter.accept_local(path, &fs::metadata(path).unwrap())
    }

    #[test]
    fn extension_allow_list() {
        let dir = TempDir::new().unwrap();
        for name in ["a.pdf", "b.txt", "C.PNG", ".secret.pdf"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let filter = FileFilter::new(["pdf", ".png"]);
        assert!(accepts(&filter, &dir.path().join("a.pdf")));
        assert!(!accepts(&filter, &dir.path().join("b.txt")));
        assert!(accepts(&filter, &dir.path().join("C.PNG")));
        assert!(!accepts(&filter, &dir.path().join(".secret.pdf")));
        // Directories are accepted regardless of their name.
        assert!(accepts(&filter, &dir.path().join("sub.txt")));

        let mut hidden = filter.clone();
        hidden.accept_hidden = true;
        assert!(accepts(&hidden, &dir.path().join(".secret.pdf")));

        let mut folders_only = filter;
        folders_only.accept_files = false;
        assert!(!accepts(&folders_only, &dir.path().join("a.pdf")));
    }

    #[test]
    fn legacy_aliases_only_when_enabled() {
        let mut filter = FileFilter::new(["pdf"]);
        let legacy = Path::new("/storage/emulated/legacy/Download/a.pdf");
        let sdcard0 = Path::new("/storage/sdcard0/Download/a.pdf");
        assert!(!filter.is_legacy_alias(legacy));

        filter.skip_legacy_aliases = true;
        assert!(filter.is_legacy_alias(legacy));
        assert!(!filter.is_legacy_alias(sdcard0));
        filter.emulated_exists = true;
        assert!(filter.is_legacy_alias(sdcard0));
    }

    #[test]
    fn tree_entries_need_handled_mime() {
        let filter = FileFilter::new(["pdf"]);
        let entry = |name: &str, mime: Option<&str>, dir: bool| TreeEntry {
            uri: TreeUri::root("auth", "primary:Docs").child(name),
            name: name.to_owned(),
            is_directory: dir,
            mime_type: mime.map(str::to_owned),
            modified: None,
            size: 0,
            hidden: false,
            exists: true,
        };

        assert!(filter.accept_tree(&entry("a.pdf", Some("application/PDF"), false)));
        assert!(!filter.accept_tree(&entry("a.txt", Some("text/plain"), false)));
        assert!(!filter.accept_tree(&entry("a.pdf", None, false)));
        assert!(filter.accept_tree(&entry("sub", None, true)));
        assert!(!filter.accept_tree(&entry(".cache", None, true)));

        let mut gone = entry("b.pdf", Some("application/pdf"), false);
        gone.exists = false;
        assert!(!filter.accept_tree(&gone));
    }

    #[test]
    fn pruning_rule_ignores_kind_and_extension() {
        let mut filter = FileFilter::new(["pdf"]);
        assert!(filter.accept_path(Path::new("/d/Music")));
        assert!(filter.accept_path(Path::new("/d/notes.txt")));
        assert!(!filter.accept_path(Path::new("/d/.cache")));

        filter.skip_legacy_aliases = true;
        assert!(!filter.accept_path(Path::new("/storage/emulated/legacy/Music")));
        filter.accept_hidden = true;
        assert!(filter.accept_path(Path::new("/d/.cache")));
    }

    #[cfg(unix)]
    #[test]
    fn files_this_process_cannot_open_are_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked.pdf");
        fs::write(&locked, b"%PDF").unwrap();
        // World-readable bits do not matter, only whether we can open it.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o004)).unwrap();

        let filter = FileFilter::new(["pdf"]);
        let openable = fs::File::open(&locked).is_ok();
        assert_eq!(accepts(&filter, &locked), openable);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o600)).unwrap();
        assert!(accepts(&filter, &locked));
    }
}
