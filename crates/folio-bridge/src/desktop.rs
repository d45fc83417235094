// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop bridge: document trees backed by plain directories.
//
// Desktop systems have no content provider, so a "grant" is simply a
// directory the user picked, recorded in a JSON file. Tree ids follow the
// `<volume>:<relative path>` shape mobile providers use, which keeps saved
// URIs portable between the two.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use folio_core::error::{FolioError, Result};
use folio_core::types::DocumentType;
use folio_core::uri::TreeUri;

use crate::traits::*;

/// Authority used for every URI handed out by this bridge.
pub const DESKTOP_AUTHORITY: &str = "org.folio.desktop.documents";

/// A persisted directory grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GrantRecord {
    tree_id: String,
    path: PathBuf,
    granted_at: DateTime<Utc>,
}

/// Bridge for desktop and CI builds.
pub struct DesktopBridge {
    layout: StorageLayout,
    grants_path: PathBuf,
    grants: Mutex<Vec<GrantRecord>>,
}

impl DesktopBridge {
    /// Open the bridge, loading persisted grants from `grants_path` if the
    /// file exists.
    pub fn open(grants_path: &Path, layout: StorageLayout) -> Result<Self> {
        let grants = if grants_path.exists() {
            let json = fs::read_to_string(grants_path)?;
            serde_json::from_str(&json)?
        } else {
            Vec::new()
        };
        debug!(path = %grants_path.display(), "Desktop bridge opened");
        Ok(Self {
            layout,
            grants_path: grants_path.to_path_buf(),
            grants: Mutex::new(grants),
        })
    }

    fn persist(&self, grants: &[GrantRecord]) -> Result<()> {
        if let Some(parent) = self.grants_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(grants)?;
        fs::write(&self.grants_path, json)?;
        Ok(())
    }

    /// Tree id for a directory: volume label, colon, path within the volume.
    fn tree_id_for(&self, path: &Path) -> String {
        let (volume, relative) = if let Ok(rel) = path.strip_prefix(&self.layout.primary_storage) {
            ("primary".to_owned(), rel)
        } else if let Some(volume) = self
            .layout
            .removable_volumes()
            .into_iter()
            .find(|v| path.starts_with(v))
        {
            let label = volume
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let rel = path.strip_prefix(&volume).unwrap_or(path);
            (label, rel)
        } else {
            ("local".to_owned(), path.strip_prefix("/").unwrap_or(path))
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        format!("{volume}:{relative}")
    }

    /// Filesystem path a tree URI points at.
    fn resolve(&self, uri: &TreeUri) -> Result<PathBuf> {
        let grants = self.grants.lock().expect("grant list lock poisoned");
        let grant = grants
            .iter()
            .find(|g| g.tree_id == uri.tree_id())
            .ok_or_else(|| FolioError::GrantNotFound(uri.tree_id().to_owned()))?;
        let relative = uri.relative_path();
        Ok(if relative.is_empty() {
            grant.path.clone()
        } else {
            grant.path.join(relative)
        })
    }

    fn entry_for(uri: TreeUri, path: &Path, metadata: &fs::Metadata) -> TreeEntry {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| uri.name().to_owned());
        let is_directory = metadata.is_dir();
        let mime_type = if is_directory {
            None
        } else {
            DocumentType::from_path(path).map(|t| t.mime_type().to_owned())
        };
        TreeEntry {
            uri,
            hidden: name.starts_with('.'),
            name,
            is_directory,
            mime_type,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            size: if is_directory { 0 } else { metadata.len() },
            exists: true,
        }
    }
}

impl PlatformBridge for DesktopBridge {
    fn platform_name(&self) -> &str {
        "Desktop"
    }
}

impl StorageBridge for DesktopBridge {
    fn storage_layout(&self) -> Result<StorageLayout> {
        Ok(self.layout.clone())
    }
}

impl DocumentTreeProvider for DesktopBridge {
    fn persisted_trees(&self) -> Result<Vec<TreeUri>> {
        let grants = self.grants.lock().expect("grant list lock poisoned");
        Ok(grants
            .iter()
            .map(|g| TreeUri::root(DESKTOP_AUTHORITY, g.tree_id.clone()))
            .collect())
    }

    #[instrument(skip(self))]
    fn grant_tree(&self, path: &Path) -> Result<TreeUri> {
        let path = fs::canonicalize(path).map_err(|e| FolioError::entry_access(path, e))?;
        if !path.is_dir() {
            return Err(FolioError::Bridge(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let tree_id = self.tree_id_for(&path);
        let mut grants = self.grants.lock().expect("grant list lock poisoned");
        if !grants.iter().any(|g| g.tree_id == tree_id) {
            grants.push(GrantRecord {
                tree_id: tree_id.clone(),
                path: path.clone(),
                granted_at: Utc::now(),
            });
            self.persist(&grants)?;
            info!(tree_id = %tree_id, path = %path.display(), "Tree granted");
        }
        Ok(TreeUri::root(DESKTOP_AUTHORITY, tree_id))
    }

    #[instrument(skip(self), fields(tree_id = tree.tree_id()))]
    fn release_tree(&self, tree: &TreeUri) -> Result<()> {
        let mut grants = self.grants.lock().expect("grant list lock poisoned");
        let before = grants.len();
        grants.retain(|g| g.tree_id != tree.tree_id());
        if grants.len() == before {
            return Err(FolioError::GrantNotFound(tree.tree_id().to_owned()));
        }
        self.persist(&grants)?;
        info!("Tree grant released");
        Ok(())
    }

    fn document_info(&self, uri: &TreeUri) -> Result<Option<TreeEntry>> {
        let path = self.resolve(uri)?;
        match fs::metadata(&path) {
            Ok(metadata) => Ok(Some(Self::entry_for(uri.clone(), &path, &metadata))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FolioError::entry_access(path, e)),
        }
    }

    fn list_children(&self, parent: &TreeUri) -> Result<Vec<TreeEntry>> {
        let dir = self.resolve(parent)?;
        let entries = fs::read_dir(&dir).map_err(|e| FolioError::entry_access(&dir, e))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "unreadable directory entry skipped");
                    continue;
                }
            };
            let path = entry.path();
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "entry without metadata skipped");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            children.push(Self::entry_for(parent.child(&name), &path, &metadata));
        }
        Ok(children)
    }

    fn tree_exists(&self, tree: &TreeUri) -> bool {
        self.resolve(tree).map(|p| p.is_dir()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout_in(dir: &Path) -> StorageLayout {
        let primary = dir.join("emulated/0");
        let sd = dir.join("1234-ABCD");
        fs::create_dir_all(&primary).unwrap();
        fs::create_dir_all(sd.join("Android/data/org.folio/files")).unwrap();
        StorageLayout {
            storage_root: dir.to_path_buf(),
            primary_storage: primary,
            external_files_dirs: vec![sd.join("Android/data/org.folio/files")],
            legacy_mounts: false,
        }
    }

    fn bridge(dir: &TempDir) -> DesktopBridge {
        let root = fs::canonicalize(dir.path()).unwrap();
        DesktopBridge::open(&root.join("grants.json"), layout_in(&root)).unwrap()
    }

    #[test]
    fn grant_uses_volume_tree_ids() {
        let dir = TempDir::new().unwrap();
        let b = bridge(&dir);
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("emulated/0/Docs")).unwrap();
        fs::create_dir_all(root.join("1234-ABCD/Books")).unwrap();

        let docs = b.grant_tree(&root.join("emulated/0/Docs")).unwrap();
        let books = b.grant_tree(&root.join("1234-ABCD/Books")).unwrap();
        assert_eq!(docs.tree_id(), "primary:Docs");
        assert_eq!(books.tree_id(), "1234-ABCD:Books");
        assert_eq!(b.persisted_trees().unwrap().len(), 2);

        // Granting the same directory twice keeps one grant.
        b.grant_tree(&root.join("emulated/0/Docs")).unwrap();
        assert_eq!(b.persisted_trees().unwrap().len(), 2);
    }

    #[test]
    fn grants_survive_reopen_and_release() {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("emulated/0/Docs")).unwrap();
        let tree = bridge(&dir).grant_tree(&root.join("emulated/0/Docs")).unwrap();

        let reopened = bridge(&dir);
        assert_eq!(reopened.persisted_trees().unwrap(), vec![tree.clone()]);
        reopened.release_tree(&tree).unwrap();
        assert!(reopened.persisted_trees().unwrap().is_empty());
        assert!(matches!(
            reopened.release_tree(&tree),
            Err(FolioError::GrantNotFound(_))
        ));
        assert!(bridge(&dir).persisted_trees().unwrap().is_empty());
    }

    #[test]
    fn lists_children_with_mime_types() {
        let dir = TempDir::new().unwrap();
        let b = bridge(&dir);
        let root = fs::canonicalize(dir.path()).unwrap();
        let docs = root.join("emulated/0/Docs");
        fs::create_dir_all(docs.join("sub")).unwrap();
        fs::write(docs.join("a.pdf"), b"%PDF").unwrap();
        fs::write(docs.join(".hidden.pdf"), b"%PDF").unwrap();

        let tree = b.grant_tree(&docs).unwrap();
        let mut children = b.list_children(&tree).unwrap();
        children.sort_by(|x, y| x.name.cmp(&y.name));
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, [".hidden.pdf", "a.pdf", "sub"]);
        assert!(children[0].hidden);
        assert_eq!(children[1].mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(children[1].uri.document_id(), "primary:Docs/a.pdf");
        assert!(children[2].is_directory);

        let sub = b.list_children(&children[2].uri).unwrap();
        assert!(sub.is_empty());
    }

    #[test]
    fn vanished_tree_does_not_exist() {
        let dir = TempDir::new().unwrap();
        let b = bridge(&dir);
        let root = fs::canonicalize(dir.path()).unwrap();
        let gone = root.join("emulated/0/Gone");
        fs::create_dir_all(&gone).unwrap();
        let tree = b.grant_tree(&gone).unwrap();
        assert!(b.tree_exists(&tree));

        fs::remove_dir(&gone).unwrap();
        assert!(!b.tree_exists(&tree));
        assert_eq!(b.document_info(&tree).unwrap(), None);
    }

    #[test]
    fn build_tree_requires_containment() {
        let dir = TempDir::new().unwrap();
        let b = bridge(&dir);
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("emulated/0/Docs/sub")).unwrap();
        let tree = b.grant_tree(&root.join("emulated/0/Docs")).unwrap();

        let sub = tree.child("sub");
        let built = b.build_tree(&tree, &sub).unwrap().unwrap();
        assert!(built.is_directory);
        let other = TreeUri::root(DESKTOP_AUTHORITY, "primary:Other").child("sub");
        assert_eq!(b.build_tree(&tree, &other).unwrap(), None);
    }

    #[test]
    fn sd_card_detection_uses_layout() {
        let dir = TempDir::new().unwrap();
        let b = bridge(&dir);
        let root = fs::canonicalize(dir.path()).unwrap();
        assert!(b.is_sd_card(&root.join("1234-ABCD/Books")).unwrap());
        assert!(!b.is_sd_card(&root.join("emulated/0")).unwrap());
        assert_eq!(b.sd_card_roots().unwrap(), vec![root.join("1234-ABCD")]);
    }
}
