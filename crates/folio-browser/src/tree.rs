// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document-tree populator.
//
// Browses directories the user granted persistent access to (typically SD
// cards). Roots come from the bridge's persisted grants; grants whose tree
// has disappeared are released on reload. A saved folder and leaf URI, kept
// by the caller from an earlier session, are resolved against the roots so
// browsing can resume where it left off.

use std::sync::Arc;

use folio_bridge::{DocumentTreeProvider, PlatformBridge, TreeEntry};
use folio_core::types::{FileKind, FileNode, NodeLocation};
use folio_core::uri::TreeUri;
use tracing::{debug, info, instrument, warn};

use crate::event::{PopulateEvent, PopulateOutcome};
use crate::filter::FileFilter;
use crate::options::{PopulateOptions, Populator};

const CONTEXT: &str = "tree";

/// Saved browsing position resolved against the current roots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedFolder {
    pub root: Option<FileNode>,
    pub folder: Option<FileNode>,
    pub leaf: Option<FileNode>,
}

/// Populates the browser from permission-granted document trees.
pub struct TreePopulator {
    bridge: Arc<dyn PlatformBridge>,
    roots: Vec<FileNode>,
    force_reload_roots: bool,
    current_root: Option<FileNode>,
    current_folder: Option<FileNode>,
    saved_folder_uri: Option<String>,
    saved_leaf_uri: Option<String>,
    saved: SavedFolder,
}

impl TreePopulator {
    pub fn new(bridge: Arc<dyn PlatformBridge>) -> Self {
        Self {
            bridge,
            roots: Vec::new(),
            force_reload_roots: false,
            current_root: None,
            current_folder: None,
            saved_folder_uri: None,
            saved_leaf_uri: None,
            saved: SavedFolder::default(),
        }
    }

    /// Roots loaded by an earlier run; reloaded anyway when empty.
    pub fn with_roots(mut self, roots: Vec<FileNode>) -> Self {
        self.roots = roots;
        self
    }

    pub fn force_reload_roots(mut self, force: bool) -> Self {
        self.force_reload_roots = force;
        self
    }

    /// The root and folder being browsed. Without a folder the root list is
    /// shown.
    pub fn with_current(mut self, root: Option<FileNode>, folder: Option<FileNode>) -> Self {
        self.current_root = root;
        self.current_folder = folder;
        self
    }

    /// URIs of the folder and leaf saved from an earlier session.
    pub fn with_saved(mut self, folder_uri: Option<String>, leaf_uri: Option<String>) -> Self {
        self.saved_folder_uri = folder_uri.filter(|s| !s.is_empty());
        self.saved_leaf_uri = leaf_uri.filter(|s| !s.is_empty());
        self
    }

    pub fn roots(&self) -> &[FileNode] {
        &self.roots
    }

    pub fn current_root(&self) -> Option<&FileNode> {
        self.current_root.as_ref()
    }

    pub fn current_folder(&self) -> Option<&FileNode> {
        self.current_folder.as_ref()
    }

    pub fn saved(&self) -> &SavedFolder {
        &self.saved
    }

    /// Root URIs as strings, for persisting between sessions.
    pub fn root_uris(&self) -> Vec<String> {
        self.roots
            .iter()
            .filter_map(FileNode::uri)
            .map(|uri| uri.to_string())
            .collect()
    }

    // -- Roots ------------------------------------------------------------------

    /// Reload roots from the persisted grants, releasing grants whose tree no
    /// longer exists. Returns false once cancelled.
    fn create_roots(&mut self, options: &PopulateOptions) -> bool {
        self.roots.clear();
        let trees = match self.bridge.persisted_trees() {
            Ok(trees) => trees,
            Err(e) => {
                options.report(CONTEXT, &e);
                return !options.is_cancelled();
            }
        };

        for tree in trees {
            if options.is_cancelled() {
                return false;
            }
            match self.bridge.document_info(&tree) {
                Ok(Some(entry)) if entry.exists && entry.is_directory => {
                    self.roots.push(node_from_entry(entry, true));
                }
                Ok(_) => {
                    info!(tree = %tree, "granted tree is gone, releasing");
                    if let Err(e) = self.bridge.release_tree(&tree) {
                        options.report(CONTEXT, &e);
                    }
                }
                Err(e) => options.report(CONTEXT, &e),
            }
        }

        if options.is_cancelled() {
            return false;
        }

        let current_tree = self
            .current_root
            .as_ref()
            .and_then(FileNode::uri)
            .map(|uri| uri.tree_id().to_owned());
        if let Some(tree_id) = current_tree {
            let still_granted = self
                .roots
                .iter()
                .filter_map(FileNode::uri)
                .any(|uri| uri.tree_id() == tree_id);
            if !still_granted {
                warn!(%tree_id, "current root is no longer granted");
                self.current_root = None;
                self.current_folder = None;
                options.emit(PopulateEvent::CurrentRootRemoved);
            }
        }
        debug!(roots = self.roots.len(), "roots loaded");
        true
    }

    // -- Saved folder -----------------------------------------------------------

    fn parse_saved(&self, uri: Option<&str>, options: &PopulateOptions) -> Option<TreeUri> {
        match TreeUri::parse(uri?) {
            Ok(uri) => Some(uri),
            Err(e) => {
                options.report(CONTEXT, &e);
                None
            }
        }
    }

    fn build(&self, base: &TreeUri, target: &TreeUri, options: &PopulateOptions) -> Option<FileNode> {
        match self.bridge.build_tree(base, target) {
            Ok(entry) => entry.map(|e| node_from_entry(e, false)),
            Err(e) => {
                options.report(CONTEXT, &e);
                None
            }
        }
    }

    /// Resolve the saved folder and leaf against the loaded roots.
    fn build_saved_folder(&self, options: &PopulateOptions) -> SavedFolder {
        let mut saved = SavedFolder::default();
        let folder_uri = self.parse_saved(self.saved_folder_uri.as_deref(), options);
        let leaf_uri = self.parse_saved(self.saved_leaf_uri.as_deref(), options);

        let tree_id = match (&folder_uri, &leaf_uri) {
            (Some(folder), Some(leaf)) if folder.tree_id() != leaf.tree_id() => {
                warn!(
                    folder = folder.tree_id(),
                    leaf = leaf.tree_id(),
                    "saved folder and leaf belong to different trees"
                );
                return saved;
            }
            (Some(folder), _) => folder.tree_id().to_owned(),
            (None, Some(leaf)) => leaf.tree_id().to_owned(),
            (None, None) => return saved,
        };

        saved.root = self
            .roots
            .iter()
            .find(|root| root.uri().is_some_and(|uri| uri.tree_id() == tree_id))
            .cloned();
        let Some(root_uri) = saved.root.as_ref().and_then(FileNode::uri).cloned() else {
            debug!(%tree_id, "saved root not among granted trees");
            return saved;
        };

        if let Some(folder_uri) = &folder_uri {
            saved.folder = self.build(&root_uri, folder_uri, options);
        }

        if let Some(leaf_uri) = &leaf_uri {
            saved.leaf = match (&saved.folder, &folder_uri) {
                (Some(folder), Some(folder_uri)) if folder_uri == leaf_uri => Some(folder.clone()),
                (Some(folder), _) => folder
                    .uri()
                    .and_then(|base| self.build(base, leaf_uri, options)),
                (None, _) => self.build(&root_uri, leaf_uri, options),
            };
        }
        saved
    }

    // -- Listing ----------------------------------------------------------------

    fn list_children(&self, parent: &TreeUri, filter: &FileFilter, options: &PopulateOptions) -> Vec<FileNode> {
        match self.bridge.list_children(parent) {
            Ok(children) => children
                .into_iter()
                .filter(|entry| filter.accept_tree(entry))
                .map(|entry| node_from_entry(entry, false))
                .collect(),
            Err(e) => {
                options.report(CONTEXT, &e);
                Vec::new()
            }
        }
    }

    /// Depth-first collection of every accepted descendant of `dir`.
    fn collect_descendants(
        &self,
        dir: &TreeUri,
        filter: &FileFilter,
        options: &PopulateOptions,
        out: &mut Vec<FileNode>,
    ) -> bool {
        for node in self.list_children(dir, filter, options) {
            if options.is_cancelled() {
                return false;
            }
            let descend = node.is_directory().then(|| node.uri().cloned()).flatten();
            out.push(node);
            if let Some(uri) = descend {
                if !self.collect_descendants(&uri, filter, options, out) {
                    return false;
                }
            }
        }
        !options.is_cancelled()
    }
}

/// Browser row for a provider entry.
fn node_from_entry(entry: TreeEntry, is_root: bool) -> FileNode {
    let kind = if is_root {
        FileKind::ExternalRoot
    } else if entry.is_directory {
        FileKind::ExternalFolder
    } else {
        FileKind::ExternalFile
    };
    FileNode::tree(
        kind,
        entry.uri,
        entry.name,
        entry.modified,
        entry.size,
        entry.mime_type,
    )
}

impl Populator for TreePopulator {
    fn name(&self) -> &'static str {
        CONTEXT
    }

    #[instrument(skip_all, fields(recursive = options.recursive))]
    fn populate(&mut self, options: &PopulateOptions) -> PopulateOutcome {
        if (self.force_reload_roots || self.roots.is_empty()) && !self.create_roots(options) {
            return PopulateOutcome::Cancelled;
        }
        if options.is_cancelled() {
            return PopulateOutcome::Cancelled;
        }

        if self.saved_folder_uri.is_some() || self.saved_leaf_uri.is_some() {
            self.saved = self.build_saved_folder(options);
            options.emit(PopulateEvent::SavedFolderBuilt {
                root: self.saved.root.clone(),
                folder: self.saved.folder.clone(),
                leaf: self.saved.leaf.clone(),
            });
            if self.saved.root.is_some() && self.saved.folder.is_some() {
                self.current_root = self.saved.root.clone();
                self.current_folder = self.saved.folder.clone();
            }
        }
        if options.is_cancelled() {
            return PopulateOutcome::Cancelled;
        }

        // -- Current level ------------------------------------------------------

        let filter = &options.filter;
        let current_uri = self.current_folder.as_ref().and_then(FileNode::uri).cloned();
        let mut visible = match &current_uri {
            Some(uri) => self.list_children(uri, filter, options),
            None => self
                .roots
                .iter()
                .filter(|root| !root.name.starts_with('.'))
                .cloned()
                .collect(),
        };
        options.sort(&mut visible);

        // A sink may cancel while taking the snapshot.
        if !options.publish(&visible) || options.is_cancelled() {
            return PopulateOutcome::Cancelled;
        }
        let folder = current_uri.map(NodeLocation::Tree);
        options.emit(PopulateEvent::Progress {
            folder: folder.clone(),
            entries: visible.len(),
        });
        options.emit(PopulateEvent::RootsLoaded(self.roots.clone()));

        if !options.recursive {
            info!(entries = visible.len(), "tree populated");
            return PopulateOutcome::Completed {
                entries: visible.len(),
            };
        }

        // -- Recursive hidden pass ----------------------------------------------

        let mut hidden = Vec::new();
        for node in visible.iter().filter(|n| n.is_directory()) {
            if options.is_cancelled() {
                return PopulateOutcome::Cancelled;
            }
            let Some(uri) = node.uri() else { continue };
            if !self.collect_descendants(uri, filter, options, &mut hidden) {
                return PopulateOutcome::Cancelled;
            }
        }

        let mut combined = visible;
        combined.extend(hidden.into_iter().map(|mut node| {
            node.hidden = true;
            node
        }));
        options.sort(&mut combined);

        if !options.publish(&combined) {
            return PopulateOutcome::Cancelled;
        }
        options.emit(PopulateEvent::Progress {
            folder,
            entries: combined.len(),
        });
        info!(entries = combined.len(), "tree populated with hidden descendants");
        PopulateOutcome::Completed {
            entries: combined.len(),
        }
    }
}
