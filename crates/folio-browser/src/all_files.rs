// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// All-files populator: a flat list of every accepted document below one or
// more roots, published progressively as the walk proceeds.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_bridge::{PlatformBridge, StorageBridge};
use folio_core::error::FolioError;
use folio_core::types::{FileNode, NodeLocation};
use tracing::{debug, info, instrument};

use crate::event::{PopulateEvent, PopulateOutcome};
use crate::filter::FileFilter;
use crate::options::{PopulateOptions, Populator};
use crate::walk::{accept_entry, walk_error, walker};

const CONTEXT: &str = "all-files";

pub struct AllFilesPopulator {
    root: Option<PathBuf>,
    bridge: Option<Arc<dyn PlatformBridge>>,
    update_progress: bool,
}

impl AllFilesPopulator {
    /// Walk `root`, or primary storage plus every SD card when `None`.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            bridge: None,
            update_progress: true,
        }
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn PlatformBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Publish after every directory that contributed files.
    pub fn update_progress(mut self, update: bool) -> Self {
        self.update_progress = update;
        self
    }

    fn roots(&self, options: &PopulateOptions) -> Vec<PathBuf> {
        if let Some(root) = &self.root {
            return vec![root.clone()];
        }
        let Some(bridge) = &self.bridge else {
            return Vec::new();
        };
        let mut roots = Vec::new();
        match bridge.storage_layout() {
            Ok(layout) => roots.push(layout.primary_storage),
            Err(e) => options.report(CONTEXT, &e),
        }
        match bridge.sd_card_roots() {
            Ok(sd_roots) => roots.extend(sd_roots),
            Err(e) => options.report(CONTEXT, &e),
        }
        roots
    }

    /// Depth-first walk appending accepted files to `acc`, one directory at a
    /// time. Returns false once cancelled.
    fn walk(
        &self,
        root: &Path,
        filter: &FileFilter,
        options: &PopulateOptions,
        acc: &mut Vec<FileNode>,
    ) -> bool {
        let mut batch = Batch {
            dir: root.to_path_buf(),
            files: Vec::new(),
        };
        let entries = walker(root)
            .into_iter()
            .filter_entry(|e| filter.accept_path(e.path()));
        for item in entries {
            if options.is_cancelled() {
                return false;
            }
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    options.report(CONTEXT, &walk_error(err, root));
                    continue;
                }
            };
            // Files of a directory precede its subdirectories.
            if entry.file_type().is_dir() {
                if !self.flush(&mut batch, options, acc) {
                    return false;
                }
                continue;
            }
            let Some(node) = accept_entry(&entry, filter, options, CONTEXT) else {
                continue;
            };
            if node.is_directory() {
                continue;
            }
            if batch.files.is_empty() {
                if let Some(parent) = entry.path().parent() {
                    batch.dir = parent.to_path_buf();
                }
            }
            batch.files.push(node);
        }
        self.flush(&mut batch, options, acc) && !options.is_cancelled()
    }

    /// Move a finished directory's files into `acc`, publishing when progress
    /// updates are on. Returns false once cancelled.
    fn flush(
        &self,
        batch: &mut Batch,
        options: &PopulateOptions,
        acc: &mut Vec<FileNode>,
    ) -> bool {
        if batch.files.is_empty() {
            return !options.is_cancelled();
        }
        options.sort(&mut batch.files);
        acc.append(&mut batch.files);
        if self.update_progress {
            if !options.publish(acc) {
                return false;
            }
            options.emit(PopulateEvent::Progress {
                folder: Some(NodeLocation::Local(batch.dir.clone())),
                entries: acc.len(),
            });
        }
        !options.is_cancelled()
    }
}

/// Files of one directory waiting to be appended.
struct Batch {
    dir: PathBuf,
    files: Vec<FileNode>,
}

impl Populator for AllFilesPopulator {
    fn name(&self) -> &'static str {
        CONTEXT
    }

    #[instrument(skip_all, fields(root = ?self.root))]
    fn populate(&mut self, options: &PopulateOptions) -> PopulateOutcome {
        let mut filter = options.filter.clone();
        if let Some(bridge) = &self.bridge {
            match bridge.storage_layout() {
                Ok(layout) => filter = filter.with_layout(&layout),
                Err(e) => options.report(CONTEXT, &e),
            }
        }

        let mut roots = Vec::new();
        for path in self.roots(options) {
            match fs::metadata(&path) {
                Ok(metadata) if metadata.is_dir() => {
                    roots.push(FileNode::from_metadata(path, &metadata));
                }
                Ok(_) => debug!(path = %path.display(), "root is not a directory"),
                Err(e) => options.report(CONTEXT, &FolioError::entry_access(path, e)),
            }
        }
        options.sort(&mut roots);

        let mut acc = Vec::new();
        for root in &roots {
            if options.is_cancelled() {
                return PopulateOutcome::Cancelled;
            }
            let Some(path) = root.path() else { continue };
            if !self.walk(path, &filter, options, &mut acc) {
                return PopulateOutcome::Cancelled;
            }
        }

        options.sort(&mut acc);
        if !options.publish(&acc) {
            return PopulateOutcome::Cancelled;
        }
        info!(roots = roots.len(), entries = acc.len(), "all files populated");
        PopulateOutcome::Completed { entries: acc.len() }
    }
}
