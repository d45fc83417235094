// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local folder populator.
//
// Lists one directory: accepted files first, then accepted folders, sorted
// and published as a single snapshot. With recursive search on, every folder
// beneath is then walked and its accepted entries are appended as hidden rows
// (searchable, never shown in the listing), and the merged list is published
// again.
//
// Listing the storage root is special: its real children are mount points
// that may be inaccessible or duplicated, so it lists primary storage plus
// the removable volumes the bridge knows about instead.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use folio_bridge::{PlatformBridge, StorageBridge, StorageLayout};
use folio_core::config::BrowserConfig;
use folio_core::error::FolioError;
use folio_core::types::{FileNode, NodeLocation};
use tracing::{debug, info, instrument, warn};

use crate::event::{PopulateEvent, PopulateOutcome};
use crate::filter::FileFilter;
use crate::options::{PopulateOptions, Populator};
use crate::walk::{Level, accept_entry, read_level, walk_error, walker};

const CONTEXT: &str = "folder";

// ---------------------------------------------------------------------------
// SD card cache
// ---------------------------------------------------------------------------

/// Remembers which folders live on removable storage.
///
/// Asking the platform is comparatively slow, and the answer for a given
/// folder does not change while the volume stays mounted, so one cache is
/// shared by every run of the browser. It holds at most `capacity` folders,
/// dropping the least recently used first.
#[derive(Debug, Clone)]
pub struct SdCardCache {
    inner: Arc<Mutex<SdEntries>>,
}

#[derive(Debug)]
struct SdEntries {
    capacity: usize,
    answers: HashMap<PathBuf, bool>,
    /// Least recently used at the front.
    order: VecDeque<PathBuf>,
}

impl SdEntries {
    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.order.iter().position(|p| p == path) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    fn insert(&mut self, path: PathBuf, on_sd_card: bool) {
        if self.answers.insert(path.clone(), on_sd_card).is_some() {
            self.touch(&path);
            return;
        }
        self.order.push_back(path);
        while self.answers.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.answers.remove(&oldest);
            debug!(path = %oldest.display(), "sd card answer evicted");
        }
    }
}

impl Default for SdCardCache {
    fn default() -> Self {
        Self::with_capacity(BrowserConfig::default().sd_cache_capacity)
    }
}

impl SdCardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` folders (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(SdEntries {
                capacity,
                answers: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            })),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("sd card cache lock poisoned").capacity
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("sd card cache lock poisoned")
            .answers
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached answer for `path`; a hit counts as a use.
    pub fn get(&self, path: &Path) -> Option<bool> {
        let mut entries = self.inner.lock().expect("sd card cache lock poisoned");
        let answer = entries.answers.get(path).copied()?;
        entries.touch(path);
        Some(answer)
    }

    /// Cached answer for `path`, asking `bridge` on a miss.
    pub fn resolve(&self, path: &Path, bridge: &dyn PlatformBridge) -> bool {
        if let Some(cached) = self.get(path) {
            return cached;
        }
        let on_sd_card = bridge.is_sd_card(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "sd card check failed");
            false
        });
        self.inner
            .lock()
            .expect("sd card cache lock poisoned")
            .insert(path.to_path_buf(), on_sd_card);
        on_sd_card
    }

    pub fn clear(&self) {
        let mut entries = self.inner.lock().expect("sd card cache lock poisoned");
        entries.answers.clear();
        entries.order.clear();
    }
}

// ---------------------------------------------------------------------------
// Populator
// ---------------------------------------------------------------------------

/// Populates the browser from one local directory.
pub struct FolderPopulator {
    root: Option<PathBuf>,
    bridge: Option<Arc<dyn PlatformBridge>>,
    sd_cache: SdCardCache,
    current_folder: Option<PathBuf>,
}

impl FolderPopulator {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            bridge: None,
            sd_cache: SdCardCache::new(),
            current_folder: None,
        }
    }

    /// Use `bridge` for storage layout and SD card detection.
    pub fn with_bridge(mut self, bridge: Arc<dyn PlatformBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_sd_cache(mut self, cache: SdCardCache) -> Self {
        self.sd_cache = cache;
        self
    }

    /// The directory that was actually listed, once a run has started.
    pub fn current_folder(&self) -> Option<&Path> {
        self.current_folder.as_deref()
    }

    fn layout(&self, options: &PopulateOptions) -> Option<StorageLayout> {
        let bridge = self.bridge.as_ref()?;
        match bridge.storage_layout() {
            Ok(layout) => Some(layout),
            Err(e) => {
                options.report(CONTEXT, &e);
                None
            }
        }
    }

    /// Children of the storage root: primary storage plus the volume roots of
    /// the app's external files directories.
    fn read_storage_root(
        &self,
        layout: &StorageLayout,
        filter: &FileFilter,
        options: &PopulateOptions,
    ) -> Option<Level> {
        let mut candidates = vec![layout.primary_storage.clone()];
        for dir in &layout.external_files_dirs {
            if options.is_cancelled() {
                return None;
            }
            let Some(volume) = layout.volume_root_of(dir) else {
                continue;
            };
            if !filter.accept_external_storage {
                let on_sd_card = match &self.bridge {
                    Some(bridge) => self.sd_cache.resolve(&volume, bridge.as_ref()),
                    None => layout.is_removable(&volume),
                };
                if on_sd_card {
                    continue;
                }
            }
            if !candidates.contains(&volume) {
                candidates.push(volume);
            }
        }

        let mut level = Level::default();
        for (index, path) in candidates.into_iter().enumerate() {
            match fs::metadata(&path) {
                // Primary storage is always listed; volumes go through the filter.
                Ok(metadata) if index == 0 || filter.accept_local(&path, &metadata) => {
                    let node = FileNode::from_metadata(path, &metadata);
                    if node.is_directory() {
                        level.folders.push(node);
                    } else {
                        level.files.push(node);
                    }
                }
                Ok(_) => {}
                Err(e) => options.report(CONTEXT, &FolioError::entry_access(path, e)),
            }
        }
        Some(level)
    }

    /// Append the accepted descendants of `dir` to `out`, the files of each
    /// directory before the contents of its folders. Returns false once
    /// cancelled.
    fn collect_descendants(
        &self,
        dir: &Path,
        filter: &FileFilter,
        options: &PopulateOptions,
        out: &mut Vec<FileNode>,
    ) -> bool {
        let entries = walker(dir)
            .into_iter()
            .filter_entry(|e| filter.accept_path(e.path()));
        for item in entries {
            if options.is_cancelled() {
                return false;
            }
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    options.report(CONTEXT, &walk_error(err, dir));
                    continue;
                }
            };
            if let Some(node) = accept_entry(&entry, filter, options, CONTEXT) {
                if filter.list_folders || !node.is_directory() {
                    out.push(node);
                }
            }
        }
        !options.is_cancelled()
    }
}

/// When `root` is the parent of primary storage (the emulated directory), the
/// same files would be reachable through several aliases; list its parent
/// instead, unless that is the filesystem root.
pub fn resolve_storage_alias(root: PathBuf, layout: &StorageLayout) -> PathBuf {
    if layout.emulated_dir() == Some(root.as_path()) {
        if let Some(parent) = root.parent() {
            if parent != Path::new("/") {
                debug!(from = %root.display(), to = %parent.display(), "storage alias resolved");
                return parent.to_path_buf();
            }
        }
    }
    root
}

impl Populator for FolderPopulator {
    fn name(&self) -> &'static str {
        CONTEXT
    }

    #[instrument(skip_all, fields(root = ?self.root, recursive = options.recursive))]
    fn populate(&mut self, options: &PopulateOptions) -> PopulateOutcome {
        let Some(mut root) = self.root.clone().filter(|r| r.is_dir()) else {
            debug!("no directory to populate");
            return PopulateOutcome::Completed { entries: 0 };
        };

        let layout = self.layout(options);
        let mut filter = options.filter.clone();
        if let Some(layout) = &layout {
            filter = filter.with_layout(layout);
            root = resolve_storage_alias(root, layout);
        }
        if filter.accept_external_storage {
            if let Some(bridge) = &self.bridge {
                self.sd_cache.resolve(&root, bridge.as_ref());
            }
        }
        self.current_folder = Some(root.clone());

        if options.is_cancelled() {
            return PopulateOutcome::Cancelled;
        }

        // -- Root level -------------------------------------------------------

        let level = match &layout {
            Some(layout) if root == layout.storage_root => {
                self.read_storage_root(layout, &filter, options)
            }
            _ => read_level(&root, &filter, options, CONTEXT),
        };
        let Some(mut level) = level else {
            return PopulateOutcome::Cancelled;
        };
        options.sort(&mut level.files);
        options.sort(&mut level.folders);

        let mut visible = level.files.clone();
        if filter.list_folders {
            visible.extend(level.folders.iter().cloned());
        }
        options.sort(&mut visible);

        // A sink may cancel while taking the snapshot.
        if !options.publish(&visible) || options.is_cancelled() {
            return PopulateOutcome::Cancelled;
        }
        let folder = Some(NodeLocation::Local(root.clone()));
        options.emit(PopulateEvent::Progress {
            folder: folder.clone(),
            entries: visible.len(),
        });

        if !options.recursive {
            info!(entries = visible.len(), "folder populated");
            return PopulateOutcome::Completed {
                entries: visible.len(),
            };
        }

        // -- Recursive hidden pass --------------------------------------------

        let mut hidden = Vec::new();
        for sub in &level.folders {
            if options.is_cancelled() {
                return PopulateOutcome::Cancelled;
            }
            if let Some(path) = sub.path() {
                if !self.collect_descendants(path, &filter, options, &mut hidden) {
                    return PopulateOutcome::Cancelled;
                }
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

        info!(entries = combined.len(), "folder populated with hidden descendants");
        PopulateOutcome::Completed {
            entries: combined.len(),
        }
    }
}
