// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local directory walking shared by the folder and all-files populators.
//
// Walks never follow symbolic links, including a linked root, so link cycles
// cannot trap a recursive run. Within each directory files come before
// subdirectories, which lets callers treat the run of files preceding the
// first directory entry as that directory's complete file list.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;

use folio_core::error::FolioError;
use folio_core::sort::cmp_ignore_case;
use folio_core::types::FileNode;
use walkdir::{DirEntry, WalkDir};

use crate::filter::FileFilter;
use crate::options::PopulateOptions;

/// Accepted entries of one directory, split by kind.
#[derive(Debug, Default)]
pub(crate) struct Level {
    pub files: Vec<FileNode>,
    pub folders: Vec<FileNode>,
}

/// Walker over everything below `root`, files of a directory before its
/// subdirectories, names compared case-insensitively.
pub(crate) fn walker(root: &Path) -> WalkDir {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by(files_first)
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| {
            cmp_ignore_case(
                &a.file_name().to_string_lossy(),
                &b.file_name().to_string_lossy(),
            )
        })
}

/// The node for a walked entry, or `None` when the filter rejects it.
///
/// Metadata follows links, so a link to a directory becomes a folder row even
/// though the walk does not descend into it. Entries whose metadata cannot be
/// read are reported.
pub(crate) fn accept_entry(
    entry: &DirEntry,
    filter: &FileFilter,
    options: &PopulateOptions,
    context: &str,
) -> Option<FileNode> {
    let path = entry.path();
    match fs::metadata(path) {
        Ok(metadata) if filter.accept_local(path, &metadata) => {
            Some(FileNode::from_metadata(path.to_path_buf(), &metadata))
        }
        Ok(_) => None,
        Err(e) => {
            options.report(context, &FolioError::entry_access(path, e));
            None
        }
    }
}

/// Convert a walk failure below `root` into an entry access error.
pub(crate) fn walk_error(err: walkdir::Error, root: &Path) -> FolioError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    FolioError::entry_access(path, source)
}

/// List `dir`, keeping entries `filter` accepts.
///
/// Unreadable directories and entries are reported and skipped. Returns
/// `None` once the run is cancelled.
pub(crate) fn read_level(
    dir: &Path,
    filter: &FileFilter,
    options: &PopulateOptions,
    context: &str,
) -> Option<Level> {
    let mut level = Level::default();
    let entries = walker(dir)
        .max_depth(1)
        .follow_root_links(true)
        .into_iter()
        .filter_entry(|e| filter.accept_path(e.path()));
    for item in entries {
        if options.is_cancelled() {
            return None;
        }
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                options.report(context, &walk_error(err, dir));
                continue;
            }
        };
        let Some(node) = accept_entry(&entry, filter, options, context) else {
            continue;
        };
        if node.is_directory() {
            level.folders.push(node);
        } else {
            level.files.push(node);
        }
    }
    if options.is_cancelled() {
        return None;
    }
    Some(level)
}
