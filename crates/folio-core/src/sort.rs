// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Row comparators for the document browser.

use std::cmp::Ordering;

use crate::config::SortOrder;
use crate::types::FileNode;

/// A total order over browser rows.
///
/// Implemented by [`SortOrder`] and by any thread-safe closure, so callers
/// can pass either a preset or an ad-hoc ordering to the populators.
pub trait NodeComparator: Send + Sync {
    fn compare(&self, a: &FileNode, b: &FileNode) -> Ordering;
}

impl<F> NodeComparator for F
where
    F: Fn(&FileNode, &FileNode) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &FileNode, b: &FileNode) -> Ordering {
        self(a, b)
    }
}

impl NodeComparator for SortOrder {
    fn compare(&self, a: &FileNode, b: &FileNode) -> Ordering {
        match self {
            Self::FileName => cmp_ignore_case(&a.name, &b.name),
            Self::AbsolutePath => cmp_ignore_case(&a.parent_path(), &b.parent_path())
                .then_with(|| cmp_ignore_case(&a.absolute_path(), &b.absolute_path())),
            Self::ModifiedDate => cmp_ignore_case(&a.parent_path(), &b.parent_path())
                .then_with(|| newest_first(a, b)),
            Self::ModifiedDateOnly => newest_first(a, b),
            Self::FolderPath => a
                .kind
                .rank()
                .cmp(&b.kind.rank())
                .then_with(|| cmp_ignore_case(&a.absolute_path(), &b.absolute_path())),
            Self::FolderDate => a
                .kind
                .rank()
                .cmp(&b.kind.rank())
                .then_with(|| newest_first(a, b)),
            Self::ExternalPath => directories_first(a, b)
                .then_with(|| cmp_ignore_case(&a.name, &b.name)),
            Self::ExternalDate => directories_first(a, b).then_with(|| newest_first(a, b)),
        }
    }
}

/// Sort rows in place. Stable, so equal rows keep their relative order.
pub fn sort_nodes(nodes: &mut [FileNode], comparator: &dyn NodeComparator) {
    nodes.sort_by(|a, b| comparator.compare(a, b));
}

/// Case-insensitive string comparison.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn newest_first(a: &FileNode, b: &FileNode) -> Ordering {
    b.raw_modified().cmp(&a.raw_modified())
}

fn directories_first(a: &FileNode, b: &FileNode) -> Ordering {
    b.is_directory().cmp(&a.is_directory())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::FileKind;

    fn file(path: &str, millis: i64) -> FileNode {
        let mut node = FileNode::local(FileKind::File, path);
        node.modified = Utc.timestamp_millis_opt(millis).single();
        node
    }

    fn names(nodes: &[FileNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn file_name_ignores_case() {
        let mut nodes = vec![file("/d/b.pdf", 0), file("/d/A.pdf", 0), file("/d/c.pdf", 0)];
        sort_nodes(&mut nodes, &SortOrder::FileName);
        assert_eq!(names(&nodes), ["A.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn modified_date_groups_by_parent() {
        let mut nodes = vec![
            file("/z/old.pdf", 10),
            file("/a/old.pdf", 10),
            file("/a/new.pdf", 20),
        ];
        sort_nodes(&mut nodes, &SortOrder::ModifiedDate);
        let paths: Vec<_> = nodes.iter().map(|n| n.absolute_path()).collect();
        assert_eq!(paths, ["/a/new.pdf", "/a/old.pdf", "/z/old.pdf"]);

        sort_nodes(&mut nodes, &SortOrder::ModifiedDateOnly);
        assert_eq!(nodes[0].absolute_path(), "/a/new.pdf");
    }

    #[test]
    fn folder_orders_put_folders_first() {
        let mut nodes = vec![
            file("/d/a.pdf", 0),
            FileNode::local(FileKind::Folder, "/d/z"),
            file("/d/b.pdf", 0),
        ];
        sort_nodes(&mut nodes, &SortOrder::FolderPath);
        assert_eq!(names(&nodes), ["z", "a.pdf", "b.pdf"]);

        sort_nodes(&mut nodes, &SortOrder::ExternalPath);
        assert_eq!(names(&nodes), ["z", "a.pdf", "b.pdf"]);
    }

    #[test]
    fn closures_are_comparators() {
        let by_size = |a: &FileNode, b: &FileNode| a.size.cmp(&b.size);
        let mut nodes = vec![file("/d/a.pdf", 0), file("/d/b.pdf", 0)];
        nodes[0].size = 9;
        sort_nodes(&mut nodes, &by_size);
        assert_eq!(names(&nodes), ["b.pdf", "a.pdf"]);
    }
}
