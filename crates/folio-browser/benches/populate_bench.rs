// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-browser crate: listing and recursively
// searching a generated directory tree.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

use folio_browser::{AllFilesPopulator, FolderPopulator, PopulateOptions, Populator, SharedList};
use folio_core::config::SortOrder;

/// 8 folders of 3 levels, 25 documents and 5 ignored files per folder.
fn build_tree() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fn fill(dir: &Path, depth: usize) {
        for i in 0..25 {
            fs::write(dir.join(format!("doc-{i:02}.pdf")), b"%PDF").expect("write doc");
        }
        for i in 0..5 {
            fs::write(dir.join(format!("note-{i}.txt")), b"text").expect("write note");
        }
        if depth == 0 {
            return;
        }
        for i in 0..8 {
            let sub = dir.join(format!("folder-{i}"));
            fs::create_dir(&sub).expect("mkdir");
            fill(&sub, depth - 1);
        }
    }
    fill(dir.path(), 2);
    dir
}

fn options(recursive: bool) -> PopulateOptions {
    PopulateOptions::new(Arc::new(SharedList::new()))
        .with_comparator(Arc::new(SortOrder::FileName))
        .recursive(recursive)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_folder(c: &mut Criterion) {
    let tree = build_tree();
    let root = tree.path().to_path_buf();

    c.bench_function("folder (single level)", |b| {
        let opts = options(false);
        b.iter(|| {
            let mut populator = FolderPopulator::new(Some(root.clone()));
            black_box(populator.populate(&opts));
        });
    });

    c.bench_function("folder (recursive, 73 folders)", |b| {
        let opts = options(true);
        b.iter(|| {
            let mut populator = FolderPopulator::new(Some(root.clone()));
            black_box(populator.populate(&opts));
        });
    });
}

fn bench_all_files(c: &mut Criterion) {
    let tree = build_tree();
    let root = tree.path().to_path_buf();

    c.bench_function("all_files (no progress)", |b| {
        let opts = options(false);
        b.iter(|| {
            let mut populator = AllFilesPopulator::new(Some(root.clone())).update_progress(false);
            black_box(populator.populate(&opts));
        });
    });
}

criterion_group!(benches, bench_folder, bench_all_files);
criterion_main!(benches);
