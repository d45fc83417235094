// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio Browser: populators that fill the document browser from local
// folders, granted document trees, or the whole of device storage.
//
// A populator run enumerates, filters and sorts entries, then publishes
// complete snapshots to a caller-owned `SnapshotSink`. Runs execute on tokio's
// blocking pool via `PopulateTask` and are cancelled cooperatively through a
// `CancelToken`.

pub mod all_files;
pub mod cancel;
pub mod event;
pub mod filter;
pub mod folder;
pub mod options;
pub mod report;
pub mod sink;
pub mod task;
pub mod tree;
mod walk;

pub use all_files::AllFilesPopulator;
pub use cancel::CancelToken;
pub use event::{EventSender, PopulateEvent, PopulateOutcome};
pub use filter::FileFilter;
pub use folder::{FolderPopulator, SdCardCache};
pub use options::{PopulateOptions, Populator};
pub use report::{ErrorReporter, SqliteReporter, TracingReporter};
pub use sink::{SharedList, SnapshotChannel, SnapshotSink};
pub use task::{PopulateTask, TaskHandle};
pub use tree::{SavedFolder, TreePopulator};
