// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notifications sent from a populator run to its single consumer.

use folio_core::types::{FileNode, NodeLocation};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// How a populator run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopulateOutcome {
    /// The run finished; `entries` rows were in its last snapshot.
    Completed { entries: usize },
    /// The run stopped early. Whatever was published before stays published.
    Cancelled,
}

impl PopulateOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Progress notifications, in the order a run emits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PopulateEvent {
    Started { run_id: Uuid },
    /// A snapshot was published. `folder` is the directory actually listed,
    /// after any storage alias was resolved.
    Progress {
        folder: Option<NodeLocation>,
        entries: usize,
    },
    /// Document-tree roots after the root-level listing was published.
    RootsLoaded(Vec<FileNode>),
    /// Saved folder/leaf URIs were resolved against the tree roots.
    SavedFolderBuilt {
        root: Option<FileNode>,
        folder: Option<FileNode>,
        leaf: Option<FileNode>,
    },
    /// The root the caller was browsing is no longer granted.
    CurrentRootRemoved,
    Finished {
        run_id: Uuid,
        outcome: PopulateOutcome,
    },
}

pub type EventSender = mpsc::UnboundedSender<PopulateEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PopulateEvent>;

/// Create the event channel for one consumer.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
