// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Publish targets for populator snapshots.
//
// Every publish hands over a complete, sorted snapshot; a sink never sees a
// partial list. `SharedList` swaps the contents of a mutex-guarded vector
// inside one critical section. `SnapshotChannel` gives consumers immutable
// `Arc<[FileNode]>` snapshots through a `tokio::sync::watch` channel, so
// readers never hold a lock the populator needs.

use std::sync::{Arc, Mutex};

use folio_core::types::FileNode;
use tokio::sync::watch;

use crate::cancel::CancelToken;

/// Receives complete snapshots from a populator run.
pub trait SnapshotSink: Send + Sync {
    /// Replace the current contents with `nodes`.
    fn publish(&self, nodes: &[FileNode]);

    /// Replace the contents unless `cancel` is set. Returns whether `nodes`
    /// were published.
    ///
    /// Sinks with a critical section re-check the token inside it, so once
    /// `cancel()` has returned no later publish can change the contents. The
    /// default checks before publishing, which leaves a window for a cancel
    /// that lands between the two.
    fn publish_unless_cancelled(&self, nodes: &[FileNode], cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        self.publish(nodes);
        true
    }
}

// ---------------------------------------------------------------------------
// SharedList
// ---------------------------------------------------------------------------

/// A caller-owned list guarded by a mutex, shared with the populator.
#[derive(Debug, Clone, Default)]
pub struct SharedList {
    inner: Arc<Mutex<Vec<FileNode>>>,
}

impl SharedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing list the caller already shares elsewhere.
    pub fn from_shared(inner: Arc<Mutex<Vec<FileNode>>>) -> Self {
        Self { inner }
    }

    /// The underlying list, for callers that need to hold the lock.
    pub fn shared(&self) -> Arc<Mutex<Vec<FileNode>>> {
        Arc::clone(&self.inner)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<FileNode> {
        self.inner.lock().expect("shared list lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("shared list lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotSink for SharedList {
    fn publish(&self, nodes: &[FileNode]) {
        let mut list = self.inner.lock().expect("shared list lock poisoned");
        list.clear();
        list.extend_from_slice(nodes);
    }

    fn publish_unless_cancelled(&self, nodes: &[FileNode], cancel: &CancelToken) -> bool {
        let mut list = self.inner.lock().expect("shared list lock poisoned");
        if cancel.is_cancelled() {
            return false;
        }
        list.clear();
        list.extend_from_slice(nodes);
        true
    }
}

// ---------------------------------------------------------------------------
// SnapshotChannel
// ---------------------------------------------------------------------------

/// Publishes immutable snapshots to any number of watchers.
#[derive(Debug)]
pub struct SnapshotChannel {
    tx: watch::Sender<Arc<[FileNode]>>,
}

impl SnapshotChannel {
    /// Create the channel, starting from an empty snapshot.
    pub fn new() -> (Self, watch::Receiver<Arc<[FileNode]>>) {
        let (tx, rx) = watch::channel(Arc::from(Vec::new()));
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<[FileNode]>> {
        self.tx.subscribe()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Arc<[FileNode]> {
        self.tx.borrow().clone()
    }
}

impl SnapshotSink for SnapshotChannel {
    fn publish(&self, nodes: &[FileNode]) {
        // send_replace succeeds even when every receiver has been dropped.
        self.tx.send_replace(Arc::from(nodes));
    }

    fn publish_unless_cancelled(&self, nodes: &[FileNode], cancel: &CancelToken) -> bool {
        // The closure runs under the channel's write lock.
        self.tx.send_if_modified(|current| {
            if cancel.is_cancelled() {
                return false;
            }
            *current = Arc::from(nodes);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::types::FileKind;

    fn nodes(names: &[&str]) -> Vec<FileNode> {
        names
            .iter()
            .map(|n| FileNode::local(FileKind::File, format!("/d/{n}")))
            .collect()
    }

    #[test]
    fn shared_list_replaces_contents() {
        let list = SharedList::new();
        list.publish(&nodes(&["a.pdf", "b.pdf"]));
        list.publish(&nodes(&["c.pdf"]));
        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "c.pdf");
    }

    #[test]
    fn shared_list_wraps_existing_vec() {
        let shared = Arc::new(Mutex::new(nodes(&["old.pdf"])));
        let list = SharedList::from_shared(Arc::clone(&shared));
        list.publish(&nodes(&["new.pdf"]));
        assert_eq!(shared.lock().unwrap()[0].name, "new.pdf");
    }

    #[test]
    fn cancel_while_list_is_held_stops_the_pending_publish() {
        let list = SharedList::new();
        list.publish(&nodes(&["old.pdf"]));
        let cancel = CancelToken::new();

        let shared = list.shared();
        let guard = shared.lock().unwrap();
        let publisher = {
            let list = list.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                list.publish_unless_cancelled(&nodes(&["new.pdf"]), &cancel)
            })
        };
        // The publisher can only take the lock after this cancel.
        cancel.cancel();
        drop(guard);

        assert!(!publisher.join().unwrap());
        assert_eq!(list.snapshot()[0].name, "old.pdf");
    }

    #[test]
    fn cancelled_channel_keeps_its_snapshot() {
        let (channel, rx) = SnapshotChannel::new();
        let cancel = CancelToken::new();
        assert!(channel.publish_unless_cancelled(&nodes(&["a.pdf"]), &cancel));

        cancel.cancel();
        assert!(!channel.publish_unless_cancelled(&nodes(&["b.pdf", "c.pdf"]), &cancel));
        assert_eq!(rx.borrow()[0].name, "a.pdf");
        assert_eq!(channel.latest().len(), 1);
    }

    #[tokio::test]
    async fn channel_delivers_latest_snapshot() {
        let (channel, mut rx) = SnapshotChannel::new();
        assert!(rx.borrow().is_empty());

        channel.publish(&nodes(&["a.pdf"]));
        channel.publish(&nodes(&["a.pdf", "b.pdf"]));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);
        assert_eq!(channel.latest().len(), 2);
    }
}
