// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background execution of populator runs.
//
// Directory walking is blocking I/O, so runs go to tokio's blocking pool. The
// handle carries the run's cancel token; the populator itself is handed back
// on completion so its state (current folder, loaded roots) can seed the next
// run.

use std::panic;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::event::{PopulateEvent, PopulateOutcome};
use crate::options::{PopulateOptions, Populator};

pub struct PopulateTask;

impl PopulateTask {
    /// Start `populator` on the blocking pool. Must be called from within a
    /// tokio runtime.
    pub fn spawn<P>(mut populator: P, options: PopulateOptions) -> TaskHandle<P>
    where
        P: Populator + 'static,
    {
        let run_id = Uuid::new_v4();
        let cancel = options.cancel.clone();
        let span = info_span!("populate", %run_id, populator = populator.name());

        let join = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            options.emit(PopulateEvent::Started { run_id });
            let outcome = populator.populate(&options);
            debug!(?outcome, "run finished");
            // Sent directly: `emit` is muted once the run is cancelled.
            if let Some(events) = &options.events {
                let _ = events.send(PopulateEvent::Finished { run_id, outcome });
            }
            (populator, outcome)
        });

        TaskHandle {
            run_id,
            cancel,
            join,
        }
    }
}

/// Handle to a running populator.
pub struct TaskHandle<P> {
    run_id: Uuid,
    cancel: CancelToken,
    join: JoinHandle<(P, PopulateOutcome)>,
}

impl<P> TaskHandle<P> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Ask the run to stop. It finishes at its next cancellation check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run and return its outcome.
    pub async fn join(self) -> PopulateOutcome {
        match self.finish().await {
            Some((_, outcome)) => outcome,
            None => PopulateOutcome::Cancelled,
        }
    }

    /// Wait for the run and take back the populator with its outcome. `None`
    /// when the runtime dropped the run before it finished. A panic inside
    /// the populator is resumed on the caller.
    pub async fn finish(self) -> Option<(P, PopulateOutcome)> {
        let run_id = self.run_id;
        match self.join.instrument(info_span!("join", %run_id)).await {
            Ok(done) => Some(done),
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!(%run_id, error = %e, "populate task did not finish");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use folio_core::config::SortOrder;
    use tempfile::TempDir;

    use super::*;
    use crate::event;
    use crate::filter::FileFilter;
    use crate::folder::FolderPopulator;
    use crate::sink::SnapshotChannel;

    struct Blocking {
        cancel: CancelToken,
    }

    impl Populator for Blocking {
        fn name(&self) -> &'static str {
            "blocking"
        }

        fn populate(&mut self, options: &PopulateOptions) -> PopulateOutcome {
            while !options.is_cancelled() {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            assert!(self.cancel.is_cancelled());
            PopulateOutcome::Cancelled
        }
    }

    #[tokio::test]
    async fn runs_folder_populator_in_background() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("b.pdf"), b"%PDF").unwrap();

        let (channel, snapshots) = SnapshotChannel::new();
        let (tx, mut rx) = event::channel();
        let options = PopulateOptions::new(Arc::new(channel))
            .with_filter(FileFilter::new(["pdf"]))
            .with_comparator(Arc::new(SortOrder::FileName))
            .with_events(tx);

        let handle = PopulateTask::spawn(
            FolderPopulator::new(Some(dir.path().to_path_buf())),
            options,
        );
        let run_id = handle.run_id();
        let (populator, outcome) = handle.finish().await.unwrap();

        assert_eq!(outcome, PopulateOutcome::Completed { entries: 2 });
        assert_eq!(populator.current_folder(), Some(dir.path()));
        let names: Vec<_> = snapshots.borrow().iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);

        assert_eq!(rx.recv().await, Some(PopulateEvent::Started { run_id }));
        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(PopulateEvent::Finished {
                run_id,
                outcome: PopulateOutcome::Completed { entries: 2 },
            })
        );
    }

    #[tokio::test]
    async fn cancel_stops_the_run_and_still_reports_finished() {
        let (channel, _snapshots) = SnapshotChannel::new();
        let (tx, mut rx) = event::channel();
        let cancel = CancelToken::new();
        let options = PopulateOptions::new(Arc::new(channel))
            .with_cancel(cancel.clone())
            .with_events(tx);

        let handle = PopulateTask::spawn(Blocking { cancel }, options);
        let run_id = handle.run_id();
        handle.cancel();
        assert!(handle.is_cancelled());

        assert_eq!(handle.join().await, PopulateOutcome::Cancelled);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events.last(),
            Some(&PopulateEvent::Finished {
                run_id,
                outcome: PopulateOutcome::Cancelled,
            })
        );
    }
}
