// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inputs shared by every populator variant, and the `Populator` trait.

use std::sync::Arc;

use folio_core::config::BrowserConfig;
use folio_core::error::FolioError;
use folio_core::sort::{NodeComparator, sort_nodes};
use folio_core::types::FileNode;
use tracing::trace;

use crate::cancel::CancelToken;
use crate::event::{EventSender, PopulateEvent, PopulateOutcome};
use crate::filter::FileFilter;
use crate::report::{ErrorReporter, TracingReporter};
use crate::sink::SnapshotSink;

/// One way of filling the browser.
pub trait Populator: Send {
    /// Short name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Run to completion or cancellation, publishing through `options.sink`.
    fn populate(&mut self, options: &PopulateOptions) -> PopulateOutcome;
}

/// Everything a populator run needs besides its root.
#[derive(Clone)]
pub struct PopulateOptions {
    pub filter: FileFilter,
    pub comparator: Arc<dyn NodeComparator>,
    /// Collect all descendants as hidden rows.
    pub recursive: bool,
    pub sink: Arc<dyn SnapshotSink>,
    pub cancel: CancelToken,
    pub events: Option<EventSender>,
    pub reporter: Arc<dyn ErrorReporter>,
}

impl PopulateOptions {
    /// Options with the default filter, name order, and no events.
    pub fn new(sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            filter: FileFilter::default(),
            comparator: Arc::new(folio_core::config::SortOrder::FileName),
            recursive: false,
            sink,
            cancel: CancelToken::new(),
            events: None,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Options taken from persisted browser settings.
    pub fn from_config(config: &BrowserConfig, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            filter: FileFilter::from_config(config),
            comparator: Arc::new(config.sort_order),
            recursive: config.recursive_search,
            ..Self::new(sink)
        }
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn NodeComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    // -- Helpers used by the populators ---------------------------------------

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn sort(&self, nodes: &mut [FileNode]) {
        sort_nodes(nodes, self.comparator.as_ref());
    }

    /// Publish a snapshot unless the run was cancelled. Returns whether the
    /// snapshot was published.
    pub fn publish(&self, nodes: &[FileNode]) -> bool {
        if !self.sink.publish_unless_cancelled(nodes, &self.cancel) {
            return false;
        }
        trace!(entries = nodes.len(), "snapshot published");
        true
    }

    /// Send an event to the consumer. Suppressed once cancelled; a dropped
    /// receiver is not an error.
    pub fn emit(&self, event: PopulateEvent) {
        if self.is_cancelled() {
            return;
        }
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Hand a recovered error to the reporter.
    pub fn report(&self, context: &str, error: &FolioError) {
        self.reporter.report(context, error);
    }
}
