// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio: Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod sort;
pub mod types;
pub mod uri;

pub use config::{BrowserConfig, SortOrder};
pub use error::FolioError;
pub use sort::NodeComparator;
pub use types::*;
pub use uri::TreeUri;
