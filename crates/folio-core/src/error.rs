// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Geometry --
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("ink signature has no points")]
    EmptyInk,

    // -- Browsing --
    #[error("cannot access {path}: {source}")]
    EntryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tree URI: {0}")]
    InvalidUri(String),

    #[error("no persisted grant for tree {0}")]
    GrantNotFound(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl FolioError {
    /// Wrap an I/O failure on a single directory entry.
    pub fn entry_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::EntryAccess {
            path: path.into(),
            source,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
