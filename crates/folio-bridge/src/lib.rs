// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-bridge: Platform storage abstractions for the document browser.
//
// The browser never talks to the operating system about storage volumes or
// permission grants directly. It asks a `PlatformBridge` for the storage
// layout (primary storage, removable volumes) and for the document trees the
// user granted access to. Mobile platforms back this with their content
// providers; desktop builds map grants onto plain directories.

pub mod traits;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod desktop;

use std::path::Path;
use std::sync::Arc;

use folio_core::error::Result;

pub use traits::{DocumentTreeProvider, PlatformBridge, StorageBridge, StorageLayout, TreeEntry};

/// Open the bridge implementation for the target operating system.
///
/// `grants_path` is where granted document trees are persisted on platforms
/// that do not persist them themselves.
pub fn platform_bridge(grants_path: &Path) -> Result<Arc<dyn PlatformBridge>> {
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        let bridge = desktop::DesktopBridge::open(grants_path, StorageLayout::detect())?;
        Ok(Arc::new(bridge))
    }
    #[cfg(any(target_os = "ios", target_os = "android"))]
    {
        let _ = grants_path;
        tracing::warn!("no native storage bridge for this target");
        Err(folio_core::FolioError::PlatformUnavailable)
    }
}
