// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: initialises the backend subsystems and provides
// async-friendly methods for the command line to call.
//
// Populator runs go through `PopulateTask`, so a front end can cancel them
// and receive their events; the CLI simply waits and logs the events.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use folio_bridge::{DocumentTreeProvider, PlatformBridge};
use folio_browser::event::EventReceiver;
use folio_browser::report::ReportEntry;
use folio_browser::{
    AllFilesPopulator, FolderPopulator, PopulateEvent, PopulateOptions, PopulateOutcome,
    PopulateTask, SavedFolder, SdCardCache, SharedList, SqliteReporter, TreePopulator, event,
};
use folio_core::error::{FolioError, Result};
use folio_core::types::FileNode;
use folio_core::uri::TreeUri;
use folio_core::{BrowserConfig, SortOrder};
use tracing::{debug, info, warn};

use super::data_dir;

/// Rows of a finished run.
#[derive(Debug, Clone)]
pub struct Listing {
    pub outcome: PopulateOutcome,
    pub nodes: Vec<FileNode>,
}

/// Result of a document-tree run.
#[derive(Debug, Clone)]
pub struct TreeListing {
    pub listing: Listing,
    pub roots: Vec<FileNode>,
    pub saved: SavedFolder,
}

/// Shared application services.
///
/// All fields are cheaply cloneable (Arc-wrapped) so that the struct can be
/// passed into async blocks without lifetime issues.
#[derive(Clone)]
pub struct AppServices {
    bridge: Arc<dyn PlatformBridge>,
    reporter: Arc<SqliteReporter>,
    sd_cache: SdCardCache,
    data_dir: PathBuf,
    config: Arc<Mutex<BrowserConfig>>,
}

impl AppServices {
    /// Initialise all services.  Call once at startup.
    pub fn init() -> Result<Self> {
        let dir = data_dir::data_dir();
        let bridge = folio_bridge::platform_bridge(&dir.join(GRANTS_FILE))?;
        Self::open(dir, bridge)
    }

    /// Open the services in `dir` with an explicit bridge.
    pub fn open(dir: PathBuf, bridge: Arc<dyn PlatformBridge>) -> Result<Self> {
        info!(path = %dir.display(), platform = bridge.platform_name(), "initialising app services");
        std::fs::create_dir_all(&dir)?;
        let reporter = SqliteReporter::open(dir.join(REPORTS_FILE))?;

        // Load persisted config or use defaults
        let config = load_config(&dir).unwrap_or_default();

        Ok(Self {
            bridge,
            reporter: Arc::new(reporter),
            sd_cache: SdCardCache::with_capacity(config.sd_cache_capacity),
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
        })
    }

    fn options(&self, sink: Arc<SharedList>, sort: Option<SortOrder>) -> PopulateOptions {
        let config = self.config();
        let sort = sort.unwrap_or(config.sort_order);
        PopulateOptions::from_config(&config, sink)
            .with_comparator(Arc::new(sort))
            .with_reporter(self.reporter.clone())
    }

    // -- Browsing ------------------------------------------------------------

    /// List one local directory.
    pub async fn browse(
        &self,
        dir: PathBuf,
        recursive: bool,
        sort: Option<SortOrder>,
        list_folders: bool,
    ) -> Listing {
        let list = Arc::new(SharedList::new());
        let mut options = self.options(list.clone(), sort).recursive(recursive);
        options.filter.list_folders = list_folders;

        let populator = FolderPopulator::new(Some(dir))
            .with_bridge(self.bridge.clone())
            .with_sd_cache(self.sd_cache.clone());
        run(populator, options, list).await.0
    }

    /// Flat list of every document under `root`, or under all storage.
    pub async fn all_files(&self, root: Option<PathBuf>, sort: Option<SortOrder>) -> Listing {
        let list = Arc::new(SharedList::new());
        let options = self.options(list.clone(), sort);
        let populator = AllFilesPopulator::new(root)
            .with_bridge(self.bridge.clone())
            .update_progress(self.config().update_progress);
        run(populator, options, list).await.0
    }

    /// List granted document trees, resuming at a saved folder when given.
    pub async fn trees(
        &self,
        recursive: bool,
        folder: Option<String>,
        leaf: Option<String>,
    ) -> TreeListing {
        let list = Arc::new(SharedList::new());
        let options = self
            .options(list.clone(), Some(SortOrder::ExternalPath))
            .recursive(recursive);
        let populator = TreePopulator::new(self.bridge.clone()).with_saved(folder, leaf);

        let (listing, populator) = run(populator, options, list).await;
        let (roots, saved) = match populator {
            Some(p) => (p.roots().to_vec(), p.saved().clone()),
            None => (Vec::new(), SavedFolder::default()),
        };
        TreeListing {
            listing,
            roots,
            saved,
        }
    }

    // -- Tree grants ---------------------------------------------------------

    pub fn grant(&self, dir: &Path) -> Result<TreeUri> {
        self.bridge.grant_tree(dir)
    }

    /// Release the grant whose tree id is `tree_id`.
    pub fn revoke(&self, tree_id: &str) -> Result<()> {
        let tree = self
            .bridge
            .persisted_trees()?
            .into_iter()
            .find(|t| t.tree_id() == tree_id)
            .ok_or_else(|| FolioError::GrantNotFound(tree_id.to_owned()))?;
        self.bridge.release_tree(&tree)
    }

    pub fn granted_trees(&self) -> Result<Vec<TreeUri>> {
        self.bridge.persisted_trees()
    }

    // -- Entry reports -------------------------------------------------------

    pub fn recent_reports(&self, limit: u32) -> Result<Vec<ReportEntry>> {
        self.reporter.recent(limit)
    }

    pub fn report_count(&self) -> Result<u64> {
        self.reporter.count()
    }

    // -- Config Persistence --------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> BrowserConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Update and persist the config.
    pub fn save_config(&self, config: &BrowserConfig) -> Result<()> {
        *self.config.lock().expect("config lock poisoned") = config.clone();
        persist_config(&self.data_dir, config)
    }

    /// Path to the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Run `populator` in the background, logging its events, and collect the
/// final snapshot.
async fn run<P>(populator: P, options: PopulateOptions, list: Arc<SharedList>) -> (Listing, Option<P>)
where
    P: folio_browser::Populator + 'static,
{
    let (tx, rx) = event::channel();
    let logger = tokio::spawn(log_events(rx));
    let handle = PopulateTask::spawn(populator, options.with_events(tx));

    let (populator, outcome) = match handle.finish().await {
        Some((populator, outcome)) => (Some(populator), outcome),
        None => (None, PopulateOutcome::Cancelled),
    };
    if let Err(e) = logger.await {
        warn!(error = %e, "event logger stopped");
    }
    let listing = Listing {
        outcome,
        nodes: list.snapshot(),
    };
    (listing, populator)
}

async fn log_events(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        match event {
            PopulateEvent::Started { run_id } => debug!(%run_id, "run started"),
            PopulateEvent::Progress { folder, entries } => {
                debug!(?folder, entries, "snapshot published");
            }
            PopulateEvent::RootsLoaded(roots) => debug!(roots = roots.len(), "roots loaded"),
            PopulateEvent::SavedFolderBuilt { root, folder, leaf } => info!(
                root = root.is_some(),
                folder = folder.is_some(),
                leaf = leaf.is_some(),
                "saved folder resolved"
            ),
            PopulateEvent::CurrentRootRemoved => warn!("current root was removed"),
            PopulateEvent::Finished { run_id, outcome } => {
                info!(%run_id, ?outcome, "run finished");
            }
        }
    }
}

// -- Data files --------------------------------------------------------------

const CONFIG_FILE: &str = "config.json";
const GRANTS_FILE: &str = "grants.json";
const REPORTS_FILE: &str = "reports.db";

fn load_config(data_dir: &Path) -> Option<BrowserConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &BrowserConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use folio_bridge::StorageLayout;
    use folio_bridge::desktop::DesktopBridge;
    use tempfile::TempDir;

    use super::*;

    struct Fixture {
        _dir: TempDir,
        primary: PathBuf,
        services: AppServices,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();
        let primary = base.join("storage/emulated/0");
        fs::create_dir_all(primary.join("Docs/sub")).unwrap();
        fs::write(primary.join("Docs/a.pdf"), b"%PDF").unwrap();
        fs::write(primary.join("Docs/sub/b.pdf"), b"%PDF").unwrap();

        let data = base.join("data");
        let layout = StorageLayout {
            storage_root: base.join("storage"),
            primary_storage: primary.clone(),
            external_files_dirs: Vec::new(),
            legacy_mounts: false,
        };
        let bridge = Arc::new(DesktopBridge::open(&data.join(GRANTS_FILE), layout).unwrap());
        let services = AppServices::open(data, bridge).unwrap();
        Fixture {
            _dir: dir,
            primary,
            services,
        }
    }

    fn names(nodes: &[FileNode]) -> Vec<(&str, bool)> {
        nodes.iter().map(|n| (n.name.as_str(), n.hidden)).collect()
    }

    #[tokio::test]
    async fn browse_lists_and_searches() {
        let fx = fixture();
        let docs = fx.primary.join("Docs");

        let flat = fx.services.browse(docs.clone(), false, None, true).await;
        assert_eq!(flat.outcome, PopulateOutcome::Completed { entries: 2 });
        assert_eq!(names(&flat.nodes), [("a.pdf", false), ("sub", false)]);

        let deep = fx.services.browse(docs, true, None, false).await;
        assert_eq!(names(&deep.nodes), [("a.pdf", false), ("b.pdf", true)]);
    }

    #[tokio::test]
    async fn all_files_flattens() {
        let fx = fixture();
        let listing = fx.services.all_files(Some(fx.primary.clone()), None).await;
        assert_eq!(names(&listing.nodes), [("a.pdf", false), ("b.pdf", false)]);
    }

    #[tokio::test]
    async fn grant_then_browse_tree_then_revoke() {
        let fx = fixture();
        let tree = fx.services.grant(&fx.primary.join("Docs")).unwrap();

        let listing = fx
            .services
            .trees(false, Some(tree.to_string()), None)
            .await;
        assert_eq!(listing.roots.len(), 1);
        assert_eq!(listing.saved.folder.as_ref().unwrap().name, "Docs");
        assert_eq!(names(&listing.listing.nodes), [("sub", false), ("a.pdf", false)]);

        fx.services.revoke(tree.tree_id()).unwrap();
        assert!(fx.services.granted_trees().unwrap().is_empty());
        assert!(matches!(
            fx.services.revoke(tree.tree_id()),
            Err(FolioError::GrantNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unreadable_entries_are_recorded() {
        let fx = fixture();
        let missing = fx.primary.join("Docs/missing");
        #[cfg(unix)]
        std::os::unix::fs::symlink(&missing, fx.primary.join("Docs/broken.pdf")).unwrap();

        fx.services
            .browse(fx.primary.join("Docs"), false, None, true)
            .await;

        #[cfg(unix)]
        {
            assert_eq!(fx.services.report_count().unwrap(), 1);
            let entry = &fx.services.recent_reports(10).unwrap()[0];
            assert_eq!(entry.context, "folder");
        }
    }

    #[test]
    fn config_survives_reopen() {
        let fx = fixture();
        let mut config = fx.services.config();
        config.recursive_search = true;
        config.sort_order = SortOrder::ModifiedDate;
        fx.services.save_config(&config).unwrap();

        let reloaded = load_config(fx.services.data_dir()).unwrap();
        assert!(reloaded.recursive_search);
        assert_eq!(reloaded.sort_order, SortOrder::ModifiedDate);
    }

    #[test]
    fn sd_cache_is_sized_from_config() {
        let fx = fixture();
        let mut config = fx.services.config();
        config.sd_cache_capacity = 3;
        fx.services.save_config(&config).unwrap();

        let reopened =
            AppServices::open(fx.services.data_dir().to_path_buf(), fx.services.bridge.clone())
                .unwrap();
        assert_eq!(reopened.sd_cache.capacity(), 3);
    }
}
