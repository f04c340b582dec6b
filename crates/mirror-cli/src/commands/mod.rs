//! Command implementations

mod list;
mod mappings;
mod resolve;

pub use list::run_list;
pub use mappings::run_mappings;
pub use resolve::run_resolve;

use std::path::Path;
use std::sync::Arc;

use mirror_core::{MirrorRegistry, ProviderTable, ResourceHandle};
use mirror_meta::MirrorConfig;
use mirror_store::{MemoryStore, ResourcePath, TreeSnapshot};

use crate::error::{CliError, Result};

/// A loaded tree with an active registry over it.
pub struct Workspace {
    table: Arc<ProviderTable>,
    registry: MirrorRegistry,
}

impl Workspace {
    /// Load the tree, activate the registry and wait for discovery.
    ///
    /// Without a config file the registry is enabled with default queries.
    pub async fn open(config: Option<&Path>, tree: &Path) -> Result<Self> {
        let config = match config {
            Some(path) => mirror_meta::load_config(path)?,
            None => MirrorConfig::enabled(),
        };
        let snapshot = TreeSnapshot::load(tree)?;
        let store = MemoryStore::from_snapshot(&snapshot)?;
        tracing::debug!(nodes = store.node_count(), tree = %tree.display(), "Loaded tree snapshot");

        let table = Arc::new(ProviderTable::new(Arc::new(store.clone())));
        let registry = MirrorRegistry::new(config, Arc::new(store), table.clone());
        registry.activate()?;
        registry.wait_for_discovery().await?;

        Ok(Self { table, registry })
    }

    pub fn registry(&self) -> &MirrorRegistry {
        &self.registry
    }

    pub fn table(&self) -> &ProviderTable {
        &self.table
    }

    /// Resolve a user-supplied path, failing when nothing is there.
    pub fn resolve(&self, path: &str) -> Result<ResourceHandle> {
        let path = ResourcePath::new(path);
        if !path.is_absolute() {
            return Err(CliError::user(format!("path must be absolute: {}", path)));
        }
        self.table
            .resolve(&path)?
            .ok_or_else(|| CliError::user(format!("no resource at {}", path)))
    }

    pub async fn close(self) -> Result<()> {
        self.registry.deactivate().await?;
        Ok(())
    }
}
