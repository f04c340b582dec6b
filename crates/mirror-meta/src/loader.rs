//! Loading of registry configuration files

use std::path::Path;

use mirror_store::ConfigStore;

use crate::{Error, MirrorConfig, Result};

/// Load a [`MirrorConfig`] from a TOML, JSON or YAML file.
///
/// Discovery queries are validated here, so a malformed query fails the
/// load instead of a later discovery pass.
pub fn load_config(path: &Path) -> Result<MirrorConfig> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let config: MirrorConfig = ConfigStore::new().load(path)?;
    tracing::debug!(
        path = %path.display(),
        enabled = config.enabled,
        queries = config.discovery_queries.len(),
        "Loaded mirror configuration"
    );
    Ok(config)
}
