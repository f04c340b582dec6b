//! Serializable tree snapshots for seeding a [`MemoryStore`]

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::resource::DEFAULT_RESOURCE_TYPE;
use crate::store::ResourceStore;
use crate::{ConfigStore, MemoryStore, ResourcePath, Result, ValueMap};

/// One node of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub path: ResourcePath,
    #[serde(rename = "type", default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "ValueMap::is_empty")]
    pub properties: ValueMap,
}

fn default_resource_type() -> String {
    DEFAULT_RESOURCE_TYPE.to_string()
}

/// A whole tree, listed node by node.
///
/// ```yaml
/// nodes:
///   - path: /content/site-b
///     type: page
///     tags: ["mirror:Mirror"]
///     properties:
///       "mirror:sourcePath": /content/site-a
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
}

impl TreeSnapshot {
    /// Load a snapshot from a TOML, JSON or YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        ConfigStore::new().load(path)
    }

    /// Capture every node of a store, root excluded.
    pub fn capture(store: &MemoryStore) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut pending = vec![ResourcePath::root()];
        while let Some(path) = pending.pop() {
            for child in store.list_children(&path)? {
                pending.push(child.path().clone());
                nodes.push(NodeSnapshot {
                    path: child.path().clone(),
                    resource_type: child.resource_type().to_string(),
                    tags: child.tags().iter().cloned().collect(),
                    properties: child.properties().clone(),
                });
            }
        }
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { nodes })
    }
}

impl MemoryStore {
    /// Build a store from a snapshot, creating missing ancestors.
    pub fn from_snapshot(snapshot: &TreeSnapshot) -> Result<Self> {
        let store = MemoryStore::new();
        store.transaction(|tx| {
            for node in &snapshot.nodes {
                tx.ensure_node(&node.path, &node.resource_type)?;
                for tag in &node.tags {
                    tx.tag(&node.path, tag)?;
                }
                for (name, value) in node.properties.iter() {
                    tx.set_property(&node.path, name, value.clone())?;
                }
            }
            Ok(())
        })?;
        Ok(store)
    }
}
