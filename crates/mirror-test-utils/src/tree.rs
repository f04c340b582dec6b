//! Tree fixtures

use std::fs;
use std::path::{Path, PathBuf};

use mirror_meta::{MIRROR_MARKER, PROP_OVERLAYABLE, PROP_REGISTER_PARENT, PROP_SOURCE_PATH};
use mirror_store::{MemoryStore, ResourcePath};
use tempfile::TempDir;

/// Builder for an in-memory tree.
///
/// Missing ancestors are created as plain nodes.
///
/// ```rust,no_run
/// use mirror_test_utils::TestTree;
///
/// let tree = TestTree::new()
///     .page("/root/path1/child")
///     .mirror("/root/path2", "/root/path1");
/// ```
pub struct TestTree {
    store: MemoryStore,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
        }
    }

    /// `/root/path1` with a `child` page, and an empty `/root/path2`.
    pub fn sample() -> Self {
        Self::new()
            .page("/root/path1/child")
            .node("/root/path2", "folder")
    }

    pub fn node(self, path: &str, resource_type: &str) -> Self {
        let path = ResourcePath::new(path);
        self.store
            .transaction(|tx| tx.ensure_node(&path, resource_type))
            .unwrap_or_else(|e| panic!("TestTree::node({}): {}", path, e));
        self
    }

    pub fn page(self, path: &str) -> Self {
        self.node(path, "page")
    }

    /// Tag `path` as a mirror of `source`.
    pub fn mirror(self, path: &str, source: &str) -> Self {
        self.mirror_with(path, source, false, false)
    }

    /// Tag `path` as an overlayable mirror of `source`.
    pub fn overlay(self, path: &str, source: &str) -> Self {
        self.mirror_with(path, source, true, false)
    }

    /// Write a full definition onto `path` in one transaction.
    pub fn mirror_with(self, path: &str, source: &str, overlayable: bool, register_parent: bool) -> Self {
        let path = ResourcePath::new(path);
        self.store
            .transaction(|tx| {
                tx.ensure_node(&path, "folder")?;
                tx.tag(&path, MIRROR_MARKER)?;
                tx.set_property(&path, PROP_SOURCE_PATH, source)?;
                tx.set_property(&path, PROP_OVERLAYABLE, overlayable)?;
                tx.set_property(&path, PROP_REGISTER_PARENT, register_parent)?;
                Ok(())
            })
            .unwrap_or_else(|e| panic!("TestTree::mirror_with({}): {}", path, e));
        self
    }

    /// The store, sharing the tree with this builder.
    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }
}

/// A temporary directory holding config and snapshot files.
pub struct TestFiles {
    temp_dir: TempDir,
}

impl Default for TestFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFiles {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `name` below the root and return its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("Could not write {}: {}", path.display(), e));
        path
    }

    /// Write an enabled `mirror.toml` with the default queries.
    pub fn enabled_config(&self) -> PathBuf {
        self.write("mirror.toml", "enabled = true\n")
    }

    /// Write a YAML tree snapshot with the sample tree and one mirror of it.
    pub fn sample_tree(&self, overlayable: bool) -> PathBuf {
        let content = format!(
            r#"nodes:
  - path: /root/path1
    type: folder
  - path: /root/path1/child
    type: page
    properties:
      title: Child
  - path: /root/path1/child/leaf
    type: page
  - path: /root/path2
    type: folder
    tags: ["{marker}"]
    properties:
      "{source}": /root/path1
      "{overlayable_prop}": {overlayable}
"#,
            marker = MIRROR_MARKER,
            source = PROP_SOURCE_PATH,
            overlayable_prop = PROP_OVERLAYABLE,
            overlayable = overlayable,
        );
        self.write("tree.yaml", &content)
    }
}
