//! End-to-end integration test for the file-driven flow
//!
//! This test exercises the complete path: config and snapshot loading ->
//! registry activation -> lookups through the host table -> teardown.

use std::sync::Arc;

use mirror_core::{MirrorManager, MirrorRegistry, ProviderTable, RegistryState};
use mirror_meta::load_config;
use mirror_store::{MemoryStore, ResourcePath, ResourceStore, TreeSnapshot};
use mirror_test_utils::TestFiles;
use pretty_assertions::assert_eq;

fn path(s: &str) -> ResourcePath {
    ResourcePath::new(s)
}

/// Load the sample files and start a registry over them.
async fn start(files: &TestFiles, overlayable: bool) -> (MemoryStore, Arc<ProviderTable>, MirrorRegistry) {
    let config = load_config(&files.enabled_config()).unwrap();
    let snapshot = TreeSnapshot::load(&files.sample_tree(overlayable)).unwrap();
    let store = MemoryStore::from_snapshot(&snapshot).unwrap();

    let table = Arc::new(ProviderTable::new(Arc::new(store.clone())));
    let registry = MirrorRegistry::new(config, Arc::new(store.clone()), table.clone());
    registry.activate().unwrap();
    registry.wait_for_discovery().await.unwrap();

    (store, table, registry)
}

#[tokio::test]
async fn test_files_to_lookup() {
    let files = TestFiles::new();
    let (_store, table, registry) = start(&files, false).await;

    assert_eq!(registry.state(), RegistryState::Active);
    let mirrors = registry.registered_mirrors();
    assert_eq!(mirrors.len(), 1);
    assert_eq!(mirrors[&path("/root/path2")].source_root(), &path("/root/path1"));

    // Mirror path presents the source page under its own path
    let child = table.resolve(&path("/root/path2/child")).unwrap().unwrap();
    assert_eq!(child.path(), &path("/root/path2/child"));
    assert_eq!(child.source_path(), &path("/root/path1/child"));
    assert_eq!(child.resource_type(), "page");
    assert_eq!(child.properties().get_str("title"), Some("Child"));

    // Source paths are untouched
    let source = table.resolve(&path("/root/path1/child")).unwrap().unwrap();
    assert!(!source.is_mirrored());

    registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_recursive_listing_stays_under_mirror() {
    let files = TestFiles::new();
    let (_store, table, registry) = start(&files, false).await;

    let mut pending = vec![table.resolve(&path("/root/path2")).unwrap().unwrap()];
    let mut seen = Vec::new();
    while let Some(handle) = pending.pop() {
        for child in table.list_children(&handle).unwrap() {
            seen.push(child.path().to_string());
            pending.push(child);
        }
    }
    seen.sort();

    assert_eq!(seen, vec!["/root/path2/child", "/root/path2/child/leaf"]);
    registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_mirroring_does_not_copy_nodes() {
    let files = TestFiles::new();
    let (store, _table, registry) = start(&files, false).await;

    let seeded = MemoryStore::from_snapshot(&TreeSnapshot::load(&files.sample_tree(false)).unwrap()).unwrap();
    assert_eq!(
        TreeSnapshot::capture(&store).unwrap(),
        TreeSnapshot::capture(&seeded).unwrap()
    );
    assert!(!store.exists(&path("/root/path2/child")).unwrap());

    registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_teardown_releases_store_and_host() {
    let files = TestFiles::new();
    let (store, table, registry) = start(&files, true).await;

    assert_eq!(store.open_sessions(), 1);
    assert_eq!(store.subscription_count(), 1);
    assert_eq!(table.binding_count(), 1);

    registry.deactivate().await.unwrap();

    assert_eq!(registry.state(), RegistryState::Inactive);
    assert_eq!(store.open_sessions(), 0);
    assert_eq!(store.subscription_count(), 0);
    assert_eq!(table.binding_count(), 0);
    assert!(table.resolve(&path("/root/path2/child")).unwrap().is_none());
}
