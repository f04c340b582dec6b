//! Cross-crate scenarios: store events driving the registry and host

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use mirror_core::{
    MirrorManager, MirrorRegistry, ProviderHost, ProviderTable, RegistrationId, ResourceProvider,
};
use mirror_meta::{MirrorConfig, PROP_OVERLAYABLE, PROP_SOURCE_PATH};
use mirror_store::{MemoryStore, ResourcePath};
use mirror_test_utils::TestTree;
use pretty_assertions::assert_eq;

fn path(s: &str) -> ResourcePath {
    ResourcePath::new(s)
}

/// Forwards to a [`ProviderTable`] and counts binds.
struct Counted {
    table: Arc<ProviderTable>,
    binds: AtomicUsize,
}

impl ProviderHost for Counted {
    fn bind(
        &self,
        root: &ResourcePath,
        provider: Weak<dyn ResourceProvider>,
    ) -> mirror_core::Result<RegistrationId> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        self.table.bind(root, provider)
    }

    fn unbind(&self, id: RegistrationId) {
        self.table.unbind(id)
    }
}

struct Scenario {
    store: MemoryStore,
    table: Arc<ProviderTable>,
    host: Arc<Counted>,
    registry: MirrorRegistry,
}

impl Scenario {
    async fn start(tree: TestTree) -> Self {
        let store = tree.store();
        let table = Arc::new(ProviderTable::new(Arc::new(store.clone())));
        let host = Arc::new(Counted {
            table: Arc::clone(&table),
            binds: AtomicUsize::new(0),
        });
        let registry =
            MirrorRegistry::new(MirrorConfig::enabled(), Arc::new(store.clone()), host.clone());
        registry.activate().unwrap();
        registry.wait_for_discovery().await.unwrap();
        Self {
            store,
            table,
            host,
            registry,
        }
    }

    fn binds(&self) -> usize {
        self.host.binds.load(Ordering::SeqCst)
    }

    fn registration(&self, root: &str) -> Option<RegistrationId> {
        self.registry
            .provider(&path(root))
            .and_then(|p| p.registration_id())
    }

    fn served_from(&self, p: &str) -> Option<ResourcePath> {
        self.table
            .resolve(&path(p))
            .unwrap()
            .map(|handle| handle.source_path().clone())
    }
}

#[tokio::test]
async fn test_plain_mirror_lookup_and_listing() {
    let s = Scenario::start(TestTree::sample().mirror("/root/path2", "/root/path1")).await;

    assert_eq!(s.served_from("/root/path2/child"), Some(path("/root/path1/child")));

    let root = s.table.resolve(&path("/root/path2")).unwrap().unwrap();
    let children: Vec<ResourcePath> = s
        .table
        .list_children(&root)
        .unwrap()
        .iter()
        .map(|c| c.path().clone())
        .collect();
    assert_eq!(children, vec![path("/root/path2/child")]);

    s.registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_overlay_falls_through_to_real_node() {
    let s = Scenario::start(
        TestTree::sample()
            .overlay("/root/path2", "/root/path1")
            .node("/root/path2/child", "overlay")
            .page("/root/path1/other"),
    )
    .await;

    let child = s.table.resolve(&path("/root/path2/child")).unwrap().unwrap();
    assert!(!child.is_mirrored());
    assert_eq!(child.resource_type(), "overlay");

    // Paths without a real node still come from the source
    assert_eq!(s.served_from("/root/path2/other"), Some(path("/root/path1/other")));
    // The mirror root itself is never overlaid
    assert_eq!(s.served_from("/root/path2"), Some(path("/root/path1")));

    s.registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_overlay_listing_matches_resolution() {
    let s = Scenario::start(
        TestTree::sample()
            .page("/root/path1/other")
            .overlay("/root/path2", "/root/path1")
            .node("/root/path2/child", "overlay")
            .node("/root/path2/extra", "overlay"),
    )
    .await;

    let root = s.table.resolve(&path("/root/path2")).unwrap().unwrap();
    let listed: Vec<(String, bool, String)> = s
        .table
        .list_children(&root)
        .unwrap()
        .iter()
        .map(|c| (c.path().to_string(), c.is_mirrored(), c.resource_type().to_string()))
        .collect();

    assert_eq!(
        listed,
        vec![
            ("/root/path2/child".to_string(), false, "overlay".to_string()),
            ("/root/path2/extra".to_string(), false, "overlay".to_string()),
            ("/root/path2/other".to_string(), true, "page".to_string()),
        ]
    );
    for (child, mirrored, _) in &listed {
        let resolved = s.table.resolve(&path(child)).unwrap().unwrap();
        assert_eq!(resolved.is_mirrored(), *mirrored, "{}", child);
    }

    s.registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_single_source_change_registers_once() {
    let s = Scenario::start(
        TestTree::sample()
            .page("/root/path3/child")
            .mirror("/root/path2", "/root/path1"),
    )
    .await;
    let binds = s.binds();
    let before = s.registration("/root/path2");

    s.store.set_property("/root/path2", PROP_SOURCE_PATH, "/root/path3").unwrap();

    assert_eq!(s.binds(), binds + 1);
    assert_ne!(s.registration("/root/path2"), before);
    assert_eq!(s.table.binding_count(), 1);
    assert_eq!(s.served_from("/root/path2/child"), Some(path("/root/path3/child")));

    s.registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_unrecognized_property_change_is_ignored() {
    let s = Scenario::start(TestTree::sample().mirror("/root/path2", "/root/path1")).await;
    let binds = s.binds();

    s.store.set_property("/root/path2", "title", "Renamed").unwrap();

    assert_eq!(s.binds(), binds);
    s.registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_move_rescans_and_keeps_unaffected_mirrors() {
    let s = Scenario::start(
        TestTree::sample()
            .mirror("/root/path2", "/root/path1")
            .mirror("/root/path4", "/root/path1"),
    )
    .await;
    let untouched = s.registration("/root/path4");

    s.store.move_node("/root/path2", "/root/path3").unwrap();

    let mirrors = s.registry.registered_mirrors();
    assert_eq!(
        mirrors.keys().cloned().collect::<Vec<_>>(),
        vec![path("/root/path3"), path("/root/path4")]
    );
    assert_eq!(s.registration("/root/path4"), untouched);
    assert_eq!(s.served_from("/root/path3/child"), Some(path("/root/path1/child")));
    assert!(s.table.resolve(&path("/root/path2/child")).unwrap().is_none());
    let summary = s.registry.last_discovery().unwrap();
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.registered, 1);

    s.registry.deactivate().await.unwrap();
}

#[tokio::test]
async fn test_toggling_overlay_switches_resolution() {
    let s = Scenario::start(
        TestTree::sample()
            .mirror("/root/path2", "/root/path1")
            .node("/root/path2/child", "overlay"),
    )
    .await;
    assert_eq!(s.served_from("/root/path2/child"), Some(path("/root/path1/child")));

    s.store.set_property("/root/path2", PROP_OVERLAYABLE, true).unwrap();
    assert_eq!(s.served_from("/root/path2/child"), Some(path("/root/path2/child")));

    s.store.set_property("/root/path2", PROP_OVERLAYABLE, false).unwrap();
    assert_eq!(s.served_from("/root/path2/child"), Some(path("/root/path1/child")));

    s.registry.deactivate().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lookups_during_redefinition() {
    let s = Scenario::start(
        TestTree::sample()
            .page("/root/path3/child")
            .mirror("/root/path2", "/root/path1"),
    )
    .await;
    let allowed = [path("/root/path1/child"), path("/root/path3/child")];

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    if let Some(source) = s.served_from("/root/path2/child") {
                        assert!(allowed.contains(&source), "unexpected source {}", source);
                    }
                }
            });
        }
        scope.spawn(|| {
            for i in 0..50 {
                let source = if i % 2 == 0 { "/root/path3" } else { "/root/path1" };
                s.store.set_property("/root/path2", PROP_SOURCE_PATH, source).unwrap();
            }
        });
    });

    assert_eq!(s.table.binding_count(), 1);
    assert_eq!(s.served_from("/root/path2/child"), Some(path("/root/path1/child")));
    s.registry.deactivate().await.unwrap();
}
