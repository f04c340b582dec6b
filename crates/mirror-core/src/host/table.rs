//! In-process provider host

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use mirror_store::{ResourcePath, ResourceStore};

use super::{ProviderHost, RegistrationId, ResourceProvider};
use crate::resource::ResourceHandle;
use crate::Result;

struct Binding {
    id: RegistrationId,
    root: ResourcePath,
    provider: Weak<dyn ResourceProvider>,
    seq: u64,
}

/// Resolves paths against bound providers, falling back to the store.
///
/// Providers bound at deeper roots are tried first; among providers bound
/// at the same root, the most recent binding wins.
pub struct ProviderTable {
    store: Arc<dyn ResourceStore>,
    bindings: RwLock<Vec<Binding>>,
    next_seq: AtomicU64,
}

impl ProviderTable {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            bindings: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// The store used for fallback reads and handed to providers.
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Roots with a live binding, sorted.
    pub fn bound_roots(&self) -> Vec<ResourcePath> {
        let mut roots: Vec<ResourcePath> = self
            .read_bindings()
            .iter()
            .filter(|b| b.provider.strong_count() > 0)
            .map(|b| b.root.clone())
            .collect();
        roots.sort();
        roots.dedup();
        roots
    }

    pub fn binding_count(&self) -> usize {
        self.read_bindings().len()
    }

    /// Resolve `path` through the providers covering it, then the store.
    pub fn resolve(&self, path: &ResourcePath) -> Result<Option<ResourceHandle>> {
        for provider in self.providers_covering(path) {
            if let Some(handle) = provider.get_resource(self.store.as_ref(), path) {
                return Ok(Some(handle));
            }
        }
        Ok(self.store.get_resource(path)?.map(ResourceHandle::Stored))
    }

    /// List the children of a resolved handle.
    ///
    /// Proxies are listed by the provider that owns their mirror root, and
    /// real nodes stored below the proxy's path are merged in. Every stored
    /// child is resolved again, so the listing reports what [`resolve`]
    /// returns for each path: an overlay node replaces the proxy at its
    /// path, and a child which is itself a mirror root is served by its
    /// provider.
    ///
    /// [`resolve`]: Self::resolve
    pub fn list_children(&self, parent: &ResourceHandle) -> Result<Vec<ResourceHandle>> {
        if let Some(root) = parent.mirror_root() {
            for provider in self.providers_at(root) {
                if let Some(children) = provider.list_children(self.store.as_ref(), parent) {
                    let mut merged: BTreeMap<ResourcePath, ResourceHandle> = children
                        .map(|child| (child.path().clone(), child))
                        .collect();
                    if self.store.exists(parent.path())? {
                        for child in self.stored_children(parent.path())? {
                            merged.insert(child.path().clone(), child);
                        }
                    }
                    return Ok(merged.into_values().collect());
                }
            }
        }
        self.stored_children(parent.path())
    }

    /// Store children of `path`, each resolved through the providers.
    fn stored_children(&self, path: &ResourcePath) -> Result<Vec<ResourceHandle>> {
        let mut children = Vec::new();
        for child in self.store.list_children(path)? {
            let handle = match self.resolve(child.path())? {
                Some(handle) => handle,
                None => ResourceHandle::Stored(child),
            };
            children.push(handle);
        }
        Ok(children)
    }

    fn read_bindings(&self) -> std::sync::RwLockReadGuard<'_, Vec<Binding>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn providers_covering(&self, path: &ResourcePath) -> Vec<Arc<dyn ResourceProvider>> {
        self.live_providers(|root| path.is_same_or_descendant_of(root))
    }

    fn providers_at(&self, root: &ResourcePath) -> Vec<Arc<dyn ResourceProvider>> {
        self.live_providers(|bound| bound == root)
    }

    /// Upgraded providers whose root matches, deepest root first and newest
    /// first within a root. The lock is released before providers run.
    fn live_providers(&self, matches: impl Fn(&ResourcePath) -> bool) -> Vec<Arc<dyn ResourceProvider>> {
        let mut candidates: Vec<(usize, u64, Arc<dyn ResourceProvider>)> = self
            .read_bindings()
            .iter()
            .filter(|b| matches(&b.root))
            .filter_map(|b| b.provider.upgrade().map(|p| (b.root.depth(), b.seq, p)))
            .collect();
        candidates.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        candidates.into_iter().map(|(_, _, provider)| provider).collect()
    }
}

impl ProviderHost for ProviderTable {
    fn bind(&self, root: &ResourcePath, provider: Weak<dyn ResourceProvider>) -> Result<RegistrationId> {
        let id = RegistrationId::new();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Binding {
                id,
                root: root.clone(),
                provider,
                seq,
            });
        Ok(id)
    }

    fn unbind(&self, id: RegistrationId) {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let before = bindings.len();
        bindings.retain(|b| b.id != id);
        if bindings.len() == before {
            tracing::debug!(registration = %id, "Ignoring unbind of unknown registration");
        }
    }
}

impl std::fmt::Debug for ProviderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTable")
            .field("bindings", &self.binding_count())
            .finish()
    }
}
