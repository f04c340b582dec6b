//! The mirror registry
//!
//! [`MirrorRegistry`] discovers definition nodes, keeps one
//! [`MirrorProvider`] bound per mirror root, and follows store change
//! events to keep that set current.
//!
//! Lookups never go through the registry: providers are bound in the host
//! and answer on their own. The registry only writes, one root at a time,
//! through the per-key entry API of its concurrent map.

mod actions;
mod discovery;
mod state;

pub use discovery::DiscoverySummary;
pub use state::RegistryState;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mirror_meta::{DefinitionProperties, MirrorConfig};
use mirror_store::{
    ChangeEvent, ChangeListener, Resource, ResourcePath, ResourceStore, Session, SessionFactory,
    Subscription,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::definition::{MirrorDefinition, effective_root};
use crate::host::ProviderHost;
use crate::manager::MirrorManager;
use crate::provider::MirrorProvider;
use crate::{Error, Result};
use actions::{Action, ActionPlan};

/// What a single registration attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterOutcome {
    Registered,
    Unchanged,
    Invalid,
    Failed,
}

/// Resources held while the registry is running.
///
/// Field order is drop order: the subscription goes before the session
/// it was installed through.
struct Runtime {
    subscription: Option<Subscription>,
    discovery: Option<JoinHandle<DiscoverySummary>>,
    cancel: CancellationToken,
    session: Session,
}

struct RegistryInner {
    config: MirrorConfig,
    sessions: Arc<dyn SessionFactory>,
    host: Arc<dyn ProviderHost>,
    providers: DashMap<ResourcePath, Arc<MirrorProvider>>,
    state: RwLock<RegistryState>,
    runtime: Mutex<Option<Runtime>>,
    resolver: RwLock<Option<Arc<dyn ResourceStore>>>,
    last_discovery: Mutex<Option<DiscoverySummary>>,
}

/// Registry of active mirrors.
///
/// ```ignore
/// let registry = MirrorRegistry::new(config, sessions, host);
/// registry.activate()?;
/// registry.wait_for_discovery().await?;
/// // ... providers answer lookups through the host ...
/// registry.deactivate().await?;
/// ```
///
/// Dropping a running registry cancels discovery without waiting for it;
/// a definition the task registers after the drop stays bound until the
/// task finishes. `deactivate().await` waits for the task and releases
/// everything before returning.
pub struct MirrorRegistry {
    inner: Arc<RegistryInner>,
}

impl MirrorRegistry {
    pub fn new(
        config: MirrorConfig,
        sessions: Arc<dyn SessionFactory>,
        host: Arc<dyn ProviderHost>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                sessions,
                host,
                providers: DashMap::new(),
                state: RwLock::new(RegistryState::Inactive),
                runtime: Mutex::new(None),
                resolver: RwLock::new(None),
                last_discovery: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.inner.config
    }

    pub fn state(&self) -> RegistryState {
        self.inner.state()
    }

    /// Start the registry.
    ///
    /// Opens a store session, subscribes to changes below `/`, and starts
    /// discovery in the background; returns without waiting for it. A
    /// disabled registry stays inactive. Must be called within a tokio
    /// runtime.
    pub fn activate(&self) -> Result<()> {
        if !self.inner.config.enabled {
            tracing::info!("Mirroring is disabled; registry stays inactive");
            return Ok(());
        }
        // Held until the runtime is installed so concurrent calls start once.
        let mut runtime = self.inner.runtime();
        if runtime.is_some() {
            tracing::debug!(state = %self.state(), "Mirror registry already active");
            return Ok(());
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let session = Session::open(self.inner.sessions.as_ref()).map_err(|cause| Error::Activation {
            message: "cannot open store session".into(),
            cause,
        })?;
        let store = Arc::clone(session.store());

        let weak = Arc::downgrade(&self.inner);
        let listener: ChangeListener = Arc::new(move |events: &[ChangeEvent]| {
            if let Some(inner) = weak.upgrade() {
                inner.on_change(events);
            }
        });
        // Subscribe before discovery starts so no change is missed.
        let subscription = Subscription::install(Arc::clone(&store), &ResourcePath::root(), true, listener)
            .map_err(|cause| Error::Activation {
                message: "cannot install change subscription".into(),
                cause,
            })?;
        *self.inner.resolver_mut() = Some(Arc::clone(&store));

        let cancel = CancellationToken::new();
        self.inner.set_state(RegistryState::Discovering);
        let task_inner = Arc::clone(&self.inner);
        let task_cancel = cancel.clone();
        let discovery = handle.spawn_blocking(move || {
            let summary = task_inner.discover(store.as_ref(), &task_cancel);
            task_inner.finish_discovery(&summary);
            summary
        });

        *runtime = Some(Runtime {
            subscription: Some(subscription),
            discovery: Some(discovery),
            cancel,
            session,
        });
        tracing::info!(
            queries = self.inner.config.discovery_queries.len(),
            "Mirror registry activated"
        );
        Ok(())
    }

    /// Wait for the background discovery started by [`activate`](Self::activate).
    ///
    /// Returns the summary of the most recent pass, or `None` if no pass
    /// has completed.
    pub async fn wait_for_discovery(&self) -> Result<Option<DiscoverySummary>> {
        let task = {
            let mut runtime = self.inner.runtime();
            runtime.as_mut().and_then(|r| r.discovery.take())
        };
        match task {
            Some(task) => {
                let summary = task.await.map_err(|e| Error::DiscoveryTask {
                    message: e.to_string(),
                })?;
                Ok(Some(summary))
            }
            None => Ok(self.last_discovery()),
        }
    }

    /// Stop the registry.
    ///
    /// Cancels and awaits discovery, unregisters every provider, removes
    /// the subscription, and closes the session. Every step runs even if an
    /// earlier one fails; the first failure is returned.
    pub async fn deactivate(&self) -> Result<()> {
        let runtime = self.inner.runtime().take();
        let Some(mut runtime) = runtime else {
            self.inner.unregister_all();
            self.inner.set_state(RegistryState::Inactive);
            return Ok(());
        };

        let mut first_error: Option<Error> = None;

        runtime.cancel.cancel();
        if let Some(task) = runtime.discovery.take() {
            match task.await {
                Ok(summary) => {
                    tracing::debug!(cancelled = summary.cancelled, "Discovery stopped");
                }
                Err(e) => {
                    tracing::error!("Discovery task failed: {}", e);
                    first_error.get_or_insert(Error::DiscoveryTask {
                        message: e.to_string(),
                    });
                }
            }
        }

        *self.inner.resolver_mut() = None;
        self.inner.unregister_all();

        if let Some(subscription) = runtime.subscription.take()
            && let Err(e) = subscription.remove()
        {
            tracing::error!("Failed to remove change subscription: {}", e);
            first_error.get_or_insert(Error::Store(e));
        }
        runtime.session.close();

        self.inner.providers.clear();
        self.inner.set_state(RegistryState::Inactive);
        tracing::info!("Mirror registry deactivated");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Register the definition stored on `definition`.
    ///
    /// Returns `true` only when a new provider was bound. Invalid
    /// definitions are logged and unregister whatever was at their root.
    pub fn register(&self, definition: &Resource) -> bool {
        self.inner.register(definition) == RegisterOutcome::Registered
    }

    /// Re-read the definition node at `path` and register it.
    ///
    /// A missing node is a no-op.
    pub fn register_path(&self, path: &ResourcePath) -> Result<bool> {
        let outcome = match self.inner.resolver() {
            Some(store) => self.inner.register_path(store.as_ref(), path)?,
            None => {
                let session = Session::open(self.inner.sessions.as_ref())?;
                self.inner.register_path(session.store().as_ref(), path)?
            }
        };
        Ok(outcome == RegisterOutcome::Registered)
    }

    /// Remove the provider at `mirror_root`; returns whether one existed.
    pub fn unregister(&self, mirror_root: &ResourcePath) -> bool {
        self.inner.unregister(mirror_root)
    }

    /// Apply a batch of change events.
    pub fn on_change(&self, events: &[ChangeEvent]) {
        self.inner.on_change(events);
    }

    /// Run a full discovery pass now, on the calling thread.
    pub fn rediscover(&self) -> Result<DiscoverySummary> {
        let cancel = self.inner.cancel_token();
        let summary = match self.inner.resolver() {
            Some(store) => self.inner.discover(store.as_ref(), &cancel),
            None => {
                let session = Session::open(self.inner.sessions.as_ref())?;
                self.inner.discover(session.store().as_ref(), &cancel)
            }
        };
        *self.inner.last_discovery() = Some(summary.clone());
        Ok(summary)
    }

    /// The provider bound at `mirror_root`, if any.
    pub fn provider(&self, mirror_root: &ResourcePath) -> Option<Arc<MirrorProvider>> {
        self.inner
            .providers
            .get(mirror_root)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.inner.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.providers.is_empty()
    }

    pub fn last_discovery(&self) -> Option<DiscoverySummary> {
        self.inner.last_discovery().clone()
    }
}

impl MirrorManager for MirrorRegistry {
    fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    fn registered_mirrors(&self) -> BTreeMap<ResourcePath, MirrorDefinition> {
        self.inner
            .providers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().definition().clone()))
            .collect()
    }
}

impl Drop for MirrorRegistry {
    fn drop(&mut self) {
        let runtime = self.inner.runtime().take();
        if let Some(runtime) = runtime {
            runtime.cancel.cancel();
            *self.inner.resolver_mut() = None;
            self.inner.unregister_all();
            drop(runtime);
            self.inner.set_state(RegistryState::Inactive);
        }
    }
}

impl std::fmt::Debug for MirrorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorRegistry")
            .field("state", &self.state())
            .field("providers", &self.len())
            .finish()
    }
}

impl RegistryInner {
    fn state(&self) -> RegistryState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: RegistryState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn runtime(&self) -> MutexGuard<'_, Option<Runtime>> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolver(&self) -> Option<Arc<dyn ResourceStore>> {
        self.resolver
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn resolver_mut(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<dyn ResourceStore>>> {
        self.resolver.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn last_discovery(&self) -> MutexGuard<'_, Option<DiscoverySummary>> {
        self.last_discovery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token of the running registry, or a fresh one when stopped.
    fn cancel_token(&self) -> CancellationToken {
        self.runtime()
            .as_ref()
            .map(|r| r.cancel.clone())
            .unwrap_or_else(CancellationToken::new)
    }

    fn finish_discovery(&self, summary: &DiscoverySummary) {
        *self.last_discovery() = Some(summary.clone());
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state == RegistryState::Discovering {
            *state = RegistryState::Active;
        }
    }

    fn register(&self, resource: &Resource) -> RegisterOutcome {
        let definition_path = resource.path();
        let properties = DefinitionProperties::extract(resource.properties());

        let definition = match MirrorDefinition::from_properties(definition_path, &properties) {
            Ok(definition) => definition,
            Err(e) => {
                tracing::warn!(definition = %definition_path, "Ignoring invalid mirror definition: {}", e);
                if let Ok(root) = effective_root(definition_path, properties.register_parent) {
                    self.unregister(&root);
                }
                self.unregister_defined_by(definition_path, None);
                return RegisterOutcome::Invalid;
            }
        };
        let root = definition.mirror_root().clone();

        // The node may have stood for another root before, e.g. when
        // its register-parent flag flipped.
        self.unregister_defined_by(definition_path, Some(&root));

        match self.providers.entry(root.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().definition() == &definition {
                    tracing::debug!(mirror_root = %root, "Mirror definition unchanged");
                    return RegisterOutcome::Unchanged;
                }
                entry.get().deactivate();
                let provider = Arc::new(MirrorProvider::new(definition, definition_path.clone()));
                match provider.activate_at(Arc::clone(&self.host)) {
                    Ok(()) => {
                        entry.insert(provider);
                        log_registered(&root, entry.get());
                        RegisterOutcome::Registered
                    }
                    Err(e) => {
                        entry.remove();
                        tracing::error!(mirror_root = %root, "Failed to bind mirror provider: {}", e);
                        RegisterOutcome::Failed
                    }
                }
            }
            Entry::Vacant(entry) => {
                let provider = Arc::new(MirrorProvider::new(definition, definition_path.clone()));
                match provider.activate_at(Arc::clone(&self.host)) {
                    Ok(()) => {
                        log_registered(&root, &provider);
                        entry.insert(provider);
                        RegisterOutcome::Registered
                    }
                    Err(e) => {
                        tracing::error!(mirror_root = %root, "Failed to bind mirror provider: {}", e);
                        RegisterOutcome::Failed
                    }
                }
            }
        }
    }

    fn register_path(
        &self,
        store: &dyn ResourceStore,
        path: &ResourcePath,
    ) -> mirror_store::Result<RegisterOutcome> {
        match store.get_resource(path)? {
            Some(resource) => Ok(self.register(&resource)),
            None => {
                tracing::debug!(definition = %path, "Definition node no longer exists");
                Ok(RegisterOutcome::Unchanged)
            }
        }
    }

    fn unregister(&self, root: &ResourcePath) -> bool {
        match self.providers.remove(root) {
            Some((_, provider)) => {
                provider.deactivate();
                tracing::info!(mirror_root = %root, "Unregistered mirror provider");
                true
            }
            None => false,
        }
    }

    /// Unregister providers read from the node at `definition_path`,
    /// except the one at `keep`.
    fn unregister_defined_by(&self, definition_path: &ResourcePath, keep: Option<&ResourcePath>) {
        let stale: Vec<ResourcePath> = self
            .providers
            .iter()
            .filter(|entry| entry.value().definition_path() == definition_path)
            .filter(|entry| Some(entry.key()) != keep)
            .map(|entry| entry.key().clone())
            .collect();
        for root in stale {
            self.unregister(&root);
        }
    }

    fn unregister_all(&self) {
        let roots: Vec<ResourcePath> = self.providers.iter().map(|e| e.key().clone()).collect();
        for root in roots {
            self.unregister(&root);
        }
    }

    /// Registered roots located at `path` or defined by the node there.
    fn roots_defined_at(&self, path: &ResourcePath) -> Vec<ResourcePath> {
        self.providers
            .iter()
            .filter(|entry| entry.key() == path || entry.value().definition_path() == path)
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn on_change(&self, events: &[ChangeEvent]) {
        if !self.config.enabled {
            return;
        }
        let Some(store) = self.resolver() else {
            tracing::debug!(events = events.len(), "Ignoring changes while inactive");
            return;
        };

        let plan = ActionPlan::collect(events, |path| self.roots_defined_at(path));
        tracing::debug!(
            events = events.len(),
            actions = plan.len(),
            looks_like_move = plan.looks_like_move(),
            "Processing change batch"
        );

        for (path, action) in plan.actions() {
            match action {
                Action::Register => {
                    if let Err(e) = self.register_path(store.as_ref(), path) {
                        tracing::error!(definition = %path, "Failed to read mirror definition: {}", e);
                    }
                }
                Action::Unregister => {
                    self.unregister(path);
                }
            }
        }

        if plan.looks_like_move() {
            if self.config.rescan_on_move {
                tracing::debug!("Nodes were added and a mirror removed; rescanning definitions");
                let summary = self.discover(store.as_ref(), &self.cancel_token());
                *self.last_discovery() = Some(summary);
            } else {
                tracing::debug!("Skipping rescan after move; disabled by configuration");
            }
        }
    }
}

fn log_registered(root: &ResourcePath, provider: &MirrorProvider) {
    tracing::info!(
        mirror_root = %root,
        source_root = %provider.definition().source_root(),
        overlayable = provider.definition().overlayable(),
        "Registered mirror provider"
    );
}
