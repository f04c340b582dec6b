//! In-memory resource store
//!
//! A complete [`ResourceStore`] kept in a single ordered map. Mutations run
//! inside [`MemoryStore::transaction`]; every committed transaction delivers
//! its events to subscribers as one batch, after the tree lock is released,
//! so listeners may read the store from inside their callback.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::resource::DEFAULT_RESOURCE_TYPE;
use crate::store::{
    ChangeEvent, ChangeKind, ChangeListener, ResourceStore, SessionFactory, SubscriptionId,
    subscription_covers,
};
use crate::{Error, PropertyValue, Resource, ResourcePath, Result, ValueMap};

/// Query language selecting nodes that carry a tag.
pub const QUERY_LANGUAGE_TAG: &str = "tag";

/// Query language selecting nodes of a resource type.
pub const QUERY_LANGUAGE_TYPE: &str = "type";

/// Pseudo-property reported in change events when a node's tags change.
pub const TAGS_PROPERTY: &str = ":tags";

#[derive(Debug, Clone)]
struct Node {
    resource_type: String,
    tags: BTreeSet<String>,
    properties: ValueMap,
}

impl Node {
    fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            tags: BTreeSet::new(),
            properties: ValueMap::new(),
        }
    }

    fn to_resource(&self, path: &ResourcePath) -> Resource {
        let mut resource = Resource::new(path.clone(), self.resource_type.clone())
            .with_properties(self.properties.clone());
        for tag in &self.tags {
            resource = resource.with_tag(tag.clone());
        }
        resource
    }
}

type Tree = BTreeMap<ResourcePath, Node>;

struct Listener {
    id: SubscriptionId,
    root: ResourcePath,
    deep: bool,
    callback: ChangeListener,
}

struct Shared {
    nodes: RwLock<Tree>,
    listeners: RwLock<Vec<Listener>>,
    open_sessions: AtomicUsize,
}

/// Thread-safe in-memory tree of resources.
///
/// Cloning is cheap and yields a handle to the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store containing only the root node.
    pub fn new() -> Self {
        let mut nodes = Tree::new();
        nodes.insert(ResourcePath::root(), Node::new(DEFAULT_RESOURCE_TYPE));
        Self {
            shared: Arc::new(Shared {
                nodes: RwLock::new(nodes),
                listeners: RwLock::new(Vec::new()),
                open_sessions: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of sessions opened through [`SessionFactory`] and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    /// Number of installed change subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.read_tree().len()
    }

    /// Run a set of mutations atomically.
    ///
    /// Mutations apply to a working copy that replaces the tree only when
    /// `f` succeeds; on error nothing changes and no events are delivered.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        let (value, events) = {
            let mut nodes = self
                .shared
                .nodes
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let mut working = nodes.clone();
            let mut tx = Transaction {
                nodes: &mut working,
                events: Vec::new(),
            };
            let value = f(&mut tx)?;
            let events = std::mem::take(&mut tx.events);
            *nodes = working;
            (value, events)
        };

        self.dispatch(&events);
        Ok(value)
    }

    pub fn add_node(&self, path: impl Into<ResourcePath>, resource_type: &str) -> Result<()> {
        let path = path.into();
        self.transaction(|tx| tx.add_node(&path, resource_type))
    }

    pub fn tag(&self, path: impl Into<ResourcePath>, tag: &str) -> Result<()> {
        let path = path.into();
        self.transaction(|tx| tx.tag(&path, tag))
    }

    pub fn set_property(
        &self,
        path: impl Into<ResourcePath>,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        let path = path.into();
        let value = value.into();
        self.transaction(|tx| tx.set_property(&path, name, value))
    }

    pub fn remove_property(&self, path: impl Into<ResourcePath>, name: &str) -> Result<bool> {
        let path = path.into();
        self.transaction(|tx| tx.remove_property(&path, name))
    }

    pub fn remove_node(&self, path: impl Into<ResourcePath>) -> Result<()> {
        let path = path.into();
        self.transaction(|tx| tx.remove_node(&path))
    }

    pub fn move_node(&self, from: impl Into<ResourcePath>, to: impl Into<ResourcePath>) -> Result<()> {
        let from = from.into();
        let to = to.into();
        self.transaction(|tx| tx.move_node(&from, &to))
    }

    fn read_tree(&self) -> std::sync::RwLockReadGuard<'_, Tree> {
        self.shared
            .nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }

        // Snapshot the listeners so callbacks can (un)subscribe freely.
        let targets: Vec<(ChangeListener, Vec<ChangeEvent>)> = self
            .shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|listener| {
                let visible: Vec<ChangeEvent> = events
                    .iter()
                    .filter(|e| subscription_covers(&listener.root, listener.deep, &e.path))
                    .cloned()
                    .collect();
                (!visible.is_empty()).then(|| (Arc::clone(&listener.callback), visible))
            })
            .collect();

        for (callback, batch) in targets {
            callback(&batch);
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("nodes", &self.node_count())
            .field("subscriptions", &self.subscription_count())
            .field("open_sessions", &self.open_sessions())
            .finish()
    }
}

impl ResourceStore for MemoryStore {
    fn get_resource(&self, path: &ResourcePath) -> Result<Option<Resource>> {
        Ok(self.read_tree().get(path).map(|node| node.to_resource(path)))
    }

    fn list_children(&self, path: &ResourcePath) -> Result<Vec<Resource>> {
        let nodes = self.read_tree();
        if !nodes.contains_key(path) {
            return Err(Error::not_found(path));
        }

        Ok(nodes
            .iter()
            .filter(|(p, _)| p.parent().as_ref() == Some(path))
            .map(|(p, node)| node.to_resource(p))
            .collect())
    }

    fn exists(&self, path: &ResourcePath) -> Result<bool> {
        Ok(self.read_tree().contains_key(path))
    }

    fn find_resources(&self, language: &str, query: &str) -> Result<Vec<Resource>> {
        if language != QUERY_LANGUAGE_TAG && language != QUERY_LANGUAGE_TYPE {
            return Err(Error::UnsupportedQueryLanguage {
                language: language.to_string(),
            });
        }
        let selects = |node: &Node| match language {
            QUERY_LANGUAGE_TAG => node.tags.contains(query),
            _ => node.resource_type == query,
        };

        Ok(self
            .read_tree()
            .iter()
            .filter(|(_, node)| selects(node))
            .map(|(path, node)| node.to_resource(path))
            .collect())
    }

    fn subscribe(
        &self,
        root: &ResourcePath,
        deep: bool,
        listener: ChangeListener,
    ) -> Result<SubscriptionId> {
        let id = SubscriptionId::new();
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener {
                id,
                root: root.clone(),
                deep,
                callback: listener,
            });
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let mut listeners = self
            .shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        if listeners.len() == before {
            return Err(Error::UnknownSubscription { id });
        }
        Ok(())
    }
}

impl SessionFactory for MemoryStore {
    fn open_session(&self) -> Result<Arc<dyn ResourceStore>> {
        self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemorySession {
            store: self.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A session handle onto a [`MemoryStore`]; rejects calls once closed.
struct MemorySession {
    store: MemoryStore,
    closed: AtomicBool,
}

impl MemorySession {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::SessionClosed)
        } else {
            Ok(())
        }
    }
}

impl ResourceStore for MemorySession {
    fn get_resource(&self, path: &ResourcePath) -> Result<Option<Resource>> {
        self.check_open()?;
        self.store.get_resource(path)
    }

    fn list_children(&self, path: &ResourcePath) -> Result<Vec<Resource>> {
        self.check_open()?;
        self.store.list_children(path)
    }

    fn exists(&self, path: &ResourcePath) -> Result<bool> {
        self.check_open()?;
        self.store.exists(path)
    }

    fn find_resources(&self, language: &str, query: &str) -> Result<Vec<Resource>> {
        self.check_open()?;
        self.store.find_resources(language, query)
    }

    fn subscribe(
        &self,
        root: &ResourcePath,
        deep: bool,
        listener: ChangeListener,
    ) -> Result<SubscriptionId> {
        self.check_open()?;
        self.store.subscribe(root, deep, listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.check_open()?;
        self.store.unsubscribe(id)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.store.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Mutations applied within one [`MemoryStore::transaction`].
pub struct Transaction<'a> {
    nodes: &'a mut Tree,
    events: Vec<ChangeEvent>,
}

impl Transaction<'_> {
    /// Add a node below an existing parent.
    pub fn add_node(&mut self, path: &ResourcePath, resource_type: &str) -> Result<()> {
        if !path.is_absolute() || path.is_root() {
            return Err(Error::invalid_path(path, "node paths must be absolute and below the root"));
        }
        if self.nodes.contains_key(path) {
            return Err(Error::AlreadyExists {
                path: path.to_string(),
            });
        }
        let parent = path
            .parent()
            .ok_or_else(|| Error::invalid_path(path, "path has no parent"))?;
        if !self.nodes.contains_key(&parent) {
            return Err(Error::not_found(parent));
        }

        self.nodes.insert(path.clone(), Node::new(resource_type));
        self.events.push(ChangeEvent::node_added(path.clone()));
        Ok(())
    }

    /// Add a node, creating any missing ancestors with the default type.
    pub fn ensure_node(&mut self, path: &ResourcePath, resource_type: &str) -> Result<()> {
        if self.nodes.contains_key(path) {
            return Ok(());
        }
        if let Some(parent) = path.parent()
            && !self.nodes.contains_key(&parent)
        {
            self.ensure_node(&parent, DEFAULT_RESOURCE_TYPE)?;
        }
        self.add_node(path, resource_type)
    }

    pub fn tag(&mut self, path: &ResourcePath, tag: &str) -> Result<()> {
        let node = self.node_mut(path)?;
        if node.tags.insert(tag.to_string()) {
            self.events.push(ChangeEvent::property(
                ChangeKind::PropertyChanged,
                path,
                TAGS_PROPERTY,
            ));
        }
        Ok(())
    }

    pub fn set_property(
        &mut self,
        path: &ResourcePath,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        let node = self.node_mut(path)?;
        let kind = match node.properties.insert(name, value) {
            Some(_) => ChangeKind::PropertyChanged,
            None => ChangeKind::PropertyAdded,
        };
        self.events.push(ChangeEvent::property(kind, path, name));
        Ok(())
    }

    /// Remove a property; returns whether it was present.
    pub fn remove_property(&mut self, path: &ResourcePath, name: &str) -> Result<bool> {
        let node = self.node_mut(path)?;
        let removed = node.properties.remove(name).is_some();
        if removed {
            self.events.push(ChangeEvent::property(
                ChangeKind::PropertyRemoved,
                path,
                name,
            ));
        }
        Ok(removed)
    }

    /// Remove a node and its whole subtree.
    pub fn remove_node(&mut self, path: &ResourcePath) -> Result<()> {
        if path.is_root() {
            return Err(Error::invalid_path(path, "the root cannot be removed"));
        }
        for (removed, _) in self.take_subtree(path)? {
            self.events.push(ChangeEvent::node_removed(removed));
        }
        Ok(())
    }

    /// Move a node and its subtree to a new path.
    ///
    /// Only node-removed and node-added events are reported; properties of
    /// the moved nodes produce no events.
    pub fn move_node(&mut self, from: &ResourcePath, to: &ResourcePath) -> Result<()> {
        if from.is_root() || to.is_root() || !to.is_absolute() {
            return Err(Error::invalid_path(to, "cannot move to or from the root"));
        }
        if to.is_same_or_descendant_of(from) {
            return Err(Error::invalid_path(to, "cannot move a node below itself"));
        }
        if self.nodes.contains_key(to) {
            return Err(Error::AlreadyExists {
                path: to.to_string(),
            });
        }
        let target_parent = to
            .parent()
            .ok_or_else(|| Error::invalid_path(to, "path has no parent"))?;
        if !self.nodes.contains_key(&target_parent) {
            return Err(Error::not_found(target_parent));
        }

        let subtree = self.take_subtree(from)?;
        let from_prefix_len = from.as_str().len();
        for (old_path, node) in subtree {
            let suffix = &old_path.as_str()[from_prefix_len..];
            let new_path = ResourcePath::new(format!("{}{}", to, suffix));
            self.events.push(ChangeEvent::node_removed(old_path));
            self.events.push(ChangeEvent::node_added(new_path.clone()));
            self.nodes.insert(new_path, node);
        }
        Ok(())
    }

    fn node_mut(&mut self, path: &ResourcePath) -> Result<&mut Node> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| Error::not_found(path))
    }

    fn take_subtree(&mut self, path: &ResourcePath) -> Result<Vec<(ResourcePath, Node)>> {
        if !self.nodes.contains_key(path) {
            return Err(Error::not_found(path));
        }
        let doomed: Vec<ResourcePath> = self
            .nodes
            .keys()
            .filter(|p| p.is_same_or_descendant_of(path))
            .cloned()
            .collect();
        Ok(doomed
            .into_iter()
            .filter_map(|p| self.nodes.remove(&p).map(|node| (p, node)))
            .collect())
    }
}
