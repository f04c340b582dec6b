//! Resource store contracts consumed by the mirroring core

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::{Resource, ResourcePath, Result};

/// Kind of a store change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    NodeAdded,
    NodeRemoved,
    PropertyAdded,
    PropertyChanged,
    PropertyRemoved,
}

impl ChangeKind {
    /// Whether the event concerns a property rather than a node.
    pub fn is_property(&self) -> bool {
        matches!(
            self,
            ChangeKind::PropertyAdded | ChangeKind::PropertyChanged | ChangeKind::PropertyRemoved
        )
    }
}

/// One change observed in the store.
///
/// Node events carry the node path. Property events carry the property
/// path, i.e. the owning node path joined with the property name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: ResourcePath,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<ResourcePath>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn node_added(path: impl Into<ResourcePath>) -> Self {
        Self::new(ChangeKind::NodeAdded, path)
    }

    pub fn node_removed(path: impl Into<ResourcePath>) -> Self {
        Self::new(ChangeKind::NodeRemoved, path)
    }

    /// Property event for `property` on the node at `node`.
    pub fn property(kind: ChangeKind, node: &ResourcePath, property: &str) -> Self {
        Self::new(kind, node.join(property))
    }
}

/// Callback receiving batches of change events.
///
/// Events from a single store transaction are delivered together in one call.
pub type ChangeListener = Arc<dyn Fn(&[ChangeEvent]) + Send + Sync>;

/// Identifier of an installed change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hierarchical resource store.
///
/// Implementations must be safe to call from many threads at once; lookups
/// are issued concurrently by request handling while change events are
/// delivered from the store's own notification threads.
pub trait ResourceStore: Send + Sync {
    /// Read the resource at `path`, if present.
    fn get_resource(&self, path: &ResourcePath) -> Result<Option<Resource>>;

    /// List the direct children of the resource at `path`.
    fn list_children(&self, path: &ResourcePath) -> Result<Vec<Resource>>;

    /// Whether any resource exists at `path`.
    fn exists(&self, path: &ResourcePath) -> Result<bool>;

    /// Run a query in the given query language.
    fn find_resources(&self, language: &str, query: &str) -> Result<Vec<Resource>>;

    /// Install a change listener for events at or below `root`.
    ///
    /// With `deep = false` only events whose path's parent is `root`, or
    /// which are at `root` itself, are delivered.
    fn subscribe(
        &self,
        root: &ResourcePath,
        deep: bool,
        listener: ChangeListener,
    ) -> Result<SubscriptionId>;

    /// Remove a previously installed change listener.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;

    /// Release the session backing this store handle.
    fn close(&self) {}
}

/// Opens administrative sessions on a store.
pub trait SessionFactory: Send + Sync {
    fn open_session(&self) -> Result<Arc<dyn ResourceStore>>;
}

/// Whether an event at `event_path` is visible to a subscription on `root`.
pub fn subscription_covers(root: &ResourcePath, deep: bool, event_path: &ResourcePath) -> bool {
    if deep {
        event_path.is_same_or_descendant_of(root)
    } else {
        event_path == root || event_path.parent().as_ref() == Some(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_event_path() {
        let node = ResourcePath::new("/content/mirror");
        let event = ChangeEvent::property(ChangeKind::PropertyChanged, &node, "mirror:sourcePath");
        assert_eq!(event.path.as_str(), "/content/mirror/mirror:sourcePath");
        assert_eq!(event.path.parent(), Some(node));
        assert!(event.kind.is_property());
    }

    #[test]
    fn test_subscription_coverage() {
        let root = ResourcePath::new("/content");
        let child = ResourcePath::new("/content/a");
        let grandchild = ResourcePath::new("/content/a/b");
        let outside = ResourcePath::new("/apps/a");

        assert!(subscription_covers(&root, true, &grandchild));
        assert!(!subscription_covers(&root, true, &outside));
        assert!(subscription_covers(&root, false, &child));
        assert!(!subscription_covers(&root, false, &grandchild));
    }
}
