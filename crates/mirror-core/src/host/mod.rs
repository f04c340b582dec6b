//! Host extension point for resource providers
//!
//! A host resolves paths by consulting providers bound at root paths. It
//! holds providers weakly; the [`Registration`] token returned by a bind is
//! what keeps a provider installed, and releasing it (explicitly or by drop)
//! unbinds exactly once.

mod table;

pub use table::ProviderTable;

use std::fmt;
use std::sync::{Arc, Weak};

use mirror_store::{ResourcePath, ResourceStore};
use uuid::Uuid;

use crate::resource::ResourceHandle;
use crate::Result;

/// Serves resources for paths at or below the root it is bound to.
pub trait ResourceProvider: Send + Sync {
    /// Resolve `path`, reading through `resolver`. `None` lets the host
    /// fall through to other providers or the store.
    fn get_resource(&self, resolver: &dyn ResourceStore, path: &ResourcePath) -> Option<ResourceHandle>;

    /// List the children of a handle this provider produced.
    fn list_children(
        &self,
        resolver: &dyn ResourceStore,
        parent: &ResourceHandle,
    ) -> Option<Box<dyn Iterator<Item = ResourceHandle> + Send>>;
}

/// Identifies one provider binding within a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A table of provider bindings.
pub trait ProviderHost: Send + Sync {
    fn bind(&self, root: &ResourcePath, provider: Weak<dyn ResourceProvider>) -> Result<RegistrationId>;

    /// Remove a binding. Unknown ids are ignored.
    fn unbind(&self, id: RegistrationId);
}

/// Proof that a provider is bound in a host.
pub struct Registration {
    host: Arc<dyn ProviderHost>,
    root: ResourcePath,
    id: Option<RegistrationId>,
}

impl Registration {
    /// Bind `provider` at `root`.
    pub fn bind(
        host: Arc<dyn ProviderHost>,
        root: &ResourcePath,
        provider: Weak<dyn ResourceProvider>,
    ) -> Result<Self> {
        let id = host.bind(root, provider)?;
        tracing::debug!(registration = %id, root = %root, "Bound resource provider");
        Ok(Self {
            host,
            root: root.clone(),
            id: Some(id),
        })
    }

    pub fn root(&self) -> &ResourcePath {
        &self.root
    }

    pub fn id(&self) -> Option<RegistrationId> {
        self.id
    }

    /// Unbind now.
    pub fn release(mut self) {
        self.unbind();
    }

    fn unbind(&mut self) {
        if let Some(id) = self.id.take() {
            self.host.unbind(id);
            tracing::debug!(registration = %id, root = %self.root, "Unbound resource provider");
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("root", &self.root)
            .field("id", &self.id)
            .finish()
    }
}
