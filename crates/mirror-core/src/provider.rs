//! Mirror providers
//!
//! A [`MirrorProvider`] answers lookups for one [`MirrorDefinition`] and
//! owns the [`Registration`] that installs it in a host.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mirror_store::{Resource, ResourcePath, ResourceStore};

use crate::definition::MirrorDefinition;
use crate::host::{ProviderHost, Registration, RegistrationId, ResourceProvider};
use crate::mapper;
use crate::resource::{MirrorResource, ResourceHandle};
use crate::Result;

pub struct MirrorProvider {
    definition: MirrorDefinition,
    definition_path: ResourcePath,
    registration: Mutex<Option<Registration>>,
}

impl MirrorProvider {
    /// Create an inactive provider for a definition read from the node at
    /// `definition_path`.
    pub fn new(definition: MirrorDefinition, definition_path: ResourcePath) -> Self {
        Self {
            definition,
            definition_path,
            registration: Mutex::new(None),
        }
    }

    pub fn definition(&self) -> &MirrorDefinition {
        &self.definition
    }

    /// Path of the node the definition was read from. Differs from the
    /// mirror root when the definition registers its parent.
    pub fn definition_path(&self) -> &ResourcePath {
        &self.definition_path
    }

    pub fn mirror_root(&self) -> &ResourcePath {
        self.definition.mirror_root()
    }

    /// Bind this provider at its mirror root. Binding an active provider
    /// again is a no-op.
    pub fn activate_at(self: &Arc<Self>, host: Arc<dyn ProviderHost>) -> Result<()> {
        let mut registration = self.registration();
        if registration.is_some() {
            return Ok(());
        }
        let provider: Arc<dyn ResourceProvider> = self.clone();
        *registration = Some(Registration::bind(
            host,
            self.mirror_root(),
            Arc::downgrade(&provider),
        )?);
        Ok(())
    }

    /// Release the host binding, if held.
    pub fn deactivate(&self) {
        let released = self.registration().take();
        if let Some(registration) = released {
            registration.release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.registration().is_some()
    }

    pub fn registration_id(&self) -> Option<RegistrationId> {
        self.registration().as_ref().and_then(Registration::id)
    }

    /// Resolve a mirror path to a proxy of the resource it maps to.
    ///
    /// Store failures are logged and read as "not found".
    pub fn lookup(&self, resolver: &dyn ResourceStore, path: &ResourcePath) -> Option<MirrorResource> {
        let target = match mapper::resolve_forward(&self.definition, path, |p| resolver.exists(p)) {
            Ok(target) => target?,
            Err(e) => {
                tracing::error!(
                    mirror_root = %self.mirror_root(),
                    path = %path,
                    "Overlay check failed: {}",
                    e
                );
                return None;
            }
        };

        match resolver.get_resource(&target) {
            Ok(Some(resource)) => Some(MirrorResource::new(
                path.clone(),
                self.mirror_root().clone(),
                resource,
            )),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(
                    mirror_root = %self.mirror_root(),
                    source_path = %target,
                    "Failed to read mirrored resource: {}",
                    e
                );
                None
            }
        }
    }

    /// List the children of a proxy this provider produced, presented at
    /// their mirror paths.
    pub fn children(&self, resolver: &dyn ResourceStore, parent: &MirrorResource) -> Option<MirrorChildren> {
        if parent.mirror_root() != self.mirror_root() {
            return None;
        }
        match resolver.list_children(parent.source_path()) {
            Ok(children) => Some(MirrorChildren {
                definition: self.definition.clone(),
                children: children.into_iter(),
            }),
            Err(e) => {
                tracing::error!(
                    mirror_root = %self.mirror_root(),
                    source_path = %parent.source_path(),
                    "Failed to list mirrored children: {}",
                    e
                );
                None
            }
        }
    }

    fn registration(&self) -> MutexGuard<'_, Option<Registration>> {
        self.registration.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for MirrorProvider {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl std::fmt::Debug for MirrorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorProvider")
            .field("definition", &self.definition)
            .field("definition_path", &self.definition_path)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ResourceProvider for MirrorProvider {
    fn get_resource(&self, resolver: &dyn ResourceStore, path: &ResourcePath) -> Option<ResourceHandle> {
        self.lookup(resolver, path).map(ResourceHandle::Mirrored)
    }

    fn list_children(
        &self,
        resolver: &dyn ResourceStore,
        parent: &ResourceHandle,
    ) -> Option<Box<dyn Iterator<Item = ResourceHandle> + Send>> {
        let ResourceHandle::Mirrored(parent) = parent else {
            return None;
        };
        let children = self.children(resolver, parent)?;
        Some(Box::new(children.map(ResourceHandle::Mirrored)))
    }
}

/// Source children rewritten to mirror paths.
///
/// Children whose path does not map back under the mirror are skipped.
pub struct MirrorChildren {
    definition: MirrorDefinition,
    children: std::vec::IntoIter<Resource>,
}

impl Iterator for MirrorChildren {
    type Item = MirrorResource;

    fn next(&mut self) -> Option<Self::Item> {
        for child in self.children.by_ref() {
            match mapper::resolve_reverse(&self.definition, child.path()) {
                Some(path) => {
                    return Some(MirrorResource::new(
                        path,
                        self.definition.mirror_root().clone(),
                        child,
                    ));
                }
                None => {
                    tracing::debug!(
                        mirror_root = %self.definition.mirror_root(),
                        source_path = %child.path(),
                        "Skipping child outside the mirrored source"
                    );
                }
            }
        }
        None
    }
}
