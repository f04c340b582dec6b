//! Resource handles returned by providers and the host

use std::collections::BTreeSet;

use mirror_store::{Resource, ResourcePath, ValueMap};

/// A source resource presented at a path under a mirror root.
///
/// Only the path differs from the underlying resource; type, tags and
/// properties are the source's.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorResource {
    path: ResourcePath,
    mirror_root: ResourcePath,
    underlying: Resource,
}

impl MirrorResource {
    pub fn new(path: ResourcePath, mirror_root: ResourcePath, underlying: Resource) -> Self {
        Self {
            path,
            mirror_root,
            underlying,
        }
    }

    /// The mirror path this resource was requested at.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Root of the mirror that produced this resource.
    pub fn mirror_root(&self) -> &ResourcePath {
        &self.mirror_root
    }

    /// Path of the resource content is served from.
    pub fn source_path(&self) -> &ResourcePath {
        self.underlying.path()
    }

    pub fn resource_type(&self) -> &str {
        self.underlying.resource_type()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        self.underlying.tags()
    }

    pub fn properties(&self) -> &ValueMap {
        self.underlying.properties()
    }

    pub fn underlying(&self) -> &Resource {
        &self.underlying
    }
}

/// A resource as seen through the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceHandle {
    /// Read directly from the store
    Stored(Resource),
    /// Served by a mirror provider
    Mirrored(MirrorResource),
}

impl ResourceHandle {
    pub fn path(&self) -> &ResourcePath {
        match self {
            Self::Stored(resource) => resource.path(),
            Self::Mirrored(resource) => resource.path(),
        }
    }

    /// Where the content actually lives; equal to [`path`](Self::path)
    /// for stored resources.
    pub fn source_path(&self) -> &ResourcePath {
        match self {
            Self::Stored(resource) => resource.path(),
            Self::Mirrored(resource) => resource.source_path(),
        }
    }

    pub fn resource_type(&self) -> &str {
        match self {
            Self::Stored(resource) => resource.resource_type(),
            Self::Mirrored(resource) => resource.resource_type(),
        }
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        match self {
            Self::Stored(resource) => resource.tags(),
            Self::Mirrored(resource) => resource.tags(),
        }
    }

    pub fn properties(&self) -> &ValueMap {
        match self {
            Self::Stored(resource) => resource.properties(),
            Self::Mirrored(resource) => resource.properties(),
        }
    }

    pub fn mirror_root(&self) -> Option<&ResourcePath> {
        match self {
            Self::Stored(_) => None,
            Self::Mirrored(resource) => Some(resource.mirror_root()),
        }
    }

    pub fn is_mirrored(&self) -> bool {
        matches!(self, Self::Mirrored(_))
    }
}

impl From<Resource> for ResourceHandle {
    fn from(resource: Resource) -> Self {
        Self::Stored(resource)
    }
}

impl From<MirrorResource> for ResourceHandle {
    fn from(resource: MirrorResource) -> Self {
        Self::Mirrored(resource)
    }
}
