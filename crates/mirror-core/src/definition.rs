//! Validated mirror definitions

use mirror_meta::DefinitionProperties;
use mirror_store::{Resource, ResourcePath};
use serde::Serialize;

use crate::error::DefinitionError;

/// One validated mirror mapping.
///
/// The source root is never equal to, an ancestor of, or a descendant of
/// the mirror root, so forward and reverse rewriting cannot cycle.
///
/// Two definitions are equal when they mirror the same source with the
/// same overlay flag. The registry keys definitions by mirror root, so a
/// redefinition at the same root with equal fields is a no-op.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorDefinition {
    mirror_root: ResourcePath,
    source_root: ResourcePath,
    overlayable: bool,
    #[serde(skip)]
    mirror_prefix: String,
    #[serde(skip)]
    source_prefix: String,
}

impl MirrorDefinition {
    /// Validate and build a definition.
    pub fn new(
        mirror_root: ResourcePath,
        source_root: ResourcePath,
        overlayable: bool,
    ) -> Result<Self, DefinitionError> {
        if source_root.is_empty() {
            return Err(DefinitionError::MissingSource {
                definition: mirror_root,
            });
        }
        if !source_root.is_absolute() {
            return Err(DefinitionError::RelativeSource {
                mirror_root,
                source_path: source_root,
            });
        }
        if source_root == mirror_root {
            return Err(DefinitionError::SelfReference { mirror_root });
        }
        if source_root.is_ancestor_of(&mirror_root) {
            return Err(DefinitionError::SourceIsAncestor {
                mirror_root,
                source_path: source_root,
            });
        }
        if source_root.is_descendant_of(&mirror_root) {
            return Err(DefinitionError::SourceIsDescendant {
                mirror_root,
                source_path: source_root,
            });
        }

        Ok(Self {
            mirror_prefix: mirror_root.child_prefix(),
            source_prefix: source_root.child_prefix(),
            mirror_root,
            source_root,
            overlayable,
        })
    }

    /// Build a definition from the node it is stored on.
    pub fn from_resource(resource: &Resource) -> Result<Self, DefinitionError> {
        let properties = DefinitionProperties::extract(resource.properties());
        Self::from_properties(resource.path(), &properties)
    }

    /// Build a definition from extracted properties of the node at
    /// `definition_path`.
    pub fn from_properties(
        definition_path: &ResourcePath,
        properties: &DefinitionProperties,
    ) -> Result<Self, DefinitionError> {
        let mirror_root = effective_root(definition_path, properties.register_parent)?;
        let source_root = match &properties.source_path {
            Some(source) if !source.is_empty() => source.clone(),
            _ => {
                return Err(DefinitionError::MissingSource {
                    definition: definition_path.clone(),
                });
            }
        };
        Self::new(mirror_root, source_root, properties.overlayable)
    }

    pub fn mirror_root(&self) -> &ResourcePath {
        &self.mirror_root
    }

    pub fn source_root(&self) -> &ResourcePath {
        &self.source_root
    }

    pub fn overlayable(&self) -> bool {
        self.overlayable
    }

    /// `mirror_root` followed by a separator.
    pub fn mirror_prefix(&self) -> &str {
        &self.mirror_prefix
    }

    /// `source_root` followed by a separator.
    pub fn source_prefix(&self) -> &str {
        &self.source_prefix
    }
}

impl PartialEq for MirrorDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.source_root == other.source_root && self.overlayable == other.overlayable
    }
}

impl Eq for MirrorDefinition {}

/// The mirror root a definition node stands for: the node itself, or its
/// parent when `register_parent` is set.
pub fn effective_root(
    definition_path: &ResourcePath,
    register_parent: bool,
) -> Result<ResourcePath, DefinitionError> {
    if !register_parent {
        return Ok(definition_path.clone());
    }
    definition_path
        .parent()
        .ok_or_else(|| DefinitionError::NoParent {
            definition: definition_path.clone(),
        })
}
