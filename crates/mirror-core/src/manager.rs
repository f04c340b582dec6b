//! Read-only view of the active mirrors

use std::collections::BTreeMap;

use mirror_store::ResourcePath;

use crate::definition::MirrorDefinition;

/// What external observers (cache invalidation, diagnostics) may ask about
/// the mirror set.
pub trait MirrorManager: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// A detached snapshot of the active mirrors keyed by mirror root.
    fn registered_mirrors(&self) -> BTreeMap<ResourcePath, MirrorDefinition>;
}
