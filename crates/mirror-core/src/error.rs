//! Error types for mirror-core

use mirror_store::ResourcePath;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the mirroring core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store access failed
    #[error(transparent)]
    Store(#[from] mirror_store::Error),

    /// Configuration error from mirror-meta
    #[error(transparent)]
    Meta(#[from] mirror_meta::Error),

    /// A definition node does not describe a usable mirror
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The host refused to bind a provider
    #[error("Failed to bind provider at {root}: {reason}")]
    BindFailed { root: ResourcePath, reason: String },

    /// The registry could not acquire what it needs to run
    #[error("Failed to activate mirror registry: {message}")]
    Activation {
        message: String,
        #[source]
        cause: mirror_store::Error,
    },

    /// Activation was attempted outside a tokio runtime
    #[error("Mirror registry requires a tokio runtime")]
    NoRuntime,

    /// The background discovery task panicked or was aborted
    #[error("Discovery task failed: {message}")]
    DiscoveryTask { message: String },
}

/// Why a definition node was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("Definition at {definition} has no source path")]
    MissingSource { definition: ResourcePath },

    #[error("Source path {source_path} of mirror {mirror_root} is not absolute")]
    RelativeSource {
        mirror_root: ResourcePath,
        source_path: ResourcePath,
    },

    #[error("Mirror {mirror_root} cannot mirror itself")]
    SelfReference { mirror_root: ResourcePath },

    #[error("Source path {source_path} is an ancestor of mirror {mirror_root}")]
    SourceIsAncestor {
        mirror_root: ResourcePath,
        source_path: ResourcePath,
    },

    #[error("Source path {source_path} is a descendant of mirror {mirror_root}")]
    SourceIsDescendant {
        mirror_root: ResourcePath,
        source_path: ResourcePath,
    },

    #[error("Definition at {definition} registers its parent but has none")]
    NoParent { definition: ResourcePath },
}
