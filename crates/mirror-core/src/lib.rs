//! Resource mirroring core
//!
//! A mirror presents the subtree at a source path under a different
//! mirror path, optionally letting real nodes under the mirror path
//! overlay the mirrored ones.
//!
//! - **Path mapping** ([`mapper`]): pure forward/reverse rewriting with
//!   overlay resolution
//! - **Definitions** ([`MirrorDefinition`]): validated mappings read from
//!   tagged definition nodes
//! - **Providers** ([`MirrorProvider`]): one per mirror, bound into a
//!   [`ProviderHost`] through a scoped [`Registration`]
//! - **Registry** ([`MirrorRegistry`]): discovery, change tracking and
//!   lifecycle of the provider set
//!
//! # Architecture
//!
//! ```text
//!              mirror-cli
//!                  |
//!             mirror-core
//!                  |
//!        +---------+---------+
//!        |                   |
//!   mirror-meta        mirror-store
//! ```

pub mod definition;
pub mod error;
pub mod host;
pub mod manager;
pub mod mapper;
pub mod provider;
pub mod registry;
pub mod resource;

pub use definition::{MirrorDefinition, effective_root};
pub use error::{DefinitionError, Error, Result};
pub use host::{ProviderHost, ProviderTable, Registration, RegistrationId, ResourceProvider};
pub use manager::MirrorManager;
pub use provider::{MirrorChildren, MirrorProvider};
pub use registry::{DiscoverySummary, MirrorRegistry, RegistryState};
pub use resource::{MirrorResource, ResourceHandle};
