//! Resource store abstraction for resource mirroring
//!
//! Provides normalized resource paths, the store and session contracts the
//! mirroring core consumes, and a thread-safe in-memory store implementing
//! them.

pub mod config;
pub mod error;
pub mod memory;
pub mod path;
pub mod resource;
pub mod session;
pub mod snapshot;
pub mod store;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use memory::{MemoryStore, Transaction, QUERY_LANGUAGE_TAG, QUERY_LANGUAGE_TYPE};
pub use path::ResourcePath;
pub use resource::{PropertyValue, Resource, ValueMap, DEFAULT_RESOURCE_TYPE};
pub use session::{Session, Subscription};
pub use snapshot::{NodeSnapshot, TreeSnapshot};
pub use store::{
    ChangeEvent, ChangeKind, ChangeListener, ResourceStore, SessionFactory, SubscriptionId,
};
