//! Configuration and definition schema for resource mirroring.
//!
//! This crate provides the registry configuration, the discovery query
//! syntax, and the typed view of a mirror definition node's properties.

pub mod config;
pub mod error;
pub mod loader;
pub mod schema;

pub use config::{DiscoveryQuery, MirrorConfig};
pub use error::{Error, Result};
pub use loader::load_config;
pub use schema::{
    is_definition_property, DefinitionProperties, MIRROR_MARKER, PROP_OVERLAYABLE, PROP_REGISTER_PARENT, PROP_SOURCE_PATH,
};
