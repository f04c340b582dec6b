//! Shared test utilities for the resource-mirror workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] builder over a [`MemoryStore`](mirror_store::MemoryStore)
//!   and [`TestFiles`] for config and snapshot files on disk
//! - [`faults`]: store and session wrappers that fail on demand

pub mod faults;
pub mod tree;

pub use faults::{Fault, FaultySessions, FaultyStore, Faults};
pub use tree::{TestFiles, TestTree};
