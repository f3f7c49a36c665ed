//! Instance deduplication registries.

mod instance;

pub use instance::{Instance, InstanceRegistry};
