//! # Oleander Core
//!
//! Core crate for Oleander basic utilities: CPU-side texture and sampler
//! value types, math aliases, and the scoped thread pool used for parallel
//! CPU work.

pub mod math;
pub mod sampler;
pub mod texture;
pub mod thread_pool;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version at startup.
pub fn init() {
    log::info!("Oleander Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
