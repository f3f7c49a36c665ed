//! CPU-side sampler parameters.
//!
//! Provides [`CpuSampler`], the hashable sampling description consumers
//! attach to texture requests, along with the [`FilterMode`],
//! [`AddressMode`], and [`CompareFunction`] enums it is built from.

mod types;

pub use types::{AddressMode, CompareFunction, CpuSampler, FilterMode};
