//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod common;
mod sampler;
mod texture;

pub use common::Extent3d;
pub use sampler::{AddressMode, CompareFunction, CpuSampler, FilterMode, SamplerDescriptor};
pub use texture::{
    CpuTexture, TextureDescriptor, TextureDimension, TextureFormat, TextureUsage,
};
