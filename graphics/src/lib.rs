//! # Oleander Graphics
//!
//! GPU texture and sampler cache built around deduplicating registries.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsInstance`] / [`GraphicsDevice`] - Device setup and GPU resource creation
//! - [`InstanceRegistry`] - Generic concurrent cache with second-chance garbage collection
//! - [`texture`] - Texture objects, handles, and the registries composing them
//! - [`TextureHandleRegistry`] - The entry point consumers allocate textures through
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use oleander_graphics::instance::GraphicsInstance;
//! use oleander_graphics::texture::MemoryTextureSource;
//! use oleander_graphics::TextureHandleRegistry;
//!
//! let instance = GraphicsInstance::new()?;
//! let device = instance.create_device()?;
//! let registry = TextureHandleRegistry::new(&device, Arc::new(MemoryTextureSource::new()));
//! // Allocate handles, then registry.commit() once per frame.
//! # Ok::<(), oleander_graphics::GraphicsError>(())
//! ```

pub mod backend;
pub mod device;
pub mod error;
pub mod instance;
pub mod registry;
pub mod resources;
pub mod texture;
pub mod types;

// Re-export main types for convenience
pub use device::{DeviceCapabilities, GraphicsDevice};
pub use error::GraphicsError;
pub use instance::{AdapterInfo, AdapterType, GraphicsInstance};
pub use registry::{Instance, InstanceRegistry};
pub use resources::{Sampler, Texture};
pub use texture::{
    ShaderCode, TextureHandle, TextureHandleRegistry, TextureIdentifier, TextureObject,
    TextureObjectRegistry, TextureType,
};
pub use types::{
    CpuSampler, CpuTexture, Extent3d, SamplerDescriptor, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsage,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Oleander Graphics v{} initialized", VERSION);
}
