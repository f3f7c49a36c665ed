//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends,
//! allowing the graphics crate to work with different GPU APIs.
//!
//! # Available Backends
//!
//! - `dummy` (default): No-op backend for testing and development
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Texture and sampler creation
//! - Texel uploads
//! - Bindless handle queries

pub mod dummy;

use std::sync::Arc;

use crate::error::GraphicsError;
use crate::types::{SamplerDescriptor, TextureDescriptor};

/// Handle to a GPU texture resource.
#[derive(Debug)]
pub enum GpuTexture {
    /// Dummy backend texture. Carries a backend-assigned id instead of
    /// a real allocation so reuse and replacement stay observable.
    Dummy {
        /// Backend-assigned identifier.
        id: u64,
    },
}

/// Handle to a GPU sampler resource.
#[derive(Debug)]
pub enum GpuSampler {
    /// Dummy backend sampler.
    Dummy {
        /// Backend-assigned identifier.
        id: u64,
    },
}

/// GPU backend trait for abstracting different GPU APIs.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a texture resource.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuTexture, GraphicsError>;

    /// Write texel data to a texture.
    fn write_texture(
        &self,
        texture: &GpuTexture,
        data: &[u8],
        descriptor: &TextureDescriptor,
    ) -> Result<(), GraphicsError>;

    /// Create a sampler resource.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError>;

    /// Resident bindless handle for a texture.
    fn bindless_texture_handle(&self, texture: &GpuTexture) -> u64;

    /// Resident bindless handle for a texture and sampler pair.
    ///
    /// The handle is a function of the pair: replacing either resource
    /// yields a different handle.
    fn bindless_sampler_handle(&self, texture: &GpuTexture, sampler: &GpuSampler) -> u64;
}

/// Selects and creates the appropriate backend based on available features.
pub fn create_backend() -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    log::info!("Using dummy backend");
    Ok(Arc::new(dummy::DummyBackend::new()))
}
