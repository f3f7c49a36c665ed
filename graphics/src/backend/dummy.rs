//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations but provides
//! a valid implementation for testing the graphics API without
//! requiring GPU hardware. Every resource receives a unique id so
//! that reuse and replacement remain observable.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::GraphicsError;
use crate::types::{SamplerDescriptor, TextureDescriptor};

use super::{GpuBackend, GpuSampler, GpuTexture};

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    next_texture_id: AtomicU64,
    next_sampler_id: AtomicU64,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            // Id 0 is never handed out.
            next_texture_id: AtomicU64::new(1),
            next_sampler_id: AtomicU64::new(1),
        }
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuTexture, GraphicsError> {
        let id = self.next_texture_id.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}x{}) id={}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth,
            id
        );
        Ok(GpuTexture::Dummy { id })
    }

    fn write_texture(
        &self,
        texture: &GpuTexture,
        data: &[u8],
        descriptor: &TextureDescriptor,
    ) -> Result<(), GraphicsError> {
        let GpuTexture::Dummy { id } = texture;
        log::trace!(
            "DummyBackend: write_texture {:?} id={} len={}",
            descriptor.label,
            id,
            data.len()
        );
        Ok(())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError> {
        let id = self.next_sampler_id.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "DummyBackend: creating sampler {:?} id={}",
            descriptor.label,
            id
        );
        Ok(GpuSampler::Dummy { id })
    }

    fn bindless_texture_handle(&self, texture: &GpuTexture) -> u64 {
        let GpuTexture::Dummy { id } = texture;
        *id
    }

    fn bindless_sampler_handle(&self, texture: &GpuTexture, sampler: &GpuSampler) -> u64 {
        let GpuTexture::Dummy { id: texture_id } = texture;
        let GpuSampler::Dummy { id: sampler_id } = sampler;
        (texture_id << 32) | (sampler_id & 0xffff_ffff)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}
