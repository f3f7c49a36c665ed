//! Texture types and descriptors.

use super::Extent3d;
use bitflags::bitflags;

// Re-export CPU-side types from core.
pub use oleander_core::texture::{CpuTexture, TextureDimension, TextureFormat};

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 3;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the texture.
    pub size: Extent3d,
    /// Texture dimensionality.
    pub dimension: TextureDimension,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent3d::new_2d(width, height),
            dimension: TextureDimension::D2,
            mip_level_count: 1,
            format,
            usage,
        }
    }

    /// Create a new 3D texture descriptor.
    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: None,
            size: Extent3d::new_3d(width, height, depth),
            dimension: TextureDimension::D3,
            mip_level_count: 1,
            format,
            usage,
        }
    }

    /// Create a new 2D array texture descriptor.
    pub fn new_2d_array(
        width: u32,
        height: u32,
        layers: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: None,
            size: Extent3d::new_3d(width, height, layers),
            dimension: TextureDimension::D2Array,
            mip_level_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// GPU memory the descriptor implies, in bytes, summed over mip levels.
    pub fn byte_size(&self) -> u64 {
        let block = self.format.block_size() as u64;
        (0..self.mip_level_count)
            .map(|level| {
                let w = (self.size.width >> level).max(1) as u64;
                let h = (self.size.height >> level).max(1) as u64;
                let d = match self.dimension {
                    // Array layers do not shrink with mip level.
                    TextureDimension::D2Array => self.size.depth as u64,
                    _ => (self.size.depth >> level).max(1) as u64,
                };
                w * h * d * block
            })
            .sum()
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3d::default(),
            dimension: TextureDimension::D2,
            mip_level_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}
