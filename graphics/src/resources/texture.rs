//! GPU texture resource.

use std::sync::{Arc, Weak};

use crate::backend::GpuTexture;
use crate::device::GraphicsDevice;
use crate::types::{Extent3d, TextureDescriptor, TextureFormat};

/// A GPU texture resource.
///
/// Textures are created by [`GraphicsDevice::create_texture_with_data`] and are
/// reference-counted. They hold a weak reference back to their parent device;
/// the backend resource is released when the last reference drops.
///
/// # Example
///
/// ```ignore
/// let texture = device.create_texture_with_data(
///     &TextureDescriptor::new_2d(
///         1920, 1080,
///         TextureFormat::Rgba8Unorm,
///         TextureUsage::TEXTURE_BINDING,
///     ),
///     &texels,
/// )?;
/// println!("Texture size: {}x{}", texture.width(), texture.height());
/// ```
pub struct Texture {
    device: Weak<GraphicsDevice>,
    descriptor: TextureDescriptor,
    gpu: GpuTexture,
}

impl Texture {
    /// Create a new texture (called by GraphicsDevice).
    pub(crate) fn new(
        device: Weak<GraphicsDevice>,
        descriptor: TextureDescriptor,
        gpu: GpuTexture,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu,
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<GraphicsDevice>> {
        self.device.upgrade()
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the backend handle.
    pub fn gpu(&self) -> &GpuTexture {
        &self.gpu
    }

    /// Get the texture size.
    pub fn size(&self) -> Extent3d {
        self.descriptor.size
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    /// Get the texture depth.
    pub fn depth(&self) -> u32 {
        self.descriptor.size.depth
    }

    /// Get the texture format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the mip level count.
    pub fn mip_level_count(&self) -> u32 {
        self.descriptor.mip_level_count
    }

    /// GPU memory the texture occupies, in bytes.
    pub fn byte_size(&self) -> u64 {
        self.descriptor.byte_size()
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .field("gpu", &self.gpu)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextureUsage;

    #[test]
    fn test_texture_debug() {
        let desc = TextureDescriptor::new_2d(
            1920,
            1080,
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING,
        );
        let texture = Texture::new(Weak::new(), desc, GpuTexture::Dummy { id: 7 });
        let debug = format!("{:?}", texture);
        assert!(debug.contains("Texture"));
        assert!(debug.contains("1920"));
    }

    #[test]
    fn test_texture_dimensions() {
        let desc = TextureDescriptor::new_2d(
            800,
            600,
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING,
        );
        let texture = Texture::new(Weak::new(), desc, GpuTexture::Dummy { id: 1 });
        assert_eq!(texture.width(), 800);
        assert_eq!(texture.height(), 600);
        assert_eq!(texture.depth(), 1);
        assert_eq!(texture.byte_size(), 800 * 600 * 4);
    }
}
