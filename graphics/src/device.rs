//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating GPU resources.
//! It is created by [`GraphicsInstance::create_device`].

use std::sync::{Arc, RwLock, Weak};

use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::instance::GraphicsInstance;
use crate::resources::{Sampler, Texture};
use crate::types::{SamplerDescriptor, TextureDescriptor, TextureDimension};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum number of array layers.
    pub max_texture_array_layers: u32,
    /// Whether bindless texture handles are supported.
    pub bindless_textures: bool,
    /// Whether bindless sampler handles are supported.
    pub bindless_samplers: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_texture_array_layers: 2048,
            bindless_textures: false,
            bindless_samplers: false,
        }
    }
}

impl DeviceCapabilities {
    /// Capabilities with bindless texture and sampler handles enabled.
    pub fn bindless() -> Self {
        Self {
            bindless_textures: true,
            bindless_samplers: true,
            ..Default::default()
        }
    }
}

/// A graphics device for creating GPU resources.
///
/// The device is created by [`GraphicsInstance::create_device`] and provides
/// methods for creating textures and samplers.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be safely shared across threads.
/// All resource creation methods use interior mutability where needed.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new()?;
/// let device = instance.create_device()?;
///
/// let texture = device.create_texture_with_data(
///     &TextureDescriptor::new_2d(
///         1920, 1080,
///         TextureFormat::Rgba8Unorm,
///         TextureUsage::TEXTURE_BINDING,
///     ),
///     &texels,
/// )?;
/// ```
pub struct GraphicsDevice {
    instance: Arc<GraphicsInstance>,
    backend: Arc<dyn GpuBackend>,
    name: String,
    capabilities: DeviceCapabilities,
    // Track allocated resources (weak references for cleanup/debugging)
    textures: RwLock<Vec<Weak<Texture>>>,
    samplers: RwLock<Vec<Weak<Sampler>>>,
}

impl GraphicsDevice {
    /// Create a new graphics device (called by GraphicsInstance).
    pub(crate) fn new(
        instance: Arc<GraphicsInstance>,
        name: String,
        capabilities: DeviceCapabilities,
    ) -> Self {
        let backend = instance.backend().clone();
        Self {
            instance,
            backend,
            name,
            capabilities,
            textures: RwLock::new(Vec::new()),
            samplers: RwLock::new(Vec::new()),
        }
    }

    /// Get the parent instance.
    pub fn instance(&self) -> &Arc<GraphicsInstance> {
        &self.instance
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Create a GPU texture without uploading texel data.
    ///
    /// # Errors
    ///
    /// Returns an error if the texture dimensions exceed device limits or
    /// allocation fails.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        // Validate
        let max_dim = self.capabilities.max_texture_dimension;
        if descriptor.size.width > max_dim || descriptor.size.height > max_dim {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension exceeds maximum {max_dim}"
            )));
        }
        match descriptor.dimension {
            TextureDimension::D2Array => {
                if descriptor.size.depth > self.capabilities.max_texture_array_layers {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "texture layer count exceeds maximum {}",
                        self.capabilities.max_texture_array_layers
                    )));
                }
            }
            _ => {
                if descriptor.size.depth > max_dim {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "texture dimension exceeds maximum {max_dim}"
                    )));
                }
            }
        }

        if descriptor.size.width == 0 || descriptor.size.height == 0 || descriptor.size.depth == 0 {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }

        if descriptor.mip_level_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "mip level count cannot be zero".to_string(),
            ));
        }

        // Create the texture
        let gpu = self.backend.create_texture(descriptor)?;
        let texture = Arc::new(Texture::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        ));

        // Track it
        if let Ok(mut textures) = self.textures.write() {
            textures.push(Arc::downgrade(&texture));
        }

        log::trace!(
            "GraphicsDevice: created texture {:?}, size={}x{}x{}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth
        );

        Ok(texture)
    }

    /// Create a GPU texture and upload texel data for every mip level.
    ///
    /// `data` must hold all mip levels back to back, exactly
    /// [`TextureDescriptor::byte_size`] bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data length does not match the descriptor or
    /// if texture creation fails.
    pub fn create_texture_with_data(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<Arc<Texture>, GraphicsError> {
        let expected = descriptor.byte_size();
        if data.len() as u64 != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture data length {} does not match descriptor ({} bytes expected)",
                data.len(),
                expected
            )));
        }

        let texture = self.create_texture(descriptor)?;
        self.backend.write_texture(texture.gpu(), data, descriptor)?;
        Ok(texture)
    }

    /// Create a texture sampler.
    ///
    /// # Errors
    ///
    /// Returns an error if sampler creation fails.
    pub fn create_sampler(
        self: &Arc<Self>,
        descriptor: &SamplerDescriptor,
    ) -> Result<Arc<Sampler>, GraphicsError> {
        // Create the sampler
        let gpu = self.backend.create_sampler(descriptor)?;
        let sampler = Arc::new(Sampler::new(
            Arc::downgrade(self),
            descriptor.clone(),
            gpu,
        ));

        // Track it
        if let Ok(mut samplers) = self.samplers.write() {
            samplers.push(Arc::downgrade(&sampler));
        }

        log::trace!("GraphicsDevice: created sampler {:?}", descriptor.label);

        Ok(sampler)
    }

    /// Resident bindless handle for a texture.
    ///
    /// Returns `None` when the device does not support bindless textures.
    pub fn bindless_texture_handle(&self, texture: &Texture) -> Option<u64> {
        if !self.capabilities.bindless_textures {
            return None;
        }
        Some(self.backend.bindless_texture_handle(texture.gpu()))
    }

    /// Resident bindless handle for a texture and sampler pair.
    ///
    /// Returns `None` when the device does not support bindless samplers.
    pub fn bindless_sampler_handle(&self, texture: &Texture, sampler: &Sampler) -> Option<u64> {
        if !self.capabilities.bindless_samplers {
            return None;
        }
        Some(
            self.backend
                .bindless_sampler_handle(texture.gpu(), sampler.gpu()),
        )
    }

    /// Get the number of live textures created by this device.
    pub fn texture_count(&self) -> usize {
        self.textures
            .read()
            .map(|t| t.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Get the number of live samplers created by this device.
    pub fn sampler_count(&self) -> usize {
        self.samplers
            .read()
            .map(|s| s.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        if let Ok(mut textures) = self.textures.write() {
            textures.retain(|w| w.strong_count() > 0);
        }
        if let Ok(mut samplers) = self.samplers.write() {
            samplers.retain(|w| w.strong_count() > 0);
        }
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// Ensure GraphicsDevice is Send + Sync
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);
