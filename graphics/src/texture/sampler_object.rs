//! GPU sampler bundles matching each texture family.

use std::sync::Arc;

use oleander_core::sampler::CpuSampler;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::resources::{Sampler, Texture};
use crate::types::SamplerDescriptor;

use super::object::TextureObject;
use super::TextureType;

/// The GPU sampler state one handle binds alongside its texture.
///
/// UV and field textures need a single sampler. UDIM and Ptex bind two
/// textures, so they carry a second, nearest-filtered sampler for the
/// layout texture.
///
/// Bindless handles are resolved at creation time against the texture
/// committed at that moment; the handle registry recreates sampler
/// objects whenever that texture changes.
pub enum SamplerObject {
    Uv {
        sampler: Arc<Sampler>,
        bindless_handle: Option<u64>,
    },
    Field {
        sampler: Arc<Sampler>,
        bindless_handle: Option<u64>,
    },
    Udim {
        texels_sampler: Arc<Sampler>,
        layout_sampler: Arc<Sampler>,
        texels_bindless_handle: Option<u64>,
        layout_bindless_handle: Option<u64>,
    },
    Ptex {
        texels_sampler: Arc<Sampler>,
        layout_sampler: Arc<Sampler>,
        texels_bindless_handle: Option<u64>,
        layout_bindless_handle: Option<u64>,
    },
}

impl SamplerObject {
    /// Create the sampler bundle for `texture` from a consumer's
    /// sampling parameters.
    ///
    /// UV textures merge in the wrap modes the texture file recommended.
    /// Bindless handles come out `None` on devices without the bindless
    /// sampler capability, and for textures with nothing committed yet.
    pub(crate) fn new(
        device: &Arc<GraphicsDevice>,
        texture: &TextureObject,
        parameters: &CpuSampler,
    ) -> Result<Self, GraphicsError> {
        match texture.texture_type() {
            TextureType::Uv => {
                let mut descriptor = SamplerDescriptor::from(parameters);
                let hints = texture.wrap_hints();
                if let Some(u) = hints.u {
                    descriptor.address_mode_u = u;
                }
                if let Some(v) = hints.v {
                    descriptor.address_mode_v = v;
                }
                let sampler = device.create_sampler(&descriptor)?;
                let bindless_handle = bindless_pair(device, texture.texture(), &sampler);
                Ok(Self::Uv {
                    sampler,
                    bindless_handle,
                })
            }
            TextureType::Field => {
                let sampler = device.create_sampler(&SamplerDescriptor::from(parameters))?;
                let bindless_handle = bindless_pair(device, texture.texture(), &sampler);
                Ok(Self::Field {
                    sampler,
                    bindless_handle,
                })
            }
            TextureType::Udim | TextureType::Ptex => {
                let texels_sampler =
                    device.create_sampler(&SamplerDescriptor::from(parameters))?;
                // The layout table must be read exactly, never filtered.
                let layout_sampler = device.create_sampler(&SamplerDescriptor::nearest())?;
                let texels_bindless_handle =
                    bindless_pair(device, texture.texture(), &texels_sampler);
                let layout_bindless_handle =
                    bindless_pair(device, texture.layout_texture(), &layout_sampler);
                if texture.texture_type() == TextureType::Udim {
                    Ok(Self::Udim {
                        texels_sampler,
                        layout_sampler,
                        texels_bindless_handle,
                        layout_bindless_handle,
                    })
                } else {
                    Ok(Self::Ptex {
                        texels_sampler,
                        layout_sampler,
                        texels_bindless_handle,
                        layout_bindless_handle,
                    })
                }
            }
        }
    }

    /// The texture family this bundle was created for.
    pub fn texture_type(&self) -> TextureType {
        match self {
            Self::Uv { .. } => TextureType::Uv,
            Self::Field { .. } => TextureType::Field,
            Self::Udim { .. } => TextureType::Udim,
            Self::Ptex { .. } => TextureType::Ptex,
        }
    }

    /// Sampler for the texel texture.
    pub fn sampler(&self) -> &Arc<Sampler> {
        match self {
            Self::Uv { sampler, .. } | Self::Field { sampler, .. } => sampler,
            Self::Udim { texels_sampler, .. } | Self::Ptex { texels_sampler, .. } => {
                texels_sampler
            }
        }
    }

    /// Sampler for the layout texture (UDIM and Ptex only).
    pub fn layout_sampler(&self) -> Option<&Arc<Sampler>> {
        match self {
            Self::Udim { layout_sampler, .. } | Self::Ptex { layout_sampler, .. } => {
                Some(layout_sampler)
            }
            _ => None,
        }
    }

    /// Bindless handle for the texel texture and its sampler.
    pub fn bindless_handle(&self) -> Option<u64> {
        match self {
            Self::Uv {
                bindless_handle, ..
            }
            | Self::Field {
                bindless_handle, ..
            } => *bindless_handle,
            Self::Udim {
                texels_bindless_handle,
                ..
            }
            | Self::Ptex {
                texels_bindless_handle,
                ..
            } => *texels_bindless_handle,
        }
    }

    /// Bindless handle for the layout texture (UDIM and Ptex only).
    pub fn layout_bindless_handle(&self) -> Option<u64> {
        match self {
            Self::Udim {
                layout_bindless_handle,
                ..
            }
            | Self::Ptex {
                layout_bindless_handle,
                ..
            } => *layout_bindless_handle,
            _ => None,
        }
    }
}

impl std::fmt::Debug for SamplerObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerObject")
            .field("texture_type", &self.texture_type())
            .field("bindless_handle", &self.bindless_handle())
            .finish()
    }
}

fn bindless_pair(
    device: &Arc<GraphicsDevice>,
    texture: Option<Arc<Texture>>,
    sampler: &Arc<Sampler>,
) -> Option<u64> {
    texture.and_then(|t| device.bindless_sampler_handle(&t, sampler))
}

#[cfg(test)]
mod tests {
    use super::super::identifier::TextureIdentifier;
    use super::*;
    use crate::device::DeviceCapabilities;
    use crate::instance::GraphicsInstance;
    use crate::types::{TextureDescriptor, TextureUsage};
    use oleander_core::sampler::AddressMode;
    use oleander_core::texture::TextureFormat;
    use std::sync::atomic::AtomicI64;

    fn field_object() -> TextureObject {
        TextureObject::new(
            TextureIdentifier::new("vol.vdb"),
            TextureType::Field,
            Arc::new(AtomicI64::new(0)),
        )
    }

    #[test]
    fn test_uv_sampler_applies_wrap_hints() {
        let instance = GraphicsInstance::new().unwrap();
        let device = instance.create_device().unwrap();
        let object = TextureObject::new(
            TextureIdentifier::new("a.png"),
            TextureType::Uv,
            Arc::new(AtomicI64::new(0)),
        );

        // No hints: consumer parameters pass through untouched.
        let parameters = CpuSampler::linear().with_address_mode(AddressMode::Repeat);
        let sampler_object = SamplerObject::new(&device, &object, &parameters).unwrap();
        assert_eq!(sampler_object.texture_type(), TextureType::Uv);
        assert_eq!(
            sampler_object.sampler().descriptor().address_mode_u,
            AddressMode::Repeat
        );
        assert!(sampler_object.layout_sampler().is_none());
    }

    #[test]
    fn test_field_sampler_has_no_layout() {
        let instance = GraphicsInstance::new().unwrap();
        let device = instance.create_device().unwrap();
        let object = field_object();

        let sampler_object =
            SamplerObject::new(&device, &object, &CpuSampler::linear()).unwrap();
        assert_eq!(sampler_object.texture_type(), TextureType::Field);
        assert!(sampler_object.layout_sampler().is_none());
        assert!(sampler_object.layout_bindless_handle().is_none());
    }

    #[test]
    fn test_udim_sampler_pairs_nearest_layout() {
        let instance = GraphicsInstance::new().unwrap();
        let device = instance.create_device().unwrap();
        let object = TextureObject::new(
            TextureIdentifier::new("t.<UDIM>.png"),
            TextureType::Udim,
            Arc::new(AtomicI64::new(0)),
        );

        let sampler_object =
            SamplerObject::new(&device, &object, &CpuSampler::linear()).unwrap();
        let layout = sampler_object.layout_sampler().unwrap();
        assert_eq!(
            layout.descriptor().min_filter,
            oleander_core::sampler::FilterMode::Nearest
        );
    }

    #[test]
    fn test_bindless_handles_require_capability_and_texture() {
        let instance = GraphicsInstance::new().unwrap();

        // Capability off: no handle even with a committed texture.
        let device = instance.create_device().unwrap();
        let object = TextureObject::new(
            TextureIdentifier::new("a.png"),
            TextureType::Uv,
            Arc::new(AtomicI64::new(0)),
        );
        let sampler_object =
            SamplerObject::new(&device, &object, &CpuSampler::linear()).unwrap();
        assert!(sampler_object.bindless_handle().is_none());

        // Capability on but nothing committed: still no handle.
        let bindless_device = instance
            .create_device_with_capabilities(DeviceCapabilities::bindless())
            .unwrap();
        let uncommitted =
            SamplerObject::new(&bindless_device, &object, &CpuSampler::linear()).unwrap();
        assert!(uncommitted.bindless_handle().is_none());

        // Capability on and a texture present.
        let texture = bindless_device
            .create_texture(&TextureDescriptor::new_2d(
                2,
                2,
                TextureFormat::Rgba8Unorm,
                TextureUsage::TEXTURE_BINDING,
            ))
            .unwrap();
        let external = TextureObject::new(
            TextureIdentifier::with_subtexture(
                "rt:color",
                super::super::identifier::SubtextureIdentifier::DynamicUv,
            ),
            TextureType::Uv,
            Arc::new(AtomicI64::new(0)),
        );
        external.set_external_texture(texture);
        let bound =
            SamplerObject::new(&bindless_device, &external, &CpuSampler::linear()).unwrap();
        assert!(bound.bindless_handle().is_some());
    }
}
