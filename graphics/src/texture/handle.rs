//! Texture handles, the per-consumer view into the cache.

use std::sync::{Arc, Weak};

use oleander_core::sampler::CpuSampler;
use parking_lot::Mutex;

use super::consumer::ShaderCode;
use super::handle_registry::HandleRegistryShared;
use super::object::TextureObject;
use super::sampler_object::SamplerObject;
use super::sampler_registry::SamplerObjectRegistry;

/// One consumer's claim on a texture.
///
/// A handle pairs a shared [`TextureObject`] with the sampling
/// parameters and memory request of a single consumer. Dropping the
/// handle is the release signal: the owning registry is notified and
/// frees the texture and sampler on its next commit once no other
/// handle needs them.
///
/// Sampler parameters and the memory request are fixed at allocation;
/// ask the registry for a new handle to change them.
pub struct TextureHandle {
    texture: Arc<TextureObject>,
    sampler_parameters: CpuSampler,
    memory_request: u64,
    shader_code: Weak<dyn ShaderCode>,
    sampler: Mutex<Option<Arc<SamplerObject>>>,
    notifier: Weak<HandleRegistryShared>,
}

impl TextureHandle {
    pub(crate) fn new(
        texture: Arc<TextureObject>,
        sampler_parameters: CpuSampler,
        memory_request: u64,
        shader_code: Weak<dyn ShaderCode>,
        notifier: Weak<HandleRegistryShared>,
    ) -> Self {
        Self {
            texture,
            sampler_parameters,
            memory_request,
            shader_code,
            sampler: Mutex::new(None),
            notifier,
        }
    }

    /// The shared texture object this handle binds.
    pub fn texture(&self) -> &Arc<TextureObject> {
        &self.texture
    }

    /// Sampling parameters requested by the consumer.
    pub fn sampler_parameters(&self) -> &CpuSampler {
        &self.sampler_parameters
    }

    /// Bytes of GPU memory the consumer asked for, 0 meaning
    /// unconstrained.
    pub fn memory_request(&self) -> u64 {
        self.memory_request
    }

    /// The consumer this handle was allocated for, if still alive.
    pub fn shader_code(&self) -> Option<Arc<dyn ShaderCode>> {
        self.shader_code.upgrade()
    }

    /// Sampler bundle for the bound texture, populated by commit.
    pub fn sampler(&self) -> Option<Arc<SamplerObject>> {
        self.sampler.lock().clone()
    }

    /// Make sure the sampler matches the currently committed texture.
    ///
    /// Without bindless samplers the sampler state never goes stale, so
    /// an existing sampler is kept. With bindless samplers the bundle
    /// embeds a handle to the texture it was created against and must
    /// be rebuilt whenever that texture is replaced.
    pub(crate) fn reallocate_sampler_if_necessary(
        &self,
        registry: &SamplerObjectRegistry,
        bindless_samplers: bool,
    ) {
        let mut slot = self.sampler.lock();
        if slot.is_some() && !bindless_samplers {
            return;
        }
        if slot.take().is_some() {
            registry.mark_garbage_collection_needed();
        }
        *slot = registry.allocate_sampler(&self.texture, &self.sampler_parameters);
    }

    pub(crate) fn shader_code_weak(&self) -> &Weak<dyn ShaderCode> {
        &self.shader_code
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        if let Some(shared) = self.notifier.upgrade() {
            shared.notify_handle_dropped(&self.texture, self.shader_code.clone());
        }
    }
}

impl std::fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandle")
            .field("texture", &self.texture.identifier())
            .field("memory_request", &self.memory_request)
            .finish()
    }
}

// Ensure TextureHandle is Send + Sync
static_assertions::assert_impl_all!(TextureHandle: Send, Sync);

#[cfg(test)]
mod tests {
    use super::super::identifier::TextureIdentifier;
    use super::super::TextureType;
    use super::*;
    use crate::device::GraphicsDevice;
    use crate::instance::GraphicsInstance;
    use std::sync::atomic::AtomicI64;

    fn create_test_setup() -> (Arc<GraphicsDevice>, Arc<SamplerObjectRegistry>, Arc<TextureObject>)
    {
        let instance = GraphicsInstance::new().unwrap();
        let device = instance.create_device().unwrap();
        let samplers = Arc::new(SamplerObjectRegistry::new(&device));
        let texture = Arc::new(TextureObject::new(
            TextureIdentifier::new("a.png"),
            TextureType::Uv,
            Arc::new(AtomicI64::new(0)),
        ));
        (device, samplers, texture)
    }

    fn orphan_handle(texture: Arc<TextureObject>) -> TextureHandle {
        TextureHandle::new(
            texture,
            CpuSampler::linear(),
            256,
            Weak::<NullShader>::new(),
            Weak::new(),
        )
    }

    #[derive(Debug)]
    struct NullShader;

    impl ShaderCode for NullShader {}

    #[test]
    fn test_handle_accessors() {
        let (_device, _samplers, texture) = create_test_setup();
        let handle = orphan_handle(texture.clone());

        assert!(Arc::ptr_eq(handle.texture(), &texture));
        assert_eq!(handle.memory_request(), 256);
        assert!(handle.shader_code().is_none());
        assert!(handle.sampler().is_none());
    }

    #[test]
    fn test_reallocate_keeps_sampler_without_bindless() {
        let (_device, samplers, texture) = create_test_setup();
        let handle = orphan_handle(texture);

        handle.reallocate_sampler_if_necessary(&samplers, false);
        let first = handle.sampler().unwrap();

        handle.reallocate_sampler_if_necessary(&samplers, false);
        let second = handle.sampler().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(samplers.len(), 1);
    }

    #[test]
    fn test_reallocate_replaces_sampler_with_bindless() {
        let (_device, samplers, texture) = create_test_setup();
        let handle = orphan_handle(texture);

        handle.reallocate_sampler_if_necessary(&samplers, true);
        let first = handle.sampler().unwrap();

        handle.reallocate_sampler_if_necessary(&samplers, true);
        let second = handle.sampler().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));

        // The replaced sampler is gone after the flagged sweep.
        drop(first);
        assert_eq!(samplers.garbage_collect(), 1);
        assert_eq!(samplers.len(), 1);
    }
}
