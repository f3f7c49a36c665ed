//! Top level orchestrator for the texture cache.

use std::sync::{Arc, Weak};

use oleander_core::sampler::CpuSampler;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::device::GraphicsDevice;

use super::consumer::ShaderCode;
use super::handle::TextureHandle;
use super::identifier::TextureIdentifier;
use super::object::TextureObject;
use super::object_registry::TextureObjectRegistry;
use super::sampler_registry::SamplerObjectRegistry;
use super::source::TextureSource;
use super::TextureType;

/// State a [`TextureHandle`] needs to reach back into on drop.
///
/// Handles hold this behind a `Weak`, so a handle outliving its
/// registry degrades to a plain drop instead of keeping the registry
/// alive.
pub(crate) struct HandleRegistryShared {
    dirty_textures: Mutex<Vec<Weak<TextureObject>>>,
    dirty_shader_codes: Mutex<Vec<Weak<dyn ShaderCode>>>,
    sampler_registry: Arc<SamplerObjectRegistry>,
}

impl HandleRegistryShared {
    fn new(sampler_registry: Arc<SamplerObjectRegistry>) -> Self {
        Self {
            dirty_textures: Mutex::new(Vec::new()),
            dirty_shader_codes: Mutex::new(Vec::new()),
            sampler_registry,
        }
    }

    /// Called from [`TextureHandle`]'s destructor, on whatever thread
    /// drops the handle.
    pub(crate) fn notify_handle_dropped(
        &self,
        texture: &Arc<TextureObject>,
        shader_code: Weak<dyn ShaderCode>,
    ) {
        self.dirty_textures.lock().push(Arc::downgrade(texture));
        self.dirty_shader_codes.lock().push(shader_code);
        self.sampler_registry.mark_garbage_collection_needed();
    }

    fn push_dirty_texture(&self, texture: &Arc<TextureObject>) {
        self.dirty_textures.lock().push(Arc::downgrade(texture));
    }

    fn extend_dirty_textures(&self, textures: Vec<Weak<TextureObject>>) {
        self.dirty_textures.lock().extend(textures);
    }

    fn take_dirty_textures(&self) -> Vec<Weak<TextureObject>> {
        std::mem::take(&mut *self.dirty_textures.lock())
    }

    fn take_dirty_shader_codes(&self) -> Vec<Weak<dyn ShaderCode>> {
        std::mem::take(&mut *self.dirty_shader_codes.lock())
    }
}

/// The handles bound to one texture object.
struct TextureAssociation {
    texture: Weak<TextureObject>,
    handles: Vec<Weak<TextureHandle>>,
}

impl TextureAssociation {
    fn new(texture: &Arc<TextureObject>) -> Self {
        Self {
            texture: Arc::downgrade(texture),
            handles: Vec::new(),
        }
    }
}

/// The entry point consumers allocate textures through.
///
/// Composes the texture object and sampler object registries and keeps
/// the texture to handle associations that drive demand sizing: each
/// texture's byte budget is the largest request across its live
/// handles, recomputed whenever handles come and go.
///
/// [`commit`](Self::commit) does all deferred work and reports which
/// consumers must re-declare their bindings. It must be called from one
/// thread at a time; allocation and handle drops are safe from any
/// thread.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use oleander_graphics::instance::GraphicsInstance;
/// use oleander_graphics::texture::{
///     MemoryTextureSource, ShaderCode, SourceTexture, TextureHandleRegistry,
///     TextureIdentifier, TextureType,
/// };
/// use oleander_core::sampler::CpuSampler;
/// use oleander_core::texture::{CpuTexture, TextureFormat};
///
/// #[derive(Debug)]
/// struct Material;
/// impl ShaderCode for Material {}
///
/// let instance = GraphicsInstance::new().unwrap();
/// let device = instance.create_device().unwrap();
///
/// let source = Arc::new(MemoryTextureSource::new());
/// source.add_uv(
///     "checker.png",
///     SourceTexture::new(CpuTexture::new_2d(
///         2,
///         2,
///         TextureFormat::Rgba8Unorm,
///         vec![255u8; 16],
///     )),
/// );
///
/// let registry = TextureHandleRegistry::new(&device, source);
/// let material: Arc<dyn ShaderCode> = Arc::new(Material);
///
/// let handle = registry.allocate_texture_handle(
///     &TextureIdentifier::new("checker.png"),
///     TextureType::Uv,
///     &CpuSampler::linear(),
///     0,
///     Arc::downgrade(&material),
/// );
///
/// let consumers = registry.commit();
/// assert_eq!(consumers.len(), 1);
/// assert!(handle.texture().is_valid());
/// assert!(handle.sampler().is_some());
/// ```
pub struct TextureHandleRegistry {
    /// Snapshot of the device capability; bindless sampler bundles are
    /// rebuilt whenever their texture changes.
    bindless_samplers: bool,
    texture_object_registry: TextureObjectRegistry,
    sampler_object_registry: Arc<SamplerObjectRegistry>,
    shared: Arc<HandleRegistryShared>,
    new_handles: Mutex<Vec<Weak<TextureHandle>>>,
    /// Keyed by [`TextureObject::object_id`].
    associations: Mutex<FxHashMap<u64, TextureAssociation>>,
    default_memory_requests: Mutex<FxHashMap<TextureType, u64>>,
}

impl TextureHandleRegistry {
    pub fn new(device: &Arc<GraphicsDevice>, source: Arc<dyn TextureSource>) -> Self {
        let sampler_object_registry = Arc::new(SamplerObjectRegistry::new(device));
        Self {
            bindless_samplers: device.capabilities().bindless_samplers,
            texture_object_registry: TextureObjectRegistry::new(device, source),
            shared: Arc::new(HandleRegistryShared::new(sampler_object_registry.clone())),
            sampler_object_registry,
            new_handles: Mutex::new(Vec::new()),
            associations: Mutex::new(FxHashMap::default()),
            default_memory_requests: Mutex::new(FxHashMap::default()),
        }
    }

    /// Allocate a handle binding `identifier` for one consumer.
    ///
    /// Cheap and never touches I/O or the GPU; the actual load happens
    /// in the next [`commit`](Self::commit). Handles on the same
    /// identifier share one texture object. `memory_request` is the
    /// consumer's byte budget vote, 0 meaning no opinion.
    pub fn allocate_texture_handle(
        &self,
        identifier: &TextureIdentifier,
        texture_type: TextureType,
        sampler_parameters: &CpuSampler,
        memory_request: u64,
        shader_code: Weak<dyn ShaderCode>,
    ) -> Arc<TextureHandle> {
        let texture = self
            .texture_object_registry
            .allocate_texture_object(identifier, texture_type);
        let handle = Arc::new(TextureHandle::new(
            texture.clone(),
            sampler_parameters.clone(),
            memory_request,
            shader_code,
            Arc::downgrade(&self.shared),
        ));

        self.associations
            .lock()
            .entry(texture.object_id())
            .or_insert_with(|| TextureAssociation::new(&texture))
            .handles
            .push(Arc::downgrade(&handle));
        self.new_handles.lock().push(Arc::downgrade(&handle));
        // The new request may change the texture's target memory.
        self.shared.push_dirty_texture(&texture);

        handle
    }

    /// Default byte budget for textures whose handles all request 0.
    ///
    /// Changing a family's default re-evaluates every texture of that
    /// family on the next commit.
    pub fn set_memory_request_for_texture_type(
        &self,
        texture_type: TextureType,
        memory_request: u64,
    ) {
        {
            let mut defaults = self.default_memory_requests.lock();
            let slot = defaults.entry(texture_type).or_insert(0);
            if *slot == memory_request {
                return;
            }
            *slot = memory_request;
        }

        let mut touched = Vec::new();
        {
            let associations = self.associations.lock();
            for association in associations.values() {
                if let Some(texture) = association.texture.upgrade() {
                    if texture.texture_type() == texture_type {
                        touched.push(Arc::downgrade(&texture));
                    }
                }
            }
        }
        self.shared.extend_dirty_textures(touched);
    }

    /// Queue a reload of every texture backed by `file_path`.
    pub fn mark_texture_file_path_dirty(&self, file_path: &str) {
        self.texture_object_registry
            .mark_texture_file_path_dirty(file_path);
    }

    /// Queue a reload of one texture, e.g. after repopulating an
    /// externally backed one.
    pub fn mark_texture_object_dirty(&self, texture: &Arc<TextureObject>) {
        self.texture_object_registry.mark_texture_object_dirty(texture);
    }

    /// Do all deferred work and report the consumers that must rebind.
    ///
    /// Runs a fixed sequence: sweep handle associations, recompute
    /// target memory, commit dirty textures, refresh samplers for
    /// affected handles, then collect unused samplers and textures.
    /// Call from one thread at a time.
    pub fn commit(&self) -> Vec<Arc<dyn ShaderCode>> {
        let some_association_emptied = self.garbage_collect_and_compute_target_memory();

        let committed = self.texture_object_registry.commit();

        let affected = self.compute_affected_handles(&committed);
        drop(committed);
        let consumers = self.reallocate_samplers_and_collect_consumers(&affected);
        drop(affected);

        // Sampler sweep runs after the reallocations above so replaced
        // samplers are already unreferenced.
        self.sampler_object_registry.garbage_collect();
        if some_association_emptied {
            self.texture_object_registry.garbage_collect();
        }

        consumers
    }

    /// The registry holding the deduplicated texture objects.
    pub fn texture_object_registry(&self) -> &TextureObjectRegistry {
        &self.texture_object_registry
    }

    /// The registry tracking live sampler bundles.
    pub fn sampler_object_registry(&self) -> &SamplerObjectRegistry {
        &self.sampler_object_registry
    }

    /// Sweep dropped handles out of the association table and recompute
    /// the target memory of every texture whose handle set changed.
    ///
    /// Returns whether any texture lost its last handle, which is the
    /// trigger for the texture GC at the end of commit.
    fn garbage_collect_and_compute_target_memory(&self) -> bool {
        let dirty = self.shared.take_dirty_textures();
        if dirty.is_empty() {
            return false;
        }

        let mut some_association_emptied = false;
        let mut seen = FxHashSet::default();
        let mut associations = self.associations.lock();
        for weak in dirty {
            let Some(texture) = weak.upgrade() else {
                continue;
            };
            if !seen.insert(texture.object_id()) {
                continue;
            }
            let Some(association) = associations.get_mut(&texture.object_id()) else {
                continue;
            };

            association.handles.retain(|h| h.strong_count() > 0);
            let handles: Vec<_> = association
                .handles
                .iter()
                .filter_map(Weak::upgrade)
                .collect();
            // A handle can drop between the retain and the upgrade.
            if handles.is_empty() {
                associations.remove(&texture.object_id());
                some_association_emptied = true;
                continue;
            }

            let mut target = handles
                .iter()
                .map(|h| h.memory_request())
                .max()
                .unwrap_or(0);
            if target == 0 {
                target = self.default_memory_request(texture.texture_type());
            }
            self.texture_object_registry
                .set_target_memory(&texture, target);
        }
        some_association_emptied
    }

    /// Handles that must refresh their sampler: everything bound to a
    /// texture committed this call, plus handles allocated since the
    /// last commit.
    fn compute_affected_handles(
        &self,
        committed: &[Arc<TextureObject>],
    ) -> Vec<Arc<TextureHandle>> {
        let mut affected = Vec::new();
        {
            let associations = self.associations.lock();
            for texture in committed {
                if let Some(association) = associations.get(&texture.object_id()) {
                    affected.extend(association.handles.iter().filter_map(Weak::upgrade));
                }
            }
        }
        for weak in self.new_handles.lock().drain(..) {
            if let Some(handle) = weak.upgrade() {
                affected.push(handle);
            }
        }

        // A brand-new handle is usually also bound to a texture that
        // was just committed.
        let mut seen = FxHashSet::default();
        affected.retain(|handle| seen.insert(Arc::as_ptr(handle) as usize));
        affected
    }

    fn reallocate_samplers_and_collect_consumers(
        &self,
        affected: &[Arc<TextureHandle>],
    ) -> Vec<Arc<dyn ShaderCode>> {
        let mut consumers: Vec<Arc<dyn ShaderCode>> = Vec::new();
        let mut seen = FxHashSet::default();
        let mut push = |consumers: &mut Vec<Arc<dyn ShaderCode>>, shader: Arc<dyn ShaderCode>| {
            if seen.insert(Arc::as_ptr(&shader) as *const () as usize) {
                consumers.push(shader);
            }
        };

        for handle in affected {
            handle.reallocate_sampler_if_necessary(
                &self.sampler_object_registry,
                self.bindless_samplers,
            );
            if let Some(shader) = handle.shader_code() {
                push(&mut consumers, shader);
            }
        }
        // Consumers that dropped a handle need to rebind too, even if
        // none of their remaining textures changed.
        for weak in self.shared.take_dirty_shader_codes() {
            if let Some(shader) = weak.upgrade() {
                push(&mut consumers, shader);
            }
        }
        consumers
    }

    fn default_memory_request(&self, texture_type: TextureType) -> u64 {
        self.default_memory_requests
            .lock()
            .get(&texture_type)
            .copied()
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for TextureHandleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandleRegistry")
            .field("textures", &self.texture_object_registry.len())
            .field("samplers", &self.sampler_object_registry.len())
            .field("associations", &self.associations.lock().len())
            .finish()
    }
}

// Ensure TextureHandleRegistry is Send + Sync
static_assertions::assert_impl_all!(TextureHandleRegistry: Send, Sync);
