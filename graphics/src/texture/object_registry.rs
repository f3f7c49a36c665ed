//! Registry of deduplicated texture objects.

use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::{Arc, Weak};

use oleander_core::thread_pool::ThreadPool;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::device::GraphicsDevice;
use crate::registry::InstanceRegistry;

use super::identifier::TextureIdentifier;
use super::object::TextureObject;
use super::source::TextureSource;
use super::TextureType;

/// Deduplicating cache of [`TextureObject`]s.
///
/// Two allocations with the same identifier share one object, so the
/// file is decoded and uploaded once no matter how many consumers bind
/// it. Objects are deduplicated by identifier hash alone; asking for
/// the same identifier under two different [`TextureType`]s yields the
/// first allocation's type.
///
/// Loading is deferred: allocation only marks the object dirty, and
/// [`commit`](Self::commit) later decodes all dirty objects in parallel
/// before uploading them serially.
pub struct TextureObjectRegistry {
    device: Weak<GraphicsDevice>,
    source: Arc<dyn TextureSource>,
    instances: InstanceRegistry<Arc<TextureObject>>,
    dirty: Mutex<Vec<Weak<TextureObject>>>,
    /// Shared with every object; objects adjust it as they commit and drop.
    total_memory: Arc<AtomicI64>,
    recycle_count: AtomicI32,
    thread_pool: ThreadPool,
}

impl TextureObjectRegistry {
    pub(crate) fn new(device: &Arc<GraphicsDevice>, source: Arc<dyn TextureSource>) -> Self {
        Self {
            device: Arc::downgrade(device),
            source,
            instances: InstanceRegistry::new(),
            dirty: Mutex::new(Vec::new()),
            total_memory: Arc::new(AtomicI64::new(0)),
            recycle_count: AtomicI32::new(0),
            thread_pool: ThreadPool::default_threads(),
        }
    }

    /// Get or create the texture object for `identifier`.
    ///
    /// Never fails: a broken path still yields an object, which simply
    /// reports `is_valid() == false` after commit. New objects start
    /// dirty and are loaded by the next [`commit`](Self::commit).
    pub fn allocate_texture_object(
        &self,
        identifier: &TextureIdentifier,
        texture_type: TextureType,
    ) -> Arc<TextureObject> {
        let mut instance = self.instances.get_instance(identifier.hash64());
        if !instance.is_first_instance() {
            if let Some(object) = instance.value_cloned() {
                return object;
            }
            // Empty holder left behind by an abandoned reservation.
        }
        let object = Arc::new(TextureObject::new(
            identifier.clone(),
            texture_type,
            self.total_memory.clone(),
        ));
        instance.set_value(object.clone());
        drop(instance);
        self.mark_texture_object_dirty(&object);
        object
    }

    /// Queue an object for reload on the next commit.
    pub fn mark_texture_object_dirty(&self, object: &Arc<TextureObject>) {
        self.dirty.lock().push(Arc::downgrade(object));
    }

    /// Queue every object backed by `file_path` for reload.
    ///
    /// Covers all sub identifiers sharing the path, so one changed file
    /// on disk invalidates each variant cached from it.
    pub fn mark_texture_file_path_dirty(&self, file_path: &str) {
        let mut matching = Vec::new();
        self.instances.visit(|_, object| {
            if object.identifier().file_path() == file_path {
                matching.push(Arc::downgrade(object));
            }
        });
        if matching.is_empty() {
            return;
        }
        self.dirty.lock().extend(matching);
    }

    /// Load and upload all dirty objects, returning the ones processed.
    ///
    /// CPU decoding runs across the thread pool; GPU uploads then run
    /// serially on the calling thread. Duplicate and dropped dirty
    /// marks are skipped, so committing twice in a row does no work the
    /// second time.
    pub fn commit(&self) -> Vec<Arc<TextureObject>> {
        let dirty = std::mem::take(&mut *self.dirty.lock());
        let mut seen = FxHashSet::default();
        let mut to_commit = Vec::with_capacity(dirty.len());
        for weak in dirty {
            if let Some(object) = weak.upgrade() {
                if seen.insert(object.object_id()) {
                    to_commit.push(object);
                }
            }
        }
        if to_commit.is_empty() {
            return Vec::new();
        }
        let Some(device) = self.device.upgrade() else {
            log::error!(
                "GraphicsDevice was dropped; cannot commit {} texture objects",
                to_commit.len()
            );
            return Vec::new();
        };

        let source = self.source.as_ref();
        let chunk_size = to_commit
            .len()
            .div_ceil(self.thread_pool.num_threads())
            .max(1);
        self.thread_pool.scope(|s| {
            for chunk in to_commit.chunks(chunk_size) {
                s.spawn(move || {
                    for object in chunk {
                        object.load(source);
                    }
                });
            }
        });

        for object in &to_commit {
            object.commit_gpu(&device);
        }
        to_commit
    }

    /// Evict unreferenced objects, returning how many were removed.
    ///
    /// Uses the registry-wide recycle count; with the default of 0 an
    /// object is evicted by the first sweep after its last external
    /// reference goes away.
    pub fn garbage_collect(&self) -> usize {
        let recycle_count = self.recycle_count.load(Ordering::Acquire);
        self.instances.garbage_collect(recycle_count, |object| {
            log::trace!("Evicting texture object {}", object.identifier().file_path());
        })
    }

    /// How many extra sweeps an unreferenced object survives; negative
    /// disables eviction entirely.
    pub fn set_recycle_count(&self, recycle_count: i32) {
        self.recycle_count.store(recycle_count, Ordering::Release);
    }

    /// Update an object's byte budget, queueing a reload if it changed.
    pub fn set_target_memory(&self, object: &Arc<TextureObject>, target_memory: u64) {
        if object.target_memory() == target_memory {
            return;
        }
        object.store_target_memory(target_memory);
        self.mark_texture_object_dirty(object);
    }

    /// Total bytes of GPU memory held by committed objects.
    pub fn total_memory(&self) -> i64 {
        self.total_memory.load(Ordering::Acquire)
    }

    /// Number of cached objects, including not yet committed ones.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl std::fmt::Debug for TextureObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureObjectRegistry")
            .field("objects", &self.len())
            .field("total_memory", &self.total_memory())
            .finish()
    }
}

// Ensure TextureObjectRegistry is Send + Sync
static_assertions::assert_impl_all!(TextureObjectRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::super::identifier::SubtextureIdentifier;
    use super::super::source::{MemoryTextureSource, SourceTexture};
    use super::*;
    use crate::instance::GraphicsInstance;
    use oleander_core::texture::{CpuTexture, TextureFormat};

    fn solid(width: u32, height: u32) -> CpuTexture {
        CpuTexture::new_2d(
            width,
            height,
            TextureFormat::Rgba8Unorm,
            vec![200u8; (width * height * 4) as usize],
        )
    }

    fn create_test_registry() -> (Arc<GraphicsDevice>, Arc<MemoryTextureSource>, TextureObjectRegistry)
    {
        let instance = GraphicsInstance::new().unwrap();
        let device = instance.create_device().unwrap();
        let source = Arc::new(MemoryTextureSource::new());
        source.add_uv("a.png", SourceTexture::new(solid(4, 4)));
        source.add_uv("b.png", SourceTexture::new(solid(8, 8)));
        let registry = TextureObjectRegistry::new(&device, source.clone());
        (device, source, registry)
    }

    #[test]
    fn test_allocate_deduplicates() {
        let (_device, _source, registry) = create_test_registry();
        let a0 = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        let a1 = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        let b = registry
            .allocate_texture_object(&TextureIdentifier::new("b.png"), TextureType::Uv);

        assert!(Arc::ptr_eq(&a0, &a1));
        assert!(!Arc::ptr_eq(&a0, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_dedup_is_by_identifier_hash_only() {
        let (_device, _source, registry) = create_test_registry();
        let first = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        let second = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Field);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.texture_type(), TextureType::Uv);
    }

    #[test]
    fn test_commit_loads_dirty_objects() {
        let (_device, _source, registry) = create_test_registry();
        let object = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);

        let committed = registry.commit();
        assert_eq!(committed.len(), 1);
        assert!(Arc::ptr_eq(&committed[0], &object));
        assert!(object.is_valid());
        assert_eq!(registry.total_memory(), 64);

        // Nothing left dirty.
        assert!(registry.commit().is_empty());
    }

    #[test]
    fn test_commit_deduplicates_dirty_marks() {
        let (_device, _source, registry) = create_test_registry();
        let object = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        registry.mark_texture_object_dirty(&object);
        registry.mark_texture_object_dirty(&object);

        assert_eq!(registry.commit().len(), 1);
    }

    #[test]
    fn test_commit_many_objects() {
        let (_device, source, registry) = create_test_registry();
        for i in 0..16 {
            source.add_uv(format!("t{}.png", i), SourceTexture::new(solid(2, 2)));
        }
        let objects: Vec<_> = (0..16)
            .map(|i| {
                registry.allocate_texture_object(
                    &TextureIdentifier::new(format!("t{}.png", i)),
                    TextureType::Uv,
                )
            })
            .collect();

        assert_eq!(registry.commit().len(), 16);
        assert!(objects.iter().all(|o| o.is_valid()));
        assert_eq!(registry.total_memory(), 16 * 16);
    }

    #[test]
    fn test_commit_after_device_dropped() {
        let instance = GraphicsInstance::new().unwrap();
        let device = instance.create_device().unwrap();
        let source = Arc::new(MemoryTextureSource::new());
        source.add_uv("a.png", SourceTexture::new(solid(4, 4)));
        let registry = TextureObjectRegistry::new(&device, source);
        let _object = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);

        drop(device);
        assert!(registry.commit().is_empty());
    }

    #[test]
    fn test_garbage_collect_keeps_referenced_objects() {
        let (_device, _source, registry) = create_test_registry();
        let object = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        registry.commit();

        assert_eq!(registry.garbage_collect(), 0);
        assert_eq!(registry.len(), 1);
        drop(object);
    }

    #[test]
    fn test_garbage_collect_releases_memory() {
        let (_device, _source, registry) = create_test_registry();
        let object = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        registry.commit();
        assert_eq!(registry.total_memory(), 64);

        drop(object);
        assert_eq!(registry.garbage_collect(), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.total_memory(), 0);
    }

    #[test]
    fn test_recycle_count_gives_second_chance() {
        let (_device, _source, registry) = create_test_registry();
        registry.set_recycle_count(1);
        let object = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        registry.commit();
        drop(object);

        assert_eq!(registry.garbage_collect(), 0);
        assert_eq!(registry.garbage_collect(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reallocation_resets_recycle_counter() {
        let (_device, _source, registry) = create_test_registry();
        registry.set_recycle_count(1);
        let object = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        registry.commit();
        drop(object);
        assert_eq!(registry.garbage_collect(), 0);

        // Looking the object up again makes it young.
        let revived = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        drop(revived);
        assert_eq!(registry.garbage_collect(), 0);
        assert_eq!(registry.garbage_collect(), 1);
    }

    #[test]
    fn test_mark_file_path_dirty_touches_every_variant() {
        let (_device, _source, registry) = create_test_registry();
        let plain = registry
            .allocate_texture_object(&TextureIdentifier::new("a.png"), TextureType::Uv);
        let flipped = registry.allocate_texture_object(
            &TextureIdentifier::with_subtexture(
                "a.png",
                SubtextureIdentifier::AssetUv {
                    flip_vertically: true,
                    premultiply_alpha: false,
                    color_space: Default::default(),
                },
            ),
            TextureType::Uv,
        );
        let other = registry
            .allocate_texture_object(&TextureIdentifier::new("b.png"), TextureType::Uv);
        registry.commit();

        registry.mark_texture_file_path_dirty("a.png");
        let committed = registry.commit();
        assert_eq!(committed.len(), 2);
        assert!(committed.iter().any(|o| Arc::ptr_eq(o, &plain)));
        assert!(committed.iter().any(|o| Arc::ptr_eq(o, &flipped)));
        assert!(!committed.iter().any(|o| Arc::ptr_eq(o, &other)));
    }

    #[test]
    fn test_set_target_memory_marks_dirty_only_on_change() {
        let (_device, _source, registry) = create_test_registry();
        let object = registry
            .allocate_texture_object(&TextureIdentifier::new("b.png"), TextureType::Uv);
        registry.commit();
        assert_eq!(registry.total_memory(), 256);

        registry.set_target_memory(&object, 0);
        assert!(registry.commit().is_empty());

        registry.set_target_memory(&object, 64);
        let committed = registry.commit();
        assert_eq!(committed.len(), 1);
        assert!(registry.total_memory() < 256);
    }
}
