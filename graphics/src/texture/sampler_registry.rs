//! Registry of live sampler objects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use oleander_core::sampler::CpuSampler;
use parking_lot::Mutex;

use crate::device::GraphicsDevice;

use super::object::TextureObject;
use super::sampler_object::SamplerObject;

/// Tracks every live [`SamplerObject`] so abandoned ones can be freed.
///
/// Samplers are not deduplicated; each handle gets its own. Garbage
/// collection is deferred behind a flag: dropping a handle or replacing
/// a sampler raises it, and the next
/// [`garbage_collect`](Self::garbage_collect) call sweeps. Unflagged
/// sweeps return without taking the lock, keeping the common commit
/// path cheap when no sampler changed.
pub struct SamplerObjectRegistry {
    device: Weak<GraphicsDevice>,
    samplers: Mutex<Vec<Arc<SamplerObject>>>,
    gc_needed: AtomicBool,
}

impl SamplerObjectRegistry {
    pub(crate) fn new(device: &Arc<GraphicsDevice>) -> Self {
        Self {
            device: Arc::downgrade(device),
            samplers: Mutex::new(Vec::new()),
            gc_needed: AtomicBool::new(false),
        }
    }

    /// Create and track a sampler bundle for `texture`.
    ///
    /// Returns `None` if the device is gone or sampler creation failed;
    /// either way the failure is logged and the caller binds nothing.
    pub fn allocate_sampler(
        &self,
        texture: &Arc<TextureObject>,
        parameters: &CpuSampler,
    ) -> Option<Arc<SamplerObject>> {
        let Some(device) = self.device.upgrade() else {
            log::error!(
                "GraphicsDevice was dropped; cannot allocate sampler for {}",
                texture.identifier().file_path()
            );
            return None;
        };
        match SamplerObject::new(&device, texture, parameters) {
            Ok(sampler) => {
                let sampler = Arc::new(sampler);
                self.samplers.lock().push(sampler.clone());
                Some(sampler)
            }
            Err(err) => {
                log::error!(
                    "failed to create sampler for {}: {}",
                    texture.identifier().file_path(),
                    err
                );
                None
            }
        }
    }

    /// Request a sweep on the next [`garbage_collect`](Self::garbage_collect).
    pub fn mark_garbage_collection_needed(&self) {
        self.gc_needed.store(true, Ordering::Release);
    }

    /// Drop tracking entries nobody references anymore.
    ///
    /// Does nothing unless a sweep was requested since the last one.
    /// Returns the number of samplers released.
    pub fn garbage_collect(&self) -> usize {
        if !self.gc_needed.swap(false, Ordering::AcqRel) {
            return 0;
        }
        let mut samplers = self.samplers.lock();
        let before = samplers.len();
        let mut i = 0;
        while i < samplers.len() {
            if Arc::strong_count(&samplers[i]) == 1 {
                // Order does not matter, so fill the hole from the end.
                samplers.swap_remove(i);
            } else {
                i += 1;
            }
        }
        let removed = before - samplers.len();
        if removed > 0 {
            log::trace!("SamplerObjectRegistry: released {} samplers", removed);
        }
        removed
    }

    /// Number of tracked sampler objects.
    pub fn len(&self) -> usize {
        self.samplers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.lock().is_empty()
    }
}

impl std::fmt::Debug for SamplerObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerObjectRegistry")
            .field("samplers", &self.len())
            .finish()
    }
}

// Ensure SamplerObjectRegistry is Send + Sync
static_assertions::assert_impl_all!(SamplerObjectRegistry: Send, Sync);
