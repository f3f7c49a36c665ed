//! Generic instance registry for sharing values by key.
//!
//! This module provides [`InstanceRegistry<V>`], a concurrent map from 64-bit
//! keys to shared values. Several callers asking for the same key receive the
//! same value, so expensive resources (textures, topologies, shader programs)
//! are created once and shared.
//!
//! # Motivation
//!
//! A scene commonly references the same asset many times. Creating one GPU
//! resource per reference wastes memory and upload bandwidth. The registry
//! deduplicates by key: the first caller creates the value, everyone else
//! receives a clone of the shared handle.
//!
//! # Locking
//!
//! [`InstanceRegistry::get_instance`] returns an [`Instance`] accessor that
//! holds the registry lock until it is dropped. This closes the race between
//! "look up" and "publish": the first caller can construct and publish its
//! value while every other caller for the same key waits. Drop the accessor
//! before touching the registry again or the thread will deadlock on itself.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use oleander_graphics::registry::InstanceRegistry;
//!
//! let registry = InstanceRegistry::new();
//! let mut instance = registry.get_instance(42);
//! if instance.is_first_instance() {
//!     instance.set_value(Arc::new(7u32));
//! }
//! let value = instance.value_cloned().unwrap();
//! assert_eq!(*value, 7);
//! drop(instance);
//! assert_eq!(registry.len(), 1);
//! ```

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;

struct InstanceHolder<V> {
    /// `None` between reservation and the first `set_value`.
    value: Option<V>,
    /// Number of consecutive garbage collection sweeps this entry has
    /// survived while unreferenced. Reset on every lookup.
    recycle_count: i32,
}

/// Accessor for a single registry entry.
///
/// Holds the registry lock for its whole lifetime. Exactly one accessor per
/// key observes [`is_first_instance`](Instance::is_first_instance) as `true`;
/// that caller is responsible for publishing the value with
/// [`set_value`](Instance::set_value).
pub struct Instance<'a, V> {
    key: u64,
    first_instance: bool,
    guard: MutexGuard<'a, FxHashMap<u64, InstanceHolder<V>>>,
}

impl<V> Instance<'_, V> {
    /// The key this accessor refers to.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Whether this accessor created the entry.
    pub fn is_first_instance(&self) -> bool {
        self.first_instance
    }

    /// Publish the value for this key.
    pub fn set_value(&mut self, value: V) {
        if let Some(holder) = self.guard.get_mut(&self.key) {
            holder.value = Some(value);
        }
    }

    /// The published value, if any.
    pub fn value(&self) -> Option<&V> {
        self.guard.get(&self.key).and_then(|h| h.value.as_ref())
    }
}

impl<V: Clone> Instance<'_, V> {
    /// Clone of the published value, if any.
    pub fn value_cloned(&self) -> Option<V> {
        self.value().cloned()
    }
}

/// Concurrent map from 64-bit keys to shared values.
///
/// See the [module documentation](self) for usage and locking rules.
pub struct InstanceRegistry<V> {
    instances: Mutex<FxHashMap<u64, InstanceHolder<V>>>,
}

impl<V> InstanceRegistry<V> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(FxHashMap::default()),
        }
    }

    /// Look up `key`, reserving the entry if it does not exist.
    ///
    /// The returned accessor holds the registry lock until dropped.
    pub fn get_instance(&self, key: u64) -> Instance<'_, V> {
        let mut guard = self.instances.lock();
        let first_instance = match guard.get_mut(&key) {
            Some(holder) => {
                holder.recycle_count = 0;
                false
            }
            None => {
                guard.insert(
                    key,
                    InstanceHolder {
                        value: None,
                        recycle_count: 0,
                    },
                );
                true
            }
        };
        Instance {
            key,
            first_instance,
            guard,
        }
    }

    /// Look up `key` without reserving.
    ///
    /// Returns `None` when no value has been published for the key. The
    /// returned accessor holds the registry lock until dropped.
    pub fn find_instance(&self, key: u64) -> Option<Instance<'_, V>> {
        let mut guard = self.instances.lock();
        match guard.get_mut(&key) {
            Some(holder) if holder.value.is_some() => {
                holder.recycle_count = 0;
            }
            _ => return None,
        }
        Some(Instance {
            key,
            first_instance: false,
            guard,
        })
    }

    /// Visit every published entry.
    pub fn visit<F>(&self, mut f: F)
    where
        F: FnMut(u64, &V),
    {
        let guard = self.instances.lock();
        for (key, holder) in guard.iter() {
            if let Some(value) = &holder.value {
                f(*key, value);
            }
        }
    }

    /// Remove every entry.
    pub fn invalidate(&self) {
        self.instances.lock().clear();
    }

    /// Number of entries, including unpublished reservations.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl<T> InstanceRegistry<Arc<T>> {
    /// Remove entries that stayed unreferenced for more than `recycle_count`
    /// consecutive sweeps.
    ///
    /// An entry is unreferenced when the registry holds the only strong
    /// reference to its value. Each sweep increments the entry's counter;
    /// eviction happens when the counter exceeds `recycle_count`. Looking an
    /// entry up resets its counter, so recently used values always get the
    /// full number of sweeps again. With `recycle_count == 0` unreferenced
    /// entries are evicted on the first sweep; a negative value disables
    /// collection entirely.
    ///
    /// `on_remove` is called for every evicted value while the registry lock
    /// is held, before the value is dropped.
    ///
    /// Returns the number of evicted entries.
    pub fn garbage_collect<F>(&self, recycle_count: i32, mut on_remove: F) -> usize
    where
        F: FnMut(&Arc<T>),
    {
        let mut guard = self.instances.lock();
        let mut removed = 0;
        guard.retain(|_, holder| {
            let unreferenced = match &holder.value {
                // All clones are handed out under this same mutex, so the
                // strong count cannot race upward while we hold it.
                Some(value) => Arc::strong_count(value) == 1,
                None => true,
            };
            if !unreferenced {
                return true;
            }
            holder.recycle_count += 1;
            if recycle_count >= 0 && holder.recycle_count > recycle_count {
                if let Some(value) = &holder.value {
                    on_remove(value);
                }
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

impl<V> Default for InstanceRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

// Ensure the registry is Send + Sync for shared values
static_assertions::assert_impl_all!(InstanceRegistry<Arc<u32>>: Send, Sync);
