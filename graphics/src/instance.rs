//! Graphics instance.
//!
//! The [`GraphicsInstance`] is the top-level entry point for the graphics system.
//! It manages one or more [`GraphicsDevice`]s.

use std::sync::{Arc, RwLock, Weak};

use crate::backend::{self, GpuBackend};
use crate::device::{DeviceCapabilities, GraphicsDevice};
use crate::error::GraphicsError;

/// Information about a graphics adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Adapter name.
    pub name: String,
    /// Adapter vendor.
    pub vendor: String,
    /// Device type (discrete, integrated, etc.).
    pub device_type: AdapterType,
}

/// Type of graphics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterType {
    /// Discrete GPU (dedicated graphics card).
    Discrete,
    /// Integrated GPU (shared with CPU).
    Integrated,
    /// Software renderer.
    Software,
    /// Unknown adapter type.
    Unknown,
}

/// The graphics instance manages devices and adapters.
///
/// This is the top-level entry point for the graphics system. Create an instance
/// to enumerate available adapters and create devices.
///
/// Devices are tracked weakly; a device lives exactly as long as the
/// strong references the caller holds to it.
///
/// # Thread Safety
///
/// `GraphicsInstance` is `Send + Sync` and can be safely shared across threads.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new()?;
/// let device = instance.create_device()?;
/// ```
pub struct GraphicsInstance {
    /// Weak self-reference for creating devices.
    self_ref: RwLock<Weak<GraphicsInstance>>,
    /// Devices created by this instance.
    devices: RwLock<Vec<Weak<GraphicsDevice>>>,
    /// GPU backend for this instance.
    backend: Arc<dyn GpuBackend>,
}

impl GraphicsInstance {
    /// Create a new graphics instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the graphics system cannot be initialized.
    pub fn new() -> Result<Arc<Self>, GraphicsError> {
        log::info!("Creating GraphicsInstance");

        // Create the GPU backend
        let backend = backend::create_backend()?;
        log::info!("Using GPU backend: {}", backend.name());

        let instance = Arc::new(Self {
            self_ref: RwLock::new(Weak::new()),
            devices: RwLock::new(Vec::new()),
            backend,
        });

        // Store self-reference
        if let Ok(mut self_ref) = instance.self_ref.write() {
            *self_ref = Arc::downgrade(&instance);
        }

        Ok(instance)
    }

    /// Get the GPU backend (internal use only).
    pub(crate) fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Get the strong self-reference.
    fn arc_self(&self) -> Option<Arc<GraphicsInstance>> {
        self.self_ref.read().ok().and_then(|r| r.upgrade())
    }

    /// Enumerate available graphics adapters.
    ///
    /// Returns information about all available graphics adapters on the system.
    #[cfg(feature = "dummy")]
    pub fn enumerate_adapters(&self) -> Vec<AdapterInfo> {
        // Dummy implementation returns a single software adapter
        vec![AdapterInfo {
            name: "Dummy Adapter".to_string(),
            vendor: "Oleander".to_string(),
            device_type: AdapterType::Software,
        }]
    }

    /// Create a graphics device.
    ///
    /// Creates a device using the default (best available) adapter and
    /// default capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation fails.
    pub fn create_device(&self) -> Result<Arc<GraphicsDevice>, GraphicsError> {
        self.create_device_with_capabilities(DeviceCapabilities::default())
    }

    /// Create a graphics device with explicit capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation fails.
    pub fn create_device_with_capabilities(
        &self,
        capabilities: DeviceCapabilities,
    ) -> Result<Arc<GraphicsDevice>, GraphicsError> {
        let adapters = self.enumerate_adapters();
        let adapter = adapters.first().ok_or_else(|| {
            GraphicsError::InitializationFailed("no graphics adapters available".to_string())
        })?;
        log::info!("Creating device on adapter: {}", adapter.name);

        let instance = self.arc_self().ok_or_else(|| {
            GraphicsError::ResourceCreationFailed("instance has been dropped".to_string())
        })?;
        let device = Arc::new(GraphicsDevice::new(
            instance,
            adapter.name.clone(),
            capabilities,
        ));

        // Track the device
        if let Ok(mut devices) = self.devices.write() {
            devices.push(Arc::downgrade(&device));
        }

        Ok(device)
    }

    /// Get all live devices created by this instance.
    pub fn devices(&self) -> Vec<Arc<GraphicsDevice>> {
        self.devices
            .read()
            .map(|d| d.iter().filter_map(|w| w.upgrade()).collect())
            .unwrap_or_else(|_| Vec::new())
    }

    /// Get the number of live devices created by this instance.
    pub fn device_count(&self) -> usize {
        self.devices
            .read()
            .map(|d| d.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for GraphicsInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsInstance")
            .field("device_count", &self.device_count())
            .finish()
    }
}

// Ensure GraphicsInstance is Send + Sync
static_assertions::assert_impl_all!(GraphicsInstance: Send, Sync);
