//! Common utilities for texture cache integration tests.
//!
//! Provides a shared test context wrapping an instance, device, in-memory
//! texture source, and handle registry, plus data generators for the
//! different texture families.

use std::sync::Arc;

use oleander_core::math::{BoundingBox, Vec3};
use oleander_graphics::instance::GraphicsInstance;
use oleander_graphics::texture::{
    MemoryTextureSource, PtexSource, ShaderCode, SourceField, SourceTexture,
    TextureHandleRegistry, UdimTile,
};
use oleander_graphics::{
    CpuTexture, DeviceCapabilities, GraphicsDevice, TextureFormat,
};

// ============================================================================
// Device Profiles
// ============================================================================

/// Device capability profiles the cache behaves differently under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProfile {
    /// Baseline device, textures bound through bind groups.
    Plain,
    /// Bindless textures and samplers enabled.
    Bindless,
}

impl DeviceProfile {
    pub fn capabilities(self) -> DeviceCapabilities {
        match self {
            DeviceProfile::Plain => DeviceCapabilities::default(),
            DeviceProfile::Bindless => DeviceCapabilities::bindless(),
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Test context providing the full allocate/commit environment.
pub struct TestContext {
    /// Graphics instance (kept alive for the device).
    #[allow(dead_code)]
    instance: Arc<GraphicsInstance>,
    /// Graphics device backing all GPU resources.
    pub device: Arc<GraphicsDevice>,
    /// In-memory texture source the registry loads from.
    pub source: Arc<MemoryTextureSource>,
    /// The registry under test.
    pub registry: TextureHandleRegistry,
}

impl TestContext {
    /// Create a test context for the given device profile.
    pub fn new(profile: DeviceProfile) -> Self {
        let instance = GraphicsInstance::new().expect("Failed to create instance");
        let device = instance
            .create_device_with_capabilities(profile.capabilities())
            .expect("Failed to create device");
        let source = Arc::new(MemoryTextureSource::new());
        let registry = TextureHandleRegistry::new(&device, source.clone());
        Self {
            instance,
            device,
            source,
            registry,
        }
    }
}

// ============================================================================
// Consumers
// ============================================================================

/// Minimal consumer for asserting rebind notifications.
#[derive(Debug)]
pub struct TestShader {
    name: &'static str,
}

impl TestShader {
    pub fn new(name: &'static str) -> Arc<dyn ShaderCode> {
        Arc::new(Self { name })
    }
}

impl ShaderCode for TestShader {
    fn debug_name(&self) -> &str {
        self.name
    }
}

/// Sorted debug names of a consumer set, for order-independent asserts.
pub fn consumer_names(consumers: &[Arc<dyn ShaderCode>]) -> Vec<String> {
    let mut names: Vec<String> = consumers
        .iter()
        .map(|c| c.debug_name().to_string())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Test Data Generators
// ============================================================================

/// Generate a solid RGBA8 2D texture.
pub fn solid_texture(width: u32, height: u32, value: u8) -> CpuTexture {
    CpuTexture::new_2d(
        width,
        height,
        TextureFormat::Rgba8Unorm,
        vec![value; (width * height * 4) as usize],
    )
}

/// Generate a single-channel float 3D texture.
#[allow(dead_code)]
pub fn volume_texture(size: u32) -> CpuTexture {
    CpuTexture::new_3d(
        size,
        size,
        size,
        TextureFormat::R32Float,
        vec![0u8; (size * size * size * 4) as usize],
    )
}

/// Populate the source with one texture per family.
///
/// Registers `color.png` (UV, 8x8), `density.vdb` (field, 4^3),
/// `tiles.<UDIM>.png` (two UDIM tiles), and `faces.ptx` (two-layer
/// ptex with a six-face layout).
#[allow(dead_code)]
pub fn add_one_of_each_family(source: &MemoryTextureSource) {
    source.add_uv("color.png", SourceTexture::new(solid_texture(8, 8, 255)));
    source.add_field(
        "density.vdb",
        SourceField {
            texture: volume_texture(4),
            bounding_box: BoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)),
        },
    );
    source.add_udim(
        "tiles.<UDIM>.png",
        vec![
            UdimTile {
                tile: 1001,
                texture: solid_texture(4, 4, 10),
            },
            UdimTile {
                tile: 1002,
                texture: solid_texture(4, 4, 20),
            },
        ],
    );
    source.add_ptex(
        "faces.ptx",
        PtexSource {
            texels: CpuTexture::new_2d_array(
                4,
                4,
                2,
                TextureFormat::Rgba8Unorm,
                vec![30u8; 128],
            ),
            layout: vec![0, 0, 0, 1, 1, 1],
        },
    );
}
