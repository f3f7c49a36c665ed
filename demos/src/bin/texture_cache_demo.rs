//! # Texture Cache Demo
//!
//! Simulates a handful of frames of texture churn against the cache:
//! materials come online, a file changes on disk, a material retires.
//! Run with `RUST_LOG=debug` to watch the registries work.

use std::sync::Arc;

use oleander_core::math::{BoundingBox, Vec3};
use oleander_core::sampler::CpuSampler;
use oleander_core::texture::{CpuTexture, TextureFormat};
use oleander_graphics::instance::GraphicsInstance;
use oleander_graphics::texture::{
    MemoryTextureSource, PtexSource, ShaderCode, SourceField, SourceTexture,
    TextureHandleRegistry, TextureIdentifier, TextureType, UdimTile,
};
use oleander_graphics::GraphicsError;

/// Stand-in for a shader binding textures out of the cache.
#[derive(Debug)]
struct Material {
    name: &'static str,
}

impl Material {
    fn new(name: &'static str) -> Arc<dyn ShaderCode> {
        Arc::new(Self { name })
    }
}

impl ShaderCode for Material {
    fn debug_name(&self) -> &str {
        self.name
    }
}

fn checkerboard(size: u32) -> CpuTexture {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let value = if (x + y) % 2 == 0 { 230u8 } else { 40u8 };
            data.extend_from_slice(&[value, value, value, 255]);
        }
    }
    CpuTexture::new_2d(size, size, TextureFormat::Rgba8UnormSrgb, data)
}

fn solid(size: u32, value: u8) -> CpuTexture {
    CpuTexture::new_2d(
        size,
        size,
        TextureFormat::Rgba8Unorm,
        vec![value; (size * size * 4) as usize],
    )
}

fn populate_source(source: &MemoryTextureSource) {
    source.add_uv("wall.png", SourceTexture::new(checkerboard(256)));
    source.add_uv("sky.png", SourceTexture::new(solid(128, 200)));
    source.add_field(
        "smoke.vdb",
        SourceField {
            texture: CpuTexture::new_3d(
                32,
                32,
                32,
                TextureFormat::R32Float,
                vec![0u8; 32 * 32 * 32 * 4],
            ),
            bounding_box: BoundingBox::new(Vec3::new(-2.0, 0.0, -2.0), Vec3::new(2.0, 4.0, 2.0)),
        },
    );
    source.add_udim(
        "terrain.<UDIM>.png",
        vec![
            UdimTile {
                tile: 1001,
                texture: solid(64, 80),
            },
            UdimTile {
                tile: 1002,
                texture: solid(64, 120),
            },
            UdimTile {
                tile: 1011,
                texture: solid(32, 160),
            },
        ],
    );
    source.add_ptex(
        "statue.ptx",
        PtexSource {
            texels: CpuTexture::new_2d_array(
                16,
                16,
                4,
                TextureFormat::Rgba8Unorm,
                vec![90u8; 16 * 16 * 4 * 4],
            ),
            layout: vec![0, 0, 1, 1, 2, 2, 3, 3],
        },
    );
}

fn run_frame(registry: &TextureHandleRegistry, label: &str) {
    let consumers = registry.commit();
    let mut names: Vec<&str> = consumers.iter().map(|c| c.debug_name()).collect();
    names.sort_unstable();
    log::info!(
        "{}: {} texture objects, {} samplers, {} bytes on the GPU, rebinding {:?}",
        label,
        registry.texture_object_registry().len(),
        registry.sampler_object_registry().len(),
        registry.texture_object_registry().total_memory(),
        names
    );
}

fn main() -> Result<(), GraphicsError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    oleander_core::init();
    oleander_graphics::init();

    let instance = GraphicsInstance::new()?;
    let device = instance.create_device()?;

    let source = Arc::new(MemoryTextureSource::new());
    populate_source(&source);

    let registry = TextureHandleRegistry::new(&device, source.clone());
    // Cap volume fields at 1 MiB unless a handle asks for more.
    registry.set_memory_request_for_texture_type(TextureType::Field, 1 << 20);

    // Frame 1: the wall and sky materials come online.
    let wall_material = Material::new("wall");
    let sky_material = Material::new("sky");
    let wall = registry.allocate_texture_handle(
        &TextureIdentifier::new("wall.png"),
        TextureType::Uv,
        &CpuSampler::linear(),
        1 << 16,
        Arc::downgrade(&wall_material),
    );
    let sky = registry.allocate_texture_handle(
        &TextureIdentifier::new("sky.png"),
        TextureType::Uv,
        &CpuSampler::linear(),
        0,
        Arc::downgrade(&sky_material),
    );
    run_frame(&registry, "frame 1 (startup)");
    log::info!(
        "wall is {}x{} at budget {}",
        wall.texture().texture().map_or(0, |t| t.width()),
        wall.texture().texture().map_or(0, |t| t.height()),
        wall.texture().target_memory()
    );

    // Frame 2: nothing changed.
    run_frame(&registry, "frame 2 (idle)");

    // Frame 3: an effects material brings in the volume, terrain, and
    // statue textures, sharing the wall texture too.
    let effects_material = Material::new("effects");
    let _smoke = registry.allocate_texture_handle(
        &TextureIdentifier::new("smoke.vdb"),
        TextureType::Field,
        &CpuSampler::linear(),
        0,
        Arc::downgrade(&effects_material),
    );
    let _terrain = registry.allocate_texture_handle(
        &TextureIdentifier::new("terrain.<UDIM>.png"),
        TextureType::Udim,
        &CpuSampler::linear(),
        0,
        Arc::downgrade(&effects_material),
    );
    let _statue = registry.allocate_texture_handle(
        &TextureIdentifier::new("statue.ptx"),
        TextureType::Ptex,
        &CpuSampler::linear(),
        0,
        Arc::downgrade(&effects_material),
    );
    let _wall_again = registry.allocate_texture_handle(
        &TextureIdentifier::new("wall.png"),
        TextureType::Uv,
        &CpuSampler::linear(),
        0,
        Arc::downgrade(&effects_material),
    );
    run_frame(&registry, "frame 3 (effects online)");

    // Frame 4: wall.png changed on disk; every consumer of it rebinds.
    source.add_uv("wall.png", SourceTexture::new(checkerboard(512)));
    registry.mark_texture_file_path_dirty("wall.png");
    run_frame(&registry, "frame 4 (wall.png touched)");

    // Frame 5: the sky material retires and its texture is evicted.
    drop(sky);
    run_frame(&registry, "frame 5 (sky retired)");

    log::info!(
        "done; {} bytes resident across {} textures",
        registry.texture_object_registry().total_memory(),
        registry.texture_object_registry().len()
    );
    Ok(())
}
