use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use oleander_core::sampler::CpuSampler;
use oleander_core::texture::{CpuTexture, TextureFormat};
use oleander_graphics::instance::GraphicsInstance;
use oleander_graphics::texture::{
    shrink_to_budget, MemoryTextureSource, ShaderCode, SourceTexture, TextureHandleRegistry,
    TextureIdentifier, TextureType,
};
use oleander_graphics::InstanceRegistry;

#[derive(Debug)]
struct BenchShader;

impl ShaderCode for BenchShader {}

fn solid(width: u32, height: u32) -> CpuTexture {
    CpuTexture::new_2d(
        width,
        height,
        TextureFormat::Rgba8Unorm,
        vec![127u8; (width * height * 4) as usize],
    )
}

// ---------------------------------------------------------------------------
// Identifier hashing
// ---------------------------------------------------------------------------

fn bench_identifier_hash(c: &mut Criterion) {
    let plain = TextureIdentifier::new("assets/textures/brick_wall_diffuse_4k.png");

    c.bench_function("identifier_hash64", |b| {
        b.iter(|| {
            black_box(plain.hash64());
        });
    });
}

// ---------------------------------------------------------------------------
// Instance registry
// ---------------------------------------------------------------------------

fn bench_registry_get_hit(c: &mut Criterion) {
    let registry = InstanceRegistry::new();
    let mut held = Vec::new();
    for key in 0..1024u64 {
        let mut instance = registry.get_instance(key);
        let value = Arc::new(key);
        instance.set_value(value.clone());
        held.push(value);
    }

    c.bench_function("instance_registry_get_hit", |b| {
        b.iter(|| {
            let instance = registry.get_instance(black_box(512));
            black_box(instance.is_first_instance());
        });
    });
}

fn bench_registry_find_miss(c: &mut Criterion) {
    let registry = InstanceRegistry::<u64>::new();

    c.bench_function("instance_registry_find_miss", |b| {
        b.iter(|| {
            black_box(registry.find_instance(black_box(99)).is_none());
        });
    });
}

fn bench_registry_gc_all_referenced(c: &mut Criterion) {
    let registry = InstanceRegistry::new();
    let mut held = Vec::new();
    for key in 0..1024u64 {
        let mut instance = registry.get_instance(key);
        let value = Arc::new(key);
        instance.set_value(value.clone());
        held.push(value);
    }

    c.bench_function("instance_registry_gc_1024_referenced", |b| {
        b.iter(|| {
            black_box(registry.garbage_collect(0, |_| {}));
        });
    });
}

// ---------------------------------------------------------------------------
// Texture cache
// ---------------------------------------------------------------------------

fn bench_allocate_handle_warm(c: &mut Criterion) {
    let instance = GraphicsInstance::new().unwrap();
    let device = instance.create_device().unwrap();
    let source = Arc::new(MemoryTextureSource::new());
    source.add_uv("a.png", SourceTexture::new(solid(16, 16)));
    let registry = TextureHandleRegistry::new(&device, source);
    let shader: Arc<dyn ShaderCode> = Arc::new(BenchShader);

    let identifier = TextureIdentifier::new("a.png");
    let keep = registry.allocate_texture_handle(
        &identifier,
        TextureType::Uv,
        &CpuSampler::linear(),
        0,
        Arc::downgrade(&shader),
    );
    registry.commit();

    // Allocate against the warm cache, then commit the churn away so
    // dirty lists stay bounded across iterations.
    c.bench_function("handle_churn_cached_texture", |b| {
        b.iter(|| {
            let handle = registry.allocate_texture_handle(
                &identifier,
                TextureType::Uv,
                &CpuSampler::linear(),
                0,
                Arc::downgrade(&shader),
            );
            black_box(&handle);
            drop(handle);
            registry.commit();
        });
    });
    drop(keep);
}

fn bench_commit_32_textures(c: &mut Criterion) {
    let instance = GraphicsInstance::new().unwrap();
    let device = instance.create_device().unwrap();
    let source = Arc::new(MemoryTextureSource::new());
    for i in 0..32 {
        source.add_uv(format!("t{}.png", i), SourceTexture::new(solid(16, 16)));
    }
    let shader: Arc<dyn ShaderCode> = Arc::new(BenchShader);

    c.bench_function("commit_32_new_textures", |b| {
        b.iter_with_setup(
            || {
                let registry = TextureHandleRegistry::new(&device, source.clone());
                let handles: Vec<_> = (0..32)
                    .map(|i| {
                        registry.allocate_texture_handle(
                            &TextureIdentifier::new(format!("t{}.png", i)),
                            TextureType::Uv,
                            &CpuSampler::linear(),
                            0,
                            Arc::downgrade(&shader),
                        )
                    })
                    .collect();
                (registry, handles)
            },
            |(registry, handles)| {
                black_box(registry.commit());
                drop(handles);
            },
        );
    });
}

// ---------------------------------------------------------------------------
// CPU-side resizing
// ---------------------------------------------------------------------------

fn bench_shrink_to_budget(c: &mut Criterion) {
    let texture = solid(256, 256);

    c.bench_function("shrink_256x256_to_1kb", |b| {
        b.iter(|| {
            black_box(shrink_to_budget(&texture, 1024));
        });
    });
}

criterion_group!(
    benches,
    bench_identifier_hash,
    bench_registry_get_hit,
    bench_registry_find_miss,
    bench_registry_gc_all_referenced,
    bench_allocate_handle_warm,
    bench_commit_32_textures,
    bench_shrink_to_budget,
);
criterion_main!(benches);
