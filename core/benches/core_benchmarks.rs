use criterion::{Criterion, black_box, criterion_group, criterion_main};

use oleander_core::math::{BoundingBox, Vec3};
use oleander_core::texture::{CpuTexture, TextureFormat};
use oleander_core::thread_pool::ThreadPool;

// ---------------------------------------------------------------------------
// Bounding box math
// ---------------------------------------------------------------------------

fn bench_sampling_transform(c: &mut Criterion) {
    let bbox = BoundingBox::new(Vec3::new(-3.0, 0.0, 2.0), Vec3::new(5.0, 4.0, 9.0));
    c.bench_function("bounding_box_sampling_transform", |b| {
        b.iter(|| black_box(bbox.sampling_transform()));
    });
}

// ---------------------------------------------------------------------------
// CPU texture sizing
// ---------------------------------------------------------------------------

fn bench_expected_byte_size(c: &mut Criterion) {
    let mut tex = CpuTexture::new_2d(4096, 4096, TextureFormat::Rgba8Unorm, Vec::new());
    tex.mip_level_count = 12;
    c.bench_function("cpu_texture_expected_byte_size_12_mips", |b| {
        b.iter(|| black_box(tex.expected_byte_size()));
    });
}

// ---------------------------------------------------------------------------
// Thread pool
// ---------------------------------------------------------------------------

fn bench_scope_chunked_sum(c: &mut Criterion) {
    let pool = ThreadPool::new(4);
    let items: Vec<u64> = (0..65536).collect();
    c.bench_function("thread_pool_chunked_sum_64k", |b| {
        b.iter(|| {
            use std::sync::atomic::{AtomicU64, Ordering};
            let total = AtomicU64::new(0);
            let chunk_size = items.len().div_ceil(pool.num_threads()).max(1);
            pool.scope(|s| {
                for chunk in items.chunks(chunk_size) {
                    s.spawn(|| {
                        let local: u64 = chunk.iter().sum();
                        total.fetch_add(local, Ordering::Relaxed);
                    });
                }
            });
            black_box(total.load(Ordering::Relaxed))
        });
    });
}

criterion_group!(
    benches,
    bench_sampling_transform,
    bench_expected_byte_size,
    bench_scope_chunked_sum
);
criterion_main!(benches);
