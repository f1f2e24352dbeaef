use barcode_ensemble::utils::grayscale::{rgb_to_grayscale, rgb_to_grayscale_parallel};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};

fn frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]))
}

fn bench_rgb_to_grayscale_crop(c: &mut Criterion) {
    let image = frame(200, 120);
    c.bench_function("rgb_to_grayscale_200x120", |b| {
        b.iter(|| rgb_to_grayscale(black_box(&image)))
    });
}

fn bench_rgb_to_grayscale_medium(c: &mut Criterion) {
    let image = frame(640, 480);
    c.bench_function("rgb_to_grayscale_640x480", |b| {
        b.iter(|| rgb_to_grayscale(black_box(&image)))
    });
}

fn bench_rgb_to_grayscale_large(c: &mut Criterion) {
    let image = frame(1920, 1080);
    c.bench_function("rgb_to_grayscale_1920x1080", |b| {
        b.iter(|| rgb_to_grayscale(black_box(&image)))
    });
}

fn bench_rgb_to_grayscale_parallel_medium(c: &mut Criterion) {
    let image = frame(640, 480);
    c.bench_function("rgb_to_grayscale_parallel_640x480", |b| {
        b.iter(|| rgb_to_grayscale_parallel(black_box(&image)))
    });
}

fn bench_rgb_to_grayscale_parallel_large(c: &mut Criterion) {
    let image = frame(1920, 1080);
    c.bench_function("rgb_to_grayscale_parallel_1920x1080", |b| {
        b.iter(|| rgb_to_grayscale_parallel(black_box(&image)))
    });
}

criterion_group!(
    benches,
    bench_rgb_to_grayscale_crop,
    bench_rgb_to_grayscale_medium,
    bench_rgb_to_grayscale_large,
    bench_rgb_to_grayscale_parallel_medium,
    bench_rgb_to_grayscale_parallel_large
);
criterion_main!(benches);
