//! Benchmarks for the squash compression pipeline.
//!
//! Run with: cargo bench -p squash-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, RgbImage};
use squash_core::config::LimitsConfig;
use squash_core::pipeline::{
    classify, target_dimensions, Compressor, ImageDecoder, ImageEncoder, ResourceTracker,
};
use squash_core::{CompressionOptions, Config, SourceFile};
use std::io::Cursor;

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn benchmark_classify(c: &mut Criterion) {
    let files = [
        SourceFile::new("a.jpg", "image/jpeg", Vec::<u8>::new()),
        SourceFile::new("b.HEIC", "", Vec::<u8>::new()),
        SourceFile::new("c.webp", "image/webp; q=1", Vec::<u8>::new()),
    ];

    c.bench_function("classify", |b| {
        b.iter(|| {
            for file in &files {
                black_box(classify(black_box(file)));
            }
        })
    });
}

fn benchmark_target_dimensions(c: &mut Criterion) {
    c.bench_function("target_dimensions", |b| {
        b.iter(|| target_dimensions(black_box(4032), black_box(3024), black_box(2048)))
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let file = SourceFile::new("bench.png", "image/png", sample_png(1024, 768));
    let decoder = ImageDecoder::new(LimitsConfig::default(), ResourceTracker::new());
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("decode_1024x768_png", |b| {
        b.iter(|| {
            let _ = rt.block_on(decoder.decode(black_box(&file)));
        })
    });
}

fn benchmark_encode(c: &mut Criterion) {
    let file = SourceFile::new("bench.png", "image/png", sample_png(3000, 2000));
    let decoder = ImageDecoder::new(LimitsConfig::default(), ResourceTracker::new());
    let encoder = ImageEncoder::new();
    let options = CompressionOptions::default();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bitmap = rt.block_on(decoder.decode(&file)).unwrap();

    c.bench_function("encode_3000x2000_to_webp", |b| {
        b.iter(|| {
            let _ = rt.block_on(encoder.encode(black_box(&bitmap), &options, "bench.png"));
        })
    });
}

fn benchmark_compress_one(c: &mut Criterion) {
    let file = SourceFile::new("bench.png", "image/png", sample_png(640, 480));
    let compressor = Compressor::new(&Config::default());
    let options = CompressionOptions::default();
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("compress_one_640x480", |b| {
        b.iter(|| {
            let _ = rt.block_on(compressor.compress_one(black_box(&file), &options));
        })
    });
}

criterion_group!(
    benches,
    benchmark_classify,
    benchmark_target_dimensions,
    benchmark_decode,
    benchmark_encode,
    benchmark_compress_one,
);
criterion_main!(benches);
