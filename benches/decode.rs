//! Decode Benchmarks
//!
//! ## Groups
//!
//! - `decompress/*`: sub-block walk plus codec, by payload size
//! - `decode/*`: schema-driven object decode, by element count
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench decode
//! cargo bench --bench decode -- "decompress"
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rootio::crates::codec::testing::ByteWriter;
use rootio::crates::schema::{BasicType, StlKind};
use rootio::{BlockDecompressor, ClassSchema, SchemaRegistry, StreamerElement, VersionedObjectDecoder};
use std::io::Write;

fn zlib_block(payload: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(payload).unwrap();
    let body = enc.finish().unwrap();
    let c = (body.len() as u32).to_le_bytes();
    let u = (payload.len() as u32).to_le_bytes();
    let mut out = vec![b'Z', b'L', 8, c[0], c[1], c[2], u[0], u[1], u[2]];
    out.extend_from_slice(&body);
    out
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");
    let decompressor = BlockDecompressor::default();

    for size in [4 * 1024, 256 * 1024, 4 * 1024 * 1024] {
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        // Sub-blocks hold at most 16MiB - 1; split like a writer would
        let mut compressed = Vec::new();
        for chunk in payload.chunks(64 * 1024) {
            compressed.extend(zlib_block(chunk));
        }

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("zlib", size), &compressed, |b, input| {
            b.iter(|| decompressor.decompress(black_box(input), size).unwrap());
        });
    }
    group.finish();
}

fn hit_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry.register(
        ClassSchema::new("Hit", 1)
            .with_element(StreamerElement::basic("fX", BasicType::Float))
            .with_element(StreamerElement::basic("fY", BasicType::Float))
            .with_element(StreamerElement::basic("fE", BasicType::Double))
            .with_element(StreamerElement::basic("fId", BasicType::Int)),
    );
    registry.register(
        ClassSchema::new("Event", 1)
            .with_element(StreamerElement::basic("fRun", BasicType::Int))
            .with_element(StreamerElement::stl("fHits", "vector<Hit>", StlKind::Vector, 61)),
    );
    registry
}

fn event_payload(hits: usize) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.begin_envelope(1);
    w.put_i32(1);
    w.begin_envelope(6);
    w.put_u32(hits as u32);
    for i in 0..hits {
        w.begin_envelope(1);
        w.put_f32(i as f32).put_f32(-(i as f32)).put_f64(0.5).put_i32(i as i32);
        w.end_frame();
    }
    w.end_frame();
    w.end_frame();
    w.into_bytes()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let registry = hit_registry();
    let decoder = VersionedObjectDecoder::new(&registry);

    for hits in [10usize, 1_000, 100_000] {
        let payload = event_payload(hits);
        group.throughput(Throughput::Elements(hits as u64));
        group.bench_with_input(BenchmarkId::new("vector_of_objects", hits), &payload, |b, p| {
            b.iter(|| decoder.decode_top(black_box(p), "Event", 0).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decompress, bench_decode);
criterion_main!(benches);
