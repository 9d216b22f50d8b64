//! Performance benchmarks for the decision frame codec.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use facegate_protocol::{Frame, FrameCodec, StreamParser, decode, encode};
use std::hint::black_box;
use tokio_util::codec::{Decoder, Encoder};

/// Benchmark encoding frames of increasing payload size.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [0usize, 16, 64, 255] {
        let payload = vec![b'a'; size];
        group.throughput(Throughput::Bytes(size as u64 + 5));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(encode(0x01, black_box(payload)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark decoding a single complete frame.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [0usize, 16, 64, 255] {
        let wire = encode(0x01, &vec![b'a'; size]).unwrap();
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &wire, |b, wire| {
            b.iter(|| black_box(decode(black_box(wire)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark the stream parser on a burst of frames with noise in between.
fn bench_stream_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_parser");

    let mut wire = Vec::new();
    for i in 0..100u8 {
        wire.extend_from_slice(&[0x00, 0x42]);
        wire.extend_from_slice(&encode(i % 2, format!("user{i}").as_bytes()).unwrap());
    }
    group.throughput(Throughput::Elements(100));

    group.bench_function("burst_100", |b| {
        b.iter(|| {
            let mut parser = StreamParser::new();
            parser.feed(black_box(&wire));
            let count = parser.drain().filter(Result::is_ok).count();
            black_box(count);
        });
    });

    group.finish();
}

/// Benchmark a full encode/decode cycle through the tokio codec.
fn bench_codec_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_roundtrip");
    group.throughput(Throughput::Elements(1));

    let frame = Frame::new(0x01u8, "nguyen van a").unwrap();

    group.bench_function("accept_frame", |b| {
        b.iter(|| {
            let mut codec = FrameCodec::new();
            let mut buffer = BytesMut::new();
            codec.encode(black_box(frame.clone()), &mut buffer).unwrap();
            black_box(codec.decode(&mut buffer).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_stream_parser,
    bench_codec_roundtrip
);
criterion_main!(benches);
