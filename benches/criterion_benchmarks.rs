use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::fs;
use std::path::Path;
use warcar::content_id::{Codec, identify};
use warcar::dagcbor::encode_headers;
use warcar::headers::{HeaderMap, canonicalize};
use warcar::transcode::{TranscodeOptions, car_to_warc, warc_to_car_with_options};

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

/// A crawl of `records` HTTP responses. Every `repeat_every`-th record
/// repeats an earlier payload (0 disables repeats).
fn gen_crawl(records: usize, payload_size: usize, repeat_every: usize) -> Vec<u8> {
    let mut warc = Vec::new();
    for i in 0..records {
        let seed = if repeat_every > 0 && i % repeat_every == 0 { 0 } else { i as u64 + 1 };
        let payload = gen_data(payload_size, seed);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {payload_size}\r\n\r\n"
        );
        let block_len = head.len() + payload.len();
        warc.extend_from_slice(
            format!(
                "WARC/1.1\r\nWARC-Type: response\r\nWARC-Record-ID: <urn:uuid:{i:032x}>\r\n\
                 WARC-Target-URI: http://example.com/{i}\r\n\
                 Content-Type: application/http; msgtype=response\r\n\
                 Content-Length: {block_len}\r\n\r\n{head}"
            )
            .as_bytes(),
        );
        warc.extend_from_slice(&payload);
        warc.extend_from_slice(b"\r\n\r\n");
    }
    warc
}

fn to_car(warc: &[u8], dedup: bool) -> Vec<u8> {
    let mut car = Vec::new();
    warc_to_car_with_options(warc, &mut car, &TranscodeOptions { dedup }).unwrap();
    car
}

fn write_dedup_snapshot() {
    let mut csv = String::from("repeat_every,warc_bytes,car_bytes,car_no_dedup_bytes\n");
    for repeat_every in [0usize, 2, 4, 8] {
        let warc = gen_crawl(256, 16 * 1024, repeat_every);
        let car = to_car(&warc, true);
        let plain = to_car(&warc, false);
        csv.push_str(&format!(
            "{repeat_every},{},{},{}\n",
            warc.len(),
            car.len(),
            plain.len()
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("dedup_snapshot.csv"), csv);
}

fn bench_forward_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("warc_to_car_mb_s");
    for payload_size in [1024usize, 64 * 1024, 1024 * 1024] {
        let warc = gen_crawl(32, payload_size, 0);
        g.throughput(Throughput::Bytes(warc.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(payload_size), &payload_size, |b, _| {
            b.iter(|| black_box(to_car(black_box(&warc), true)));
        });
    }
    g.finish();
}

fn bench_reverse_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("car_to_warc_mb_s");
    for payload_size in [1024usize, 64 * 1024, 1024 * 1024] {
        let car = to_car(&gen_crawl(32, payload_size, 0), true);
        g.throughput(Throughput::Bytes(car.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(payload_size), &payload_size, |b, _| {
            b.iter(|| {
                let mut out = Vec::new();
                car_to_warc(black_box(&car[..]), &mut out).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_dedup_ratio(c: &mut Criterion) {
    write_dedup_snapshot();
    let mut g = c.benchmark_group("forward_vs_repeat_rate");
    for repeat_every in [0usize, 2, 4, 8] {
        let warc = gen_crawl(128, 16 * 1024, repeat_every);
        g.bench_with_input(BenchmarkId::from_parameter(repeat_every), &repeat_every, |b, _| {
            b.iter(|| black_box(to_car(&warc, true).len()));
        });
    }
    g.finish();
}

fn bench_header_encoding(c: &mut Criterion) {
    let mut g = c.benchmark_group("header_object_encoding");
    for fields in [4usize, 16, 64] {
        let headers: HeaderMap = (0..fields)
            .map(|i| (format!("X-Field-{i}"), format!("value number {i}")))
            .collect();
        g.bench_with_input(BenchmarkId::from_parameter(fields), &fields, |b, _| {
            b.iter(|| {
                let bytes = encode_headers(&canonicalize(black_box(&headers))).unwrap();
                black_box(identify(Codec::DagCbor, &bytes));
            });
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_forward_speed,
    bench_reverse_speed,
    bench_dedup_ratio,
    bench_header_encoding
);
criterion_main!(benches);
