//! Benchmarks the frame decoder against a synthetic in-memory ITCH stream,
//! the way a throughput-sensitive stage-1 workload would be profiled.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use itch_replay::message::{next_message, Message};
use itch_replay::stream::ByteStream;

fn sample_add_order(orn: u64) -> Message {
    itch_replay::message::Message::AddOrder(itch_replay::message::AddOrder {
        header: itch_replay::message::MessageHeader {
            stock_locate: 7,
            tracking_number: 0,
            timestamp_ns: 34_200_000_000_000,
        },
        orn,
        side: b'B',
        shares: 100,
        stock: *b"AAPL    ",
        price: 100_000,
    })
}

fn build_stream(count: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in 0..count {
        bytes.extend(sample_add_order(i as u64).encode_frame());
    }
    bytes
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_add_orders");
    let count = 50_000usize;
    let frames = build_stream(count);
    group.throughput(Throughput::Elements(count as u64));
    group.bench_function("next_message", |b| {
        b.iter(|| {
            let mut stream = ByteStream::new(&frames[..]);
            let mut decoded = 0u64;
            while let Some(msg) = next_message(&mut stream).unwrap() {
                decoded += black_box(msg.timestamp_ns());
            }
            black_box(decoded)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
