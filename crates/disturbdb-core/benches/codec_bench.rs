use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use disturbdb_core::node::Identity;
use disturbdb_core::{PeerId, WireMessage};

fn bench_peer_record(c: &mut Criterion) {
    let identity: Identity = Identity::generate().unwrap();
    let id = identity.peer_id("10.0.0.1:3000".parse().unwrap());
    let bytes = id.to_bytes();

    let mut group = c.benchmark_group("peer_record");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("encode", |b| b.iter(|| black_box(&id).to_bytes()));
    group.bench_function("decode", |b| {
        b.iter(|| PeerId::<disturbdb_crypto::Ed25519PublicKey>::decode(black_box(&bytes)))
    });
    group.bench_function("address", |b| b.iter(|| black_box(&id).address()));

    group.finish();
}

fn bench_wire_message(c: &mut Criterion) {
    let sizes: Vec<(usize, &str)> = vec![
        (0, "empty"),
        (64, "64_bytes"),
        (1024, "1024_bytes"),
        (16384, "16384_bytes"),
        (1 << 20, "1_mib"),
    ];

    let mut group = c.benchmark_group("wire_message");

    for (size, name) in sizes {
        let message = WireMessage::new(42, vec![0xAB; size]);
        let encoded = message.to_bytes();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_function(format!("encode_{name}"), |b| {
            let mut buf = Vec::with_capacity(encoded.len());
            b.iter(|| {
                buf.clear();
                black_box(&message).encode(&mut buf);
            })
        });
        group.bench_function(format!("decode_{name}"), |b| {
            b.iter(|| WireMessage::decode(black_box(&encoded)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_peer_record, bench_wire_message);
criterion_main!(benches);
