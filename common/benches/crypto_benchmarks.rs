use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use telemetry_common::encryption::{DhGroup, DhParams, KeyAgreement, TelemetryCipher};
use telemetry_common::{SensorReadings, SensorSnapshot, TelemetryPayload};
use std::time::Duration;

fn bench_key_agreement(c: &mut Criterion) {
    let mut group = c.benchmark_group("Key Agreement");
    group.sample_size(10)
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(3));

    for dh_group in [DhGroup::Demo, DhGroup::Modp2048] {
        let params = DhParams::from_group(dh_group).unwrap();
        let peer = KeyAgreement::generate(params.clone());
        group.bench_with_input(
            BenchmarkId::new("generate_and_agree", format!("{:?}", dh_group)),
            &params,
            |b, params| {
                b.iter(|| {
                    let node = KeyAgreement::generate(params.clone());
                    node.accept_peer_value(peer.public_value()).ok()
                })
            },
        );
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Telemetry Encryption");
    let cipher = TelemetryCipher::new(*b"1234567890abcdef");
    let snapshot = SensorSnapshot {
        readings: SensorReadings {
            pressure_pa: 100800.0,
            ambient_temperature_c: 24.5,
            ..Default::default()
        },
        timestamp: "Monday, January 01 2024 00:00:00".to_string(),
    };

    let plaintext = TelemetryPayload::from_snapshot(&snapshot).to_json_bytes().unwrap();
    group.throughput(Throughput::Bytes(plaintext.len() as u64));

    group.bench_function("serialize_and_encrypt", |b| {
        b.iter(|| {
            let payload = TelemetryPayload::from_snapshot(&snapshot).to_json_bytes().unwrap();
            cipher.encrypt(&payload)
        })
    });

    let encrypted = cipher.encrypt(&plaintext);
    group.bench_function("decrypt", |b| b.iter(|| cipher.decrypt(&encrypted).unwrap()));

    group.finish();
}

criterion_group!(benches, bench_key_agreement, bench_pipeline);
criterion_main!(benches);
