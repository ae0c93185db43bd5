use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration, Throughput,
};
use intersection_control::communication::framing::{encode_frame, FrameDecoder};
use intersection_control::communication::messages::{UpdateMessage, VehicleUpdate};
use intersection_control::simulation_engine::intersections::LotSide;
use intersection_control::simulation_engine::vehicles::VehicleCategory;

fn vehicle(id: u32) -> UpdateMessage {
    UpdateMessage::VehicleUpdate(VehicleUpdate {
        id,
        x: 120.0 + id as f32,
        y: 400.0,
        category: VehicleCategory::Car,
        active: true,
        parked: false,
        queued: id % 3 == 0,
        queue_index: Some(id as usize % 5),
        lot_side: LotSide::Right,
    })
}

fn bench_encode(c: &mut Criterion) {
    let update = vehicle(7);
    c.bench_function("encode_vehicle_update", |b| {
        b.iter(|| black_box(encode_frame(black_box(&update)).unwrap()));
    });
}

fn bench_decode_stream(c: &mut Criterion) {
    let batch_sizes = [10, 100, 1000];

    let mut group = c.benchmark_group("decode_update_stream");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in &batch_sizes {
        let mut stream = Vec::new();
        for id in 0..size {
            stream.extend(encode_frame(&vehicle(id)).unwrap());
        }
        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &stream, |b, stream| {
            b.iter(|| {
                let mut decoder = FrameDecoder::<UpdateMessage>::new();
                // Feed in socket-sized chunks.
                for chunk in stream.chunks(512) {
                    decoder.extend(chunk);
                }
                let mut decoded = 0;
                while let Some(message) = decoder.next_message() {
                    black_box(message);
                    decoded += 1;
                }
                assert_eq!(decoded, size);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_stream);
criterion_main!(benches);
