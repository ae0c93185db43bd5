use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use intersection_control::simulation_engine::parking::ParkingFacility;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn bench_uncontended_cycle(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let facility = ParkingFacility::new(10, 5);

    c.bench_function("enter_wait_leave", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let slot = facility.enter_queue().unwrap();
                let spot = facility.wait_for_spot(slot).await;
                black_box(spot.index());
                facility.leave(spot);
            })
        });
    });
}

fn bench_contended_cycles(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let vehicle_counts = [10, 50, 100];

    let mut group = c.benchmark_group("facility_contention");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &count in &vehicle_counts {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                runtime.block_on(async {
                    let facility = Arc::new(ParkingFacility::new(10, 5));
                    let mut handles = Vec::with_capacity(count);
                    for _ in 0..count {
                        let facility = Arc::clone(&facility);
                        handles.push(tokio::spawn(async move {
                            let slot = loop {
                                match facility.enter_queue() {
                                    Some(slot) => break slot,
                                    None => tokio::task::yield_now().await,
                                }
                            };
                            let spot = facility.wait_for_spot(slot).await;
                            tokio::task::yield_now().await;
                            facility.leave(spot);
                        }));
                    }
                    for handle in handles {
                        handle.await.unwrap();
                    }
                    black_box(facility.snapshot());
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended_cycle, bench_contended_cycles);
criterion_main!(benches);
