use crate::simulation_engine::intersections::{IntersectionLayout, SpawnGroup};
use crate::simulation_engine::vehicles::{
    Route, VehicleCategory, VehicleContext, VehicleRecord, VehicleTask,
};
use log::info;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// Starts vehicle tasks for one intersection and hands out their ids.
///
/// Cheap to clone; clones share the id counters, so bursts running on
/// background tasks never reuse an id.
#[derive(Clone)]
pub struct VehicleSpawner {
    layout: Arc<IntersectionLayout>,
    ctx: VehicleContext,
    next_offsets: Arc<Vec<AtomicU32>>,
}

impl VehicleSpawner {
    pub fn new(layout: Arc<IntersectionLayout>, ctx: VehicleContext) -> Self {
        let next_offsets = layout.entries.iter().map(|_| AtomicU32::new(0)).collect();
        Self {
            layout,
            ctx,
            next_offsets: Arc::new(next_offsets),
        }
    }

    pub fn layout(&self) -> &IntersectionLayout {
        &self.layout
    }

    /// Spawns one vehicle at `entry` (index into the layout's entries).
    /// Out-of-range entries fall back to the primary one.
    pub fn spawn(&self, entry: usize, category: VehicleCategory) -> JoinHandle<VehicleRecord> {
        let entry = if entry < self.layout.entries.len() {
            entry
        } else {
            self.layout.primary_entry()
        };
        let point = &self.layout.entries[entry];
        let id = point.id_base + self.next_offsets[entry].fetch_add(1, Ordering::Relaxed);

        let record = VehicleRecord::new(id, category, point.start, self.layout.lot_side());
        let task = VehicleTask::new(record, Route::from_entry(point), self.ctx.clone());
        info!(
            "{}: spawned {} {} at {} entry",
            self.layout.id, category, id, point.name
        );
        tokio::spawn(task.run())
    }

    /// Spawns `count` vehicles of one category, `spacing` apart.
    pub async fn burst(
        &self,
        entry: usize,
        category: VehicleCategory,
        count: usize,
        spacing: Duration,
    ) -> Vec<JoinHandle<VehicleRecord>> {
        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            handles.push(self.spawn(entry, category));
            if i + 1 < count {
                sleep(spacing).await;
            }
        }
        handles
    }

    /// Spawns the layout's gridlock groups, interleaving entries so traffic
    /// arrives from every direction at once.
    pub async fn gridlock(&self, spacing: Duration, mut rng: StdRng) -> Vec<JoinHandle<VehicleRecord>> {
        let groups: Vec<SpawnGroup> = self.layout.gridlock.clone();
        let rounds = groups.iter().map(|g| g.count).max().unwrap_or(0);
        let mut handles = Vec::new();
        for round in 0..rounds {
            for group in groups.iter().filter(|g| g.count > round) {
                handles.push(self.spawn(group.entry, group.pool.pick(&mut rng)));
            }
            sleep(spacing).await;
        }
        handles
    }

    /// Spawns the layout's starting population group by group, with a random
    /// pause after each vehicle.
    pub async fn initial_traffic(&self, mut rng: StdRng) -> Vec<JoinHandle<VehicleRecord>> {
        let (min_ms, max_ms) = self.layout.initial_jitter_ms;
        let groups: Vec<SpawnGroup> = self.layout.initial_traffic.clone();
        let mut handles = Vec::new();
        for group in groups {
            for _ in 0..group.count {
                handles.push(self.spawn(group.entry, group.pool.pick(&mut rng)));
                sleep(Duration::from_millis(rng.random_range(min_ms..=max_ms))).await;
            }
        }
        handles
    }
}
