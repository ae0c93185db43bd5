use crate::communication::channels::{CommandTx, UpdateRx};
use crate::communication::framing::WireError;
use crate::communication::messages::{CommandMessage, ScenarioCommand, UpdateMessage, VehicleUpdate};
use crate::simulation_engine::intersections::{IntersectionId, LightState};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// One CSV row per received update.
#[derive(Debug, Serialize)]
pub struct UpdateRecord {
    pub elapsed_ms: u128,
    pub stream: String,
    pub kind: &'static str,
    pub vehicle_id: Option<u32>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub active: Option<bool>,
    pub parked: Option<bool>,
    pub queued: Option<bool>,
    pub queue_index: Option<usize>,
    pub light: Option<String>,
    pub waiting_count: Option<usize>,
}

impl UpdateRecord {
    fn from_update(elapsed_ms: u128, stream: IntersectionId, update: &UpdateMessage) -> Self {
        let mut record = UpdateRecord {
            elapsed_ms,
            stream: stream.to_string(),
            kind: "",
            vehicle_id: None,
            x: None,
            y: None,
            active: None,
            parked: None,
            queued: None,
            queue_index: None,
            light: None,
            waiting_count: None,
        };
        match update {
            UpdateMessage::VehicleUpdate(v) => {
                record.kind = "vehicle";
                record.vehicle_id = Some(v.id);
                record.x = Some(v.x);
                record.y = Some(v.y);
                record.active = Some(v.active);
                record.parked = Some(v.parked);
                record.queued = Some(v.queued);
                record.queue_index = v.queue_index;
            }
            UpdateMessage::LightUpdate(l) => {
                record.kind = "light";
                record.light = Some(format!("{:?}", l.state));
            }
            UpdateMessage::ParkingUpdate(p) => {
                record.kind = "parking";
                record.waiting_count = Some(p.waiting_count);
            }
        }
        record
    }
}

/// Appends update rows to a CSV file, writing the header only for a new file.
pub struct CsvRecorder {
    writer: csv::Writer<File>,
}

impl CsvRecorder {
    pub fn open(filename: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let file_exists = filename.as_ref().exists();
        let file = OpenOptions::new().append(true).create(true).open(filename)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);
        Ok(Self { writer })
    }

    pub fn record(&mut self, record: &UpdateRecord) -> Result<(), csv::Error> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorSummary {
    pub active: usize,
    pub parked: usize,
    pub queued: usize,
    pub finished: usize,
}

impl fmt::Display for CollectorSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "active: {}, parked: {}, queued: {}, finished: {}",
            self.active, self.parked, self.queued, self.finished
        )
    }
}

/// Headless consumer of the update streams.
///
/// Vehicle updates are latest-wins per (stream, vehicle id). A vehicle seen
/// inactive is dropped and only its key is kept, so later updates for it
/// are ignored.
pub struct Collector {
    vehicles: HashMap<(IntersectionId, u32), VehicleUpdate>,
    finished: HashSet<(IntersectionId, u32)>,
    lights: BTreeMap<IntersectionId, LightState>,
    waiting: BTreeMap<IntersectionId, usize>,
    recorder: Option<CsvRecorder>,
    started: Instant,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        Self {
            vehicles: HashMap::new(),
            finished: HashSet::new(),
            lights: BTreeMap::new(),
            waiting: BTreeMap::new(),
            recorder: None,
            started: Instant::now(),
        }
    }

    pub fn with_recorder(mut self, recorder: CsvRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn apply(&mut self, stream: IntersectionId, update: UpdateMessage) {
        if let Some(recorder) = self.recorder.as_mut() {
            let row = UpdateRecord::from_update(self.started.elapsed().as_millis(), stream, &update);
            if let Err(e) = recorder.record(&row) {
                warn!("disabling CSV recording: {}", e);
                self.recorder = None;
            }
        }

        match update {
            UpdateMessage::VehicleUpdate(vehicle) => {
                let key = (stream, vehicle.id);
                if self.finished.contains(&key) {
                    debug!("{}: ignoring update for finished vehicle {}", stream, vehicle.id);
                    return;
                }
                if vehicle.active {
                    self.vehicles.insert(key, vehicle);
                } else {
                    self.vehicles.remove(&key);
                    self.finished.insert(key);
                }
            }
            UpdateMessage::LightUpdate(light) => {
                self.lights.insert(light.intersection_id, light.state);
            }
            UpdateMessage::ParkingUpdate(parking) => {
                self.waiting.insert(parking.intersection_id, parking.waiting_count);
            }
        }
    }

    /// Applies everything currently readable from `rx` without blocking.
    pub fn drain(&mut self, stream: IntersectionId, rx: &mut UpdateRx) -> Result<usize, WireError> {
        let mut applied = 0;
        while let Some(update) = rx.try_recv()? {
            self.apply(stream, update);
            applied += 1;
        }
        Ok(applied)
    }

    pub fn vehicle(&self, stream: IntersectionId, id: u32) -> Option<&VehicleUpdate> {
        self.vehicles.get(&(stream, id))
    }

    pub fn light(&self, intersection: IntersectionId) -> Option<LightState> {
        self.lights.get(&intersection).copied()
    }

    pub fn waiting_count(&self, intersection: IntersectionId) -> Option<usize> {
        self.waiting.get(&intersection).copied()
    }

    pub fn summary(&self) -> CollectorSummary {
        let mut summary = CollectorSummary {
            finished: self.finished.len(),
            ..CollectorSummary::default()
        };
        for vehicle in self.vehicles.values() {
            summary.active += 1;
            if vehicle.parked {
                summary.parked += 1;
            }
            if vehicle.queued {
                summary.queued += 1;
            }
        }
        summary
    }

    pub fn print_snapshot(&self) {
        for (id, state) in &self.lights {
            println!(
                "{}: light {:?}, waiting for parking: {}",
                id,
                state,
                self.waiting.get(id).copied().unwrap_or(0)
            );
        }
        println!("Vehicles: {}", self.summary());
    }
}

/// Sends scenario commands to the two controllers.
pub struct Director {
    pub f10: CommandTx,
    pub f11: CommandTx,
}

impl Director {
    /// Routes a scenario the way the front end's buttons do: the green wave
    /// starts at F10 only, parking saturation and gridlock hit both.
    pub fn dispatch(&self, command: ScenarioCommand) -> Result<(), WireError> {
        let message = CommandMessage::new(command);
        match command {
            ScenarioCommand::GreenWave => self.f10.send(&message),
            ScenarioCommand::ParkingFull | ScenarioCommand::Gridlock => {
                self.f10.send(&message)?;
                self.f11.send(&message)
            }
            ScenarioCommand::None => Ok(()),
        }
    }
}

/// Provides a simple CLI for triggering scenarios.
pub fn run_cli(director: &Director, collector: &Arc<Mutex<Collector>>) {
    use std::io::{stdin, stdout, Write};
    loop {
        println!("\nIntersection Control Director");
        println!("1. Green Wave (ambulance at F10, preempts F11)");
        println!("2. Parking Full (saturate both lots)");
        println!("3. Gridlock (F10 and F11)");
        println!("4. Show Snapshot");
        println!("5. Exit");
        print!("Enter your choice: ");
        let _ = stdout().flush();
        let mut input = String::new();
        match stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let command = match input.trim().parse::<u32>().unwrap_or(0) {
            1 => ScenarioCommand::GreenWave,
            2 => ScenarioCommand::ParkingFull,
            3 => ScenarioCommand::Gridlock,
            4 => {
                collector
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .print_snapshot();
                continue;
            }
            5 => {
                println!("Exiting CLI.");
                break;
            }
            _ => {
                println!("Invalid choice. Try again.");
                continue;
            }
        };
        if let Err(e) = director.dispatch(command) {
            eprintln!("Error sending {:?}: {}", command, e);
        }
    }
}
