use crate::communication::channels::{CommandRx, CoordinationRx, CoordinationTx, UpdateTx};
use crate::communication::framing::WireError;
use crate::communication::messages::{
    CoordinationKind, CoordinationSignal, LightUpdate, ParkingUpdate, ScenarioCommand,
    UpdateMessage,
};
use crate::config::SimulationConfig;
use crate::control_system::spawner::VehicleSpawner;
use crate::control_system::traffic_light::TrafficLight;
use crate::simulation_engine::intersections::{IntersectionId, IntersectionLayout, LightState};
use crate::simulation_engine::parking::ParkingFacility;
use crate::simulation_engine::vehicles::{VehicleCategory, VehicleContext, VehicleTiming};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Duration};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0}: update stream closed, controller stopping")]
    UpdateStreamClosed(IntersectionId),
}

/// Channel endpoints a controller is wired with.
pub struct ControllerChannels {
    pub updates: UpdateTx,
    pub commands: Option<CommandRx>,
    pub coordination_in: Option<CoordinationRx>,
    pub coordination_out: Option<CoordinationTx>,
}

impl ControllerChannels {
    pub fn new(updates: UpdateTx) -> Self {
        Self {
            updates,
            commands: None,
            coordination_in: None,
            coordination_out: None,
        }
    }
}

/// How a paced dwell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DwellOutcome {
    Completed,
    Preempted,
}

/// One intersection: its light cycle, its parking facility and the vehicles
/// it spawns.
pub struct IntersectionController {
    id: IntersectionId,
    config: SimulationConfig,
    light: TrafficLight,
    facility: Arc<ParkingFacility>,
    spawner: VehicleSpawner,
    updates: UpdateTx,
    commands: Option<CommandRx>,
    coordination_in: Option<CoordinationRx>,
    coordination_out: Option<CoordinationTx>,
    rng: StdRng,
}

impl IntersectionController {
    pub fn new(layout: IntersectionLayout, config: SimulationConfig, channels: ControllerChannels) -> Self {
        let id = layout.id;
        let light = TrafficLight::new();
        let facility = Arc::new(ParkingFacility::new(
            config.parking_capacity,
            config.parking_queue_size,
        ));
        let ctx = VehicleContext {
            intersection: id,
            light: light.clone(),
            facility: Some(Arc::clone(&facility)),
            parking: layout.parking.clone(),
            updates: channels.updates.clone(),
            timing: VehicleTiming::from(&config),
        };
        let spawner = VehicleSpawner::new(Arc::new(layout), ctx);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ u64::from(id.0)),
            None => StdRng::from_os_rng(),
        };

        Self {
            id,
            config,
            light,
            facility,
            spawner,
            updates: channels.updates,
            commands: channels.commands,
            coordination_in: channels.coordination_in,
            coordination_out: channels.coordination_out,
            rng,
        }
    }

    pub fn id(&self) -> IntersectionId {
        self.id
    }

    pub fn light(&self) -> TrafficLight {
        self.light.clone()
    }

    pub fn facility(&self) -> Arc<ParkingFacility> {
        Arc::clone(&self.facility)
    }

    pub fn spawner(&self) -> VehicleSpawner {
        self.spawner.clone()
    }

    /// Runs the light cycle forever. Returns only when the update stream
    /// toward the collector is gone.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("{}: controller started", self.id);
        if self.config.spawn_initial_traffic {
            let spawner = self.spawner.clone();
            let rng = StdRng::seed_from_u64(self.rng.random());
            tokio::spawn(async move {
                spawner.initial_traffic(rng).await;
            });
        }

        loop {
            self.poll_commands();
            if self.emergency_requested() {
                self.emergency_hold().await?;
                continue;
            }

            self.set_light(LightState::Red)?;
            if self.dwell(self.config.red_dwell_ms).await? == DwellOutcome::Preempted {
                continue;
            }

            self.set_light(LightState::Green)?;
            if self.dwell(self.config.green_dwell_ms).await? == DwellOutcome::Preempted {
                continue;
            }

            self.publish(UpdateMessage::ParkingUpdate(ParkingUpdate {
                intersection_id: self.id,
                waiting_count: self.facility.waiting_count(),
            }))?;
        }
    }

    fn publish(&self, message: UpdateMessage) -> Result<(), ControllerError> {
        match self.updates.send(&message) {
            Ok(()) => Ok(()),
            Err(WireError::Closed) => Err(ControllerError::UpdateStreamClosed(self.id)),
            Err(e) => {
                warn!("{}: dropping update {:?}: {}", self.id, message, e);
                Ok(())
            }
        }
    }

    fn set_light(&self, state: LightState) -> Result<(), ControllerError> {
        self.light.set(state);
        self.publish(UpdateMessage::LightUpdate(LightUpdate {
            intersection_id: self.id,
            state,
        }))
    }

    /// Holds the current phase for `dwell_ms`, polling inputs every
    /// sub-interval. An emergency signal cuts the phase short.
    async fn dwell(&mut self, dwell_ms: u64) -> Result<DwellOutcome, ControllerError> {
        for _ in 0..self.config.sub_intervals_for(dwell_ms) {
            sleep(self.config.sub_interval()).await;
            self.poll_commands();
            if self.emergency_requested() {
                self.emergency_hold().await?;
                return Ok(DwellOutcome::Preempted);
            }
        }
        Ok(DwellOutcome::Completed)
    }

    async fn emergency_hold(&mut self) -> Result<(), ControllerError> {
        info!("{}: emergency approaching, forcing GREEN", self.id);
        self.set_light(LightState::Green)?;
        for _ in 0..self.config.sub_intervals_for(self.config.emergency_dwell_ms) {
            sleep(self.config.sub_interval()).await;
            self.poll_commands();
            // The hold always runs its full dwell; signals arriving now are consumed.
            for signal in self.drain_coordination() {
                debug!("{}: {:?} during emergency hold, ignored", self.id, signal.kind);
            }
        }
        Ok(())
    }

    /// Drains pending coordination signals and reports whether any of them
    /// asks for preemption. Clear signals outside a hold are no-ops.
    fn emergency_requested(&mut self) -> bool {
        self.drain_coordination()
            .iter()
            .any(|s| s.kind == CoordinationKind::EmergencyApproaching)
    }

    fn drain_coordination(&mut self) -> Vec<CoordinationSignal> {
        let mut signals = Vec::new();
        let Some(rx) = self.coordination_in.as_mut() else {
            return signals;
        };
        loop {
            match rx.try_recv() {
                Ok(Some(signal)) => {
                    debug!("{}: coordination signal {:?}", self.id, signal);
                    signals.push(signal);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("{}: coordination input closed", self.id);
                    self.coordination_in = None;
                    break;
                }
            }
        }
        signals
    }

    fn poll_commands(&mut self) {
        loop {
            let Some(rx) = self.commands.as_mut() else {
                return;
            };
            match rx.try_recv() {
                Ok(Some(message)) => self.handle_command(message.command),
                Ok(None) => return,
                Err(_) => {
                    warn!("{}: command input closed", self.id);
                    self.commands = None;
                    return;
                }
            }
        }
    }

    fn handle_command(&mut self, command: ScenarioCommand) {
        match command {
            ScenarioCommand::GreenWave => self.green_wave(),
            ScenarioCommand::ParkingFull => {
                let count = self.config.parking_burst_size();
                info!("{}: parking saturation, spawning {} cars", self.id, count);
                let spawner = self.spawner.clone();
                let entry = spawner.layout().primary_entry();
                let spacing = Duration::from_millis(self.config.parking_burst_spacing_ms);
                tokio::spawn(async move {
                    spawner.burst(entry, VehicleCategory::Car, count, spacing).await;
                });
            }
            ScenarioCommand::Gridlock => {
                info!("{}: gridlock, spawning from all directions", self.id);
                let spawner = self.spawner.clone();
                let spacing = Duration::from_millis(self.config.gridlock_spacing_ms);
                let rng = StdRng::seed_from_u64(self.rng.random());
                tokio::spawn(async move {
                    spawner.gridlock(spacing, rng).await;
                });
            }
            ScenarioCommand::None => {}
        }
    }

    fn green_wave(&mut self) {
        info!("{}: green wave, spawning ambulance", self.id);
        let entry = self.spawner.layout().local_entry();
        let ambulance = self.spawner.spawn(entry, VehicleCategory::Ambulance);

        let Some(out) = self.coordination_out.clone() else {
            return;
        };
        let approaching = CoordinationSignal {
            kind: CoordinationKind::EmergencyApproaching,
            source_id: self.id,
        };
        if out.send(&approaching).is_err() {
            warn!("{}: coordination output closed", self.id);
            self.coordination_out = None;
            return;
        }

        let source_id = self.id;
        tokio::spawn(async move {
            if ambulance.await.is_ok() {
                let clear = CoordinationSignal {
                    kind: CoordinationKind::ClearIntersection,
                    source_id,
                };
                let _ = out.send(&clear);
            }
        });
    }
}
