use crate::global_variables::{CMD_MAGIC, COORD_MAGIC, MSG_MAGIC};
use crate::simulation_engine::intersections::{IntersectionId, LightState, LotSide};
use crate::simulation_engine::vehicles::VehicleCategory;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A message type that travels in magic-tagged frames.
pub trait WireMessage: Serialize + DeserializeOwned {
    const MAGIC: u32;
}

/// Latest-wins snapshot of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleUpdate {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub category: VehicleCategory,
    pub active: bool,
    pub parked: bool,
    pub queued: bool,
    pub queue_index: Option<usize>,
    pub lot_side: LotSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightUpdate {
    pub intersection_id: IntersectionId,
    pub state: LightState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingUpdate {
    pub intersection_id: IntersectionId,
    pub waiting_count: usize,
}

/// Everything a controller publishes toward the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdateMessage {
    VehicleUpdate(VehicleUpdate),
    LightUpdate(LightUpdate),
    ParkingUpdate(ParkingUpdate),
}

impl WireMessage for UpdateMessage {
    const MAGIC: u32 = MSG_MAGIC;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioCommand {
    #[default]
    None,
    GreenWave,
    ParkingFull,
    Gridlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub command: ScenarioCommand,
}

impl CommandMessage {
    pub fn new(command: ScenarioCommand) -> Self {
        Self { command }
    }
}

impl WireMessage for CommandMessage {
    const MAGIC: u32 = CMD_MAGIC;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinationKind {
    EmergencyApproaching,
    ClearIntersection,
}

/// Preemption message from one controller to its paired controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationSignal {
    pub kind: CoordinationKind,
    pub source_id: IntersectionId,
}

impl WireMessage for CoordinationSignal {
    const MAGIC: u32 = COORD_MAGIC;
}
