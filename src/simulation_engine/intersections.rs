use crate::global_variables::{CANVAS_WIDTH, PARKING_ROW_WIDTH, ROAD_Y};
use crate::simulation_engine::movement::Position;
use crate::simulation_engine::vehicles::CategoryPool;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an intersection controller (10 for F10, 11 for F11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntersectionId(pub u8);

impl IntersectionId {
    pub const F10: IntersectionId = IntersectionId(10);
    pub const F11: IntersectionId = IntersectionId(11);
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// The two states of an intersection's light. Every controller starts at Red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightState {
    #[default]
    Red,
    Green,
}

/// Which parking lot a vehicle uses: F10 owns the right lot, F11 the left one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotSide {
    Right,
    Left,
}

/// Shape of the route a vehicle follows from its entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteKind {
    /// Entry -> stop line -> gate -> optional parking -> terminal.
    Through,
    /// Crosses the far intersection first: drive to `via_stop_x`, pause, then
    /// continue as a through route at this intersection.
    Commuter { via_stop_x: f32 },
}

/// A place vehicles are spawned from.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    pub name: &'static str,
    pub start: Position,
    /// x coordinate of the stop line in front of this controller's light.
    pub stop_line_x: f32,
    pub terminal: Position,
    pub route: RouteKind,
    /// First vehicle id handed out at this entry.
    pub id_base: u32,
}

/// Waypoints of one parking facility.
#[derive(Debug, Clone)]
pub struct ParkingLayout {
    pub side: LotSide,
    pub queue_entry: Position,
    pub road_return: Position,
    queue_origin: Position,
    /// Signed x step between consecutive queue slots (mirrored for the left lot).
    queue_step_x: f32,
    spot_origin: Position,
    spot_step_x: f32,
    spot_step_y: f32,
}

impl ParkingLayout {
    pub fn queue_slot(&self, index: usize) -> Position {
        Position::new(
            self.queue_origin.x + index as f32 * self.queue_step_x,
            self.queue_origin.y,
        )
    }

    pub fn spot(&self, index: usize) -> Position {
        let row = index / PARKING_ROW_WIDTH;
        let col = index % PARKING_ROW_WIDTH;
        Position::new(
            self.spot_origin.x + col as f32 * self.spot_step_x,
            self.spot_origin.y + row as f32 * self.spot_step_y,
        )
    }
}

/// A batch of vehicles to spawn at one entry.
#[derive(Debug, Clone, Copy)]
pub struct SpawnGroup {
    pub entry: usize,
    pub count: usize,
    pub pool: CategoryPool,
}

/// Geometry and spawn plan of one intersection.
///
/// `entries[0]` is the primary entry where scenario bursts start.
/// `local_entry` is the entry on the controller's own side of the road; the
/// GREEN_WAVE ambulance starts there.
#[derive(Debug, Clone)]
pub struct IntersectionLayout {
    pub id: IntersectionId,
    pub entries: Vec<EntryPoint>,
    pub local_entry: usize,
    pub parking: ParkingLayout,
    pub initial_traffic: Vec<SpawnGroup>,
    pub gridlock: Vec<SpawnGroup>,
    /// Range (ms) of the random pause between initial spawns.
    pub initial_jitter_ms: (u64, u64),
}

impl IntersectionLayout {
    pub fn primary_entry(&self) -> usize {
        0
    }

    pub fn local_entry(&self) -> usize {
        self.local_entry
    }

    pub fn lot_side(&self) -> LotSide {
        self.parking.side
    }

    /// F10 sits on the left of the canvas and owns the right-hand lot.
    pub fn f10() -> Self {
        Self {
            id: IntersectionId::F10,
            entries: vec![
                EntryPoint {
                    name: "west",
                    start: Position::new(0.0, ROAD_Y),
                    stop_line_x: 240.0,
                    terminal: Position::new(CANVAS_WIDTH, ROAD_Y),
                    route: RouteKind::Through,
                    id_base: 0,
                },
                EntryPoint {
                    name: "commuter",
                    start: Position::new(CANVAS_WIDTH, ROAD_Y),
                    stop_line_x: 360.0,
                    terminal: Position::new(0.0, ROAD_Y),
                    route: RouteKind::Commuter { via_stop_x: 960.0 },
                    id_base: 50,
                },
            ],
            local_entry: 0,
            parking: ParkingLayout {
                side: LotSide::Right,
                queue_entry: Position::new(300.0, 320.0),
                road_return: Position::new(300.0, ROAD_Y),
                queue_origin: Position::new(425.0, 325.0),
                queue_step_x: 40.0,
                spot_origin: Position::new(230.0, 185.0),
                spot_step_x: 40.0,
                spot_step_y: 60.0,
            },
            initial_traffic: vec![
                SpawnGroup { entry: 0, count: 3, pool: CategoryPool::Any },
                SpawnGroup { entry: 1, count: 2, pool: CategoryPool::Parking },
            ],
            gridlock: vec![
                SpawnGroup { entry: 0, count: 5, pool: CategoryPool::NonEmergency },
                SpawnGroup { entry: 1, count: 5, pool: CategoryPool::Parking },
            ],
            initial_jitter_ms: (500, 1_500),
        }
    }

    /// F11 sits on the right of the canvas and owns the (mirrored) left-hand lot.
    pub fn f11() -> Self {
        Self {
            id: IntersectionId::F11,
            entries: vec![
                EntryPoint {
                    name: "east",
                    start: Position::new(CANVAS_WIDTH, ROAD_Y),
                    stop_line_x: 960.0,
                    terminal: Position::new(0.0, ROAD_Y),
                    route: RouteKind::Through,
                    id_base: 100,
                },
                EntryPoint {
                    name: "west",
                    start: Position::new(0.0, ROAD_Y),
                    stop_line_x: 840.0,
                    terminal: Position::new(CANVAS_WIDTH, ROAD_Y),
                    route: RouteKind::Through,
                    id_base: 150,
                },
            ],
            local_entry: 1,
            parking: ParkingLayout {
                side: LotSide::Left,
                queue_entry: Position::new(900.0, 320.0),
                road_return: Position::new(900.0, ROAD_Y),
                queue_origin: Position::new(775.0, 325.0),
                queue_step_x: -40.0,
                spot_origin: Position::new(970.0, 185.0),
                spot_step_x: -40.0,
                spot_step_y: 60.0,
            },
            initial_traffic: vec![
                SpawnGroup { entry: 0, count: 3, pool: CategoryPool::Any },
                SpawnGroup { entry: 1, count: 2, pool: CategoryPool::Any },
            ],
            gridlock: vec![
                SpawnGroup { entry: 0, count: 5, pool: CategoryPool::NonEmergency },
                SpawnGroup { entry: 1, count: 3, pool: CategoryPool::NonEmergency },
            ],
            initial_jitter_ms: (500, 2_000),
        }
    }
}

pub fn create_layouts() -> Vec<IntersectionLayout> {
    vec![IntersectionLayout::f10(), IntersectionLayout::f11()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_lot_spot_grid() {
        let lot = IntersectionLayout::f10().parking;
        assert_eq!(lot.spot(0), Position::new(230.0, 185.0));
        assert_eq!(lot.spot(4), Position::new(390.0, 185.0));
        assert_eq!(lot.spot(7), Position::new(310.0, 245.0));
        assert_eq!(lot.queue_slot(3), Position::new(545.0, 325.0));
    }

    #[test]
    fn local_entries_come_from_the_west() {
        for layout in create_layouts() {
            let local = &layout.entries[layout.local_entry()];
            assert_eq!(local.start, Position::new(0.0, ROAD_Y));
            assert_eq!(local.terminal, Position::new(CANVAS_WIDTH, ROAD_Y));
        }
        assert_eq!(IntersectionLayout::f11().entries[1].id_base, 150);
    }

    #[test]
    fn left_lot_is_mirrored() {
        let lot = IntersectionLayout::f11().parking;
        assert_eq!(lot.spot(1), Position::new(930.0, 185.0));
        assert_eq!(lot.spot(9), Position::new(810.0, 245.0));
        assert_eq!(lot.queue_slot(2), Position::new(695.0, 325.0));
    }

    #[test]
    fn id_spaces_do_not_overlap_within_a_controller() {
        for layout in create_layouts() {
            let bases: Vec<u32> = layout.entries.iter().map(|e| e.id_base).collect();
            assert!(bases.windows(2).all(|w| w[0] + 50 <= w[1]), "{bases:?}");
        }
    }
}
