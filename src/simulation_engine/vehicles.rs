use crate::communication::channels::UpdateTx;
use crate::communication::messages::{ParkingUpdate, UpdateMessage, VehicleUpdate};
use crate::config::SimulationConfig;
use crate::control_system::traffic_light::TrafficLight;
use crate::simulation_engine::intersections::{
    EntryPoint, IntersectionId, LightState, LotSide, ParkingLayout, RouteKind,
};
use crate::simulation_engine::movement::{move_towards, Position};
use crate::simulation_engine::parking::{ParkingFacility, ParkingSpot, QueueSlot};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Different types of vehicles in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleCategory {
    Ambulance,
    FireTruck,
    Bus,
    Car,
    Bike,
    Tractor,
}

/// Right-of-way ranking. Ordered: `Light < Heavy < Emergency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Light,
    Heavy,
    Emergency,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 6] = [
        VehicleCategory::Ambulance,
        VehicleCategory::FireTruck,
        VehicleCategory::Bus,
        VehicleCategory::Car,
        VehicleCategory::Bike,
        VehicleCategory::Tractor,
    ];

    pub fn priority(self) -> Priority {
        match self {
            VehicleCategory::Ambulance | VehicleCategory::FireTruck => Priority::Emergency,
            VehicleCategory::Bus | VehicleCategory::Tractor => Priority::Heavy,
            VehicleCategory::Car | VehicleCategory::Bike => Priority::Light,
        }
    }

    /// Emergency vehicles ignore the light entirely.
    pub fn has_right_of_way(self) -> bool {
        self.priority() == Priority::Emergency
    }

    pub fn can_park(self) -> bool {
        matches!(self, VehicleCategory::Car | VehicleCategory::Bike)
    }

    /// Distance covered per movement tick.
    pub fn speed(self) -> f32 {
        match self {
            VehicleCategory::Ambulance | VehicleCategory::FireTruck => 4.0,
            VehicleCategory::Tractor => 1.0,
            _ => 2.0,
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            VehicleCategory::Ambulance => "Ambulance",
            VehicleCategory::FireTruck => "Fire truck",
            VehicleCategory::Bus => "Bus",
            VehicleCategory::Car => "Car",
            VehicleCategory::Bike => "Bike",
            VehicleCategory::Tractor => "Tractor",
        };
        f.write_str(name)
    }
}

/// Set of categories a random spawn draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryPool {
    Any,
    NonEmergency,
    Parking,
}

impl CategoryPool {
    fn members(self) -> &'static [VehicleCategory] {
        match self {
            CategoryPool::Any => &VehicleCategory::ALL,
            CategoryPool::NonEmergency => &VehicleCategory::ALL[2..],
            CategoryPool::Parking => &VehicleCategory::ALL[3..5],
        }
    }

    pub fn pick<R: Rng + ?Sized>(self, rng: &mut R) -> VehicleCategory {
        let members = self.members();
        members[rng.random_range(0..members.len())]
    }
}

/// Route state machine of a vehicle task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehiclePhase {
    Approach,
    GateWait,
    ParkAttempt,
    QueueWait,
    Parked,
    DepartPark,
    Exit,
    Done,
}

/// State owned by one vehicle task. Only snapshots leave the task.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub id: u32,
    pub category: VehicleCategory,
    pub position: Position,
    pub active: bool,
    pub parked: bool,
    pub queued: bool,
    pub queue_index: Option<usize>,
    pub lot_side: LotSide,
    pub phase: VehiclePhase,
    /// Set once the facility turned the vehicle away at the queue.
    pub rejected: bool,
}

impl VehicleRecord {
    pub fn new(id: u32, category: VehicleCategory, position: Position, lot_side: LotSide) -> Self {
        Self {
            id,
            category,
            position,
            active: true,
            parked: false,
            queued: false,
            queue_index: None,
            lot_side,
            phase: VehiclePhase::Approach,
            rejected: false,
        }
    }

    pub fn snapshot(&self) -> VehicleUpdate {
        VehicleUpdate {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            category: self.category,
            active: self.active,
            parked: self.parked,
            queued: self.queued,
            queue_index: self.queue_index,
            lot_side: self.lot_side,
        }
    }
}

/// Fixed delays a vehicle task sleeps for.
#[derive(Debug, Clone, Copy)]
pub struct VehicleTiming {
    pub tick: Duration,
    pub gate_poll: Duration,
    pub parking_dwell: Duration,
    pub commuter_pause: Duration,
}

impl From<&SimulationConfig> for VehicleTiming {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            tick: config.movement_tick(),
            gate_poll: config.gate_poll(),
            parking_dwell: config.parking_dwell(),
            commuter_pause: config.commuter_pause(),
        }
    }
}

/// Everything a vehicle borrows from its controller.
#[derive(Clone)]
pub struct VehicleContext {
    pub intersection: IntersectionId,
    pub light: TrafficLight,
    pub facility: Option<Arc<ParkingFacility>>,
    pub parking: ParkingLayout,
    pub updates: UpdateTx,
    pub timing: VehicleTiming,
}

/// Waypoints of one trip.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub kind: RouteKind,
    pub stop_line: Position,
    pub terminal: Position,
}

impl Route {
    pub fn from_entry(entry: &EntryPoint) -> Self {
        Self {
            kind: entry.route,
            stop_line: Position::new(entry.stop_line_x, entry.start.y),
            terminal: entry.terminal,
        }
    }
}

/// One vehicle driving its route to completion.
pub struct VehicleTask {
    record: VehicleRecord,
    route: Route,
    ctx: VehicleContext,
    queue_slot: Option<QueueSlot>,
    spot: Option<ParkingSpot>,
    stream_closed: bool,
}

impl VehicleTask {
    pub fn new(record: VehicleRecord, route: Route, ctx: VehicleContext) -> Self {
        Self {
            record,
            route,
            ctx,
            queue_slot: None,
            spot: None,
            stream_closed: false,
        }
    }

    /// Drives the whole route and returns the final (inactive) record.
    pub async fn run(mut self) -> VehicleRecord {
        while self.record.phase != VehiclePhase::Done {
            let next = match self.record.phase {
                VehiclePhase::Approach => self.approach().await,
                VehiclePhase::GateWait => self.wait_at_gate().await,
                VehiclePhase::ParkAttempt => self.attempt_parking().await,
                VehiclePhase::QueueWait => self.wait_in_queue().await,
                VehiclePhase::Parked => self.park().await,
                VehiclePhase::DepartPark => self.depart_lot().await,
                VehiclePhase::Exit => self.exit().await,
                VehiclePhase::Done => VehiclePhase::Done,
            };
            debug!(
                "{} vehicle {} ({}): {:?} -> {:?}",
                self.ctx.intersection, self.record.id, self.record.category, self.record.phase, next
            );
            self.record.phase = next;
        }
        self.record
    }

    async fn approach(&mut self) -> VehiclePhase {
        if let RouteKind::Commuter { via_stop_x } = self.route.kind {
            // The far light belongs to the other controller; just pause there.
            let via = Position::new(via_stop_x, self.record.position.y);
            self.drive_to(via).await;
            sleep(self.ctx.timing.commuter_pause).await;
        }
        self.drive_to(self.route.stop_line).await;
        VehiclePhase::GateWait
    }

    async fn wait_at_gate(&mut self) -> VehiclePhase {
        while !self.record.category.has_right_of_way() && self.ctx.light.get() != LightState::Green {
            sleep(self.ctx.timing.gate_poll).await;
        }
        if self.ctx.facility.is_some() && self.record.category.can_park() {
            VehiclePhase::ParkAttempt
        } else {
            VehiclePhase::Exit
        }
    }

    async fn attempt_parking(&mut self) -> VehiclePhase {
        self.drive_to(self.ctx.parking.queue_entry).await;
        let Some(facility) = self.ctx.facility.clone() else {
            return VehiclePhase::Exit;
        };
        match facility.enter_queue() {
            Some(slot) => {
                self.record.queued = true;
                self.record.queue_index = Some(slot.index());
                self.queue_slot = Some(slot);
                VehiclePhase::QueueWait
            }
            None => {
                debug!(
                    "{} vehicle {}: parking queue full, driving on",
                    self.ctx.intersection, self.record.id
                );
                self.record.rejected = true;
                VehiclePhase::Exit
            }
        }
    }

    async fn wait_in_queue(&mut self) -> VehiclePhase {
        let (Some(facility), Some(slot)) = (self.ctx.facility.clone(), self.queue_slot.take())
        else {
            return VehiclePhase::Exit;
        };
        let target = self.ctx.parking.queue_slot(slot.index());
        let acquire = facility.wait_for_spot(slot);
        tokio::pin!(acquire);
        // A spot freeing up while still pulling into the slot ends the wait early.
        let spot = tokio::select! {
            biased;
            spot = &mut acquire => spot,
            _ = self.drive_to(target) => acquire.await,
        };
        self.record.queued = false;
        self.record.queue_index = None;
        self.spot = Some(spot);
        VehiclePhase::Parked
    }

    async fn park(&mut self) -> VehiclePhase {
        let (Some(facility), Some(spot)) = (self.ctx.facility.clone(), self.spot.take()) else {
            return VehiclePhase::Exit;
        };
        let target = self.ctx.parking.spot(spot.index());
        while !move_towards(&mut self.record.position, target, self.record.category.speed()) {
            self.publish();
            sleep(self.ctx.timing.tick).await;
        }
        self.record.parked = true;
        self.publish();

        sleep(self.ctx.timing.parking_dwell).await;
        facility.leave(spot);
        self.record.parked = false;
        VehiclePhase::DepartPark
    }

    async fn depart_lot(&mut self) -> VehiclePhase {
        self.drive_to(self.ctx.parking.road_return).await;
        VehiclePhase::Exit
    }

    async fn exit(&mut self) -> VehiclePhase {
        self.drive_to(self.route.terminal).await;
        self.record.active = false;
        self.publish();
        VehiclePhase::Done
    }

    /// Steps toward `target` once per tick, publishing after every step.
    async fn drive_to(&mut self, target: Position) {
        loop {
            let arrived = move_towards(&mut self.record.position, target, self.record.category.speed());
            self.publish();
            if arrived {
                return;
            }
            sleep(self.ctx.timing.tick).await;
        }
    }

    fn publish(&mut self) {
        if self.stream_closed {
            return;
        }
        let mut delivered = self
            .ctx
            .updates
            .send(&UpdateMessage::VehicleUpdate(self.record.snapshot()))
            .is_ok();
        if let Some(facility) = &self.ctx.facility {
            delivered &= self
                .ctx
                .updates
                .send(&UpdateMessage::ParkingUpdate(ParkingUpdate {
                    intersection_id: self.ctx.intersection,
                    waiting_count: facility.waiting_count(),
                }))
                .is_ok();
        }
        if !delivered {
            debug!(
                "{} vehicle {}: update stream closed, no longer publishing",
                self.ctx.intersection, self.record.id
            );
            self.stream_closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn priority_ordering() {
        assert!(VehicleCategory::Ambulance.priority() > VehicleCategory::Bus.priority());
        assert!(VehicleCategory::Tractor.priority() > VehicleCategory::Car.priority());
        assert_eq!(VehicleCategory::FireTruck.priority(), Priority::Emergency);
        assert!(VehicleCategory::FireTruck.has_right_of_way());
        assert!(!VehicleCategory::Bus.has_right_of_way());
    }

    #[test]
    fn only_cars_and_bikes_park() {
        let parkers: Vec<_> = VehicleCategory::ALL.iter().filter(|c| c.can_park()).collect();
        assert_eq!(parkers, vec![&VehicleCategory::Car, &VehicleCategory::Bike]);
    }

    #[test]
    fn speeds_by_category() {
        assert_eq!(VehicleCategory::Ambulance.speed(), 4.0);
        assert_eq!(VehicleCategory::Tractor.speed(), 1.0);
        assert_eq!(VehicleCategory::Bike.speed(), 2.0);
    }

    #[test]
    fn pools_never_leave_their_members() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            assert!(CategoryPool::Parking.pick(&mut rng).can_park());
            assert!(!CategoryPool::NonEmergency.pick(&mut rng).has_right_of_way());
        }
    }
}
