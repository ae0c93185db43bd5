use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

/// Proof of holding a queue slot. Consumed by [`ParkingFacility::wait_for_spot`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct QueueSlot {
    index: usize,
}

impl QueueSlot {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Proof of holding a parking spot. Consumed by [`ParkingFacility::leave`].
///
/// Dropping it without calling `leave` keeps the spot reserved for good; the
/// facility never hands out more spots than it has.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct ParkingSpot {
    index: usize,
}

impl ParkingSpot {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Consistent point-in-time view of a facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilitySnapshot {
    pub occupied: usize,
    pub waiting: usize,
    pub spots: Vec<bool>,
    pub queue_slots: Vec<bool>,
}

#[derive(Debug)]
struct FacilityState {
    spot_occupied: Vec<bool>,
    queue_slot_occupied: Vec<bool>,
    occupied: usize,
    waiting: usize,
}

impl FacilityState {
    fn claim_first_free(slots: &mut [bool]) -> Option<usize> {
        let index = slots.iter().position(|taken| !taken)?;
        slots[index] = true;
        Some(index)
    }
}

/// Bounded spot pool behind a bounded wait queue.
///
/// A vehicle first takes a queue slot without blocking, then blocks until a
/// spot frees up. The queue slot is handed back only after the spot has been
/// taken, so `occupied + waiting` never exceeds `capacity + queue_size`.
///
/// Blocked waiters are woken in FIFO order (tokio's semaphore is fair).
#[derive(Debug)]
pub struct ParkingFacility {
    capacity: usize,
    queue_size: usize,
    spots: Semaphore,
    queue: Semaphore,
    state: Mutex<FacilityState>,
}

impl ParkingFacility {
    pub fn new(capacity: usize, queue_size: usize) -> Self {
        Self {
            capacity,
            queue_size,
            spots: Semaphore::new(capacity),
            queue: Semaphore::new(queue_size),
            state: Mutex::new(FacilityState {
                spot_occupied: vec![false; capacity],
                queue_slot_occupied: vec![false; queue_size],
                occupied: 0,
                waiting: 0,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FacilityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tries to take the lowest free queue slot. Returns `None` at once when
    /// all slots are held; the caller should skip parking.
    pub fn enter_queue(&self) -> Option<QueueSlot> {
        let permit = self.queue.try_acquire().ok()?;
        permit.forget();

        let mut state = self.lock_state();
        // A queue permit is only returned after its slot bit is cleared.
        let index = FacilityState::claim_first_free(&mut state.queue_slot_occupied)?;
        state.waiting += 1;
        Some(QueueSlot { index })
    }

    /// Blocks until a spot is free, takes the lowest free one, then gives
    /// back `slot`. There is no timeout.
    pub async fn wait_for_spot(&self, slot: QueueSlot) -> ParkingSpot {
        self.spots
            .acquire()
            .await
            .expect("spot semaphore is never closed")
            .forget();

        let spot = {
            let mut state = self.lock_state();
            state.queue_slot_occupied[slot.index] = false;
            state.waiting -= 1;
            state.occupied += 1;
            // Permits and clear bits are kept equal under the state lock.
            let index = FacilityState::claim_first_free(&mut state.spot_occupied)
                .expect("a held spot permit always has a free spot bit");
            ParkingSpot { index }
        };

        // Queue slot goes back only once the spot is ours.
        self.queue.add_permits(1);
        spot
    }

    /// Frees `spot` and wakes one blocked waiter, if any.
    pub fn leave(&self, spot: ParkingSpot) {
        {
            let mut state = self.lock_state();
            state.spot_occupied[spot.index] = false;
            state.occupied -= 1;
        }
        self.spots.add_permits(1);
    }

    pub fn waiting_count(&self) -> usize {
        self.lock_state().waiting
    }

    pub fn occupied_count(&self) -> usize {
        self.lock_state().occupied
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub fn snapshot(&self) -> FacilitySnapshot {
        let state = self.lock_state();
        FacilitySnapshot {
            occupied: state.occupied,
            waiting: state.waiting,
            spots: state.spot_occupied.clone(),
            queue_slots: state.queue_slot_occupied.clone(),
        }
    }
}
