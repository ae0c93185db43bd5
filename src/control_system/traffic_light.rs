use crate::simulation_engine::intersections::LightState;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared handle to one controller's light.
///
/// Clones point at the same state; every read and write goes through the one
/// mutex, so transitions are totally ordered per controller.
#[derive(Debug, Clone, Default)]
pub struct TrafficLight {
    state: Arc<Mutex<LightState>>,
}

impl TrafficLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> LightState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the light and returns the previous state.
    pub fn set(&self, next: LightState) -> LightState {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *state, next)
    }
}
