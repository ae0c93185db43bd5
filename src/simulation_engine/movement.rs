use serde::{Deserialize, Serialize};

/// A point on the simulation canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Advances `current` at most `speed` units toward `target`.
///
/// Returns `true` once the vehicle is at the target. When the remaining
/// distance is below `speed` the position snaps exactly onto the target
/// instead of overshooting, so arrival coordinates are reproducible.
pub fn move_towards(current: &mut Position, target: Position, speed: f32) -> bool {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    let dist = (dx * dx + dy * dy).sqrt();

    if dist < speed {
        *current = target;
        return true;
    }

    let ratio = speed / dist;
    current.x += dx * ratio;
    current.y += dy * ratio;
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_by_speed_along_axis() {
        let mut pos = Position::new(0.0, 400.0);
        assert!(!move_towards(&mut pos, Position::new(10.0, 400.0), 4.0));
        assert_eq!(pos, Position::new(4.0, 400.0));
        assert!(!move_towards(&mut pos, Position::new(10.0, 400.0), 4.0));
        assert_eq!(pos, Position::new(8.0, 400.0));
        // 2 units remain, less than the speed: snap.
        assert!(move_towards(&mut pos, Position::new(10.0, 400.0), 4.0));
        assert_eq!(pos, Position::new(10.0, 400.0));
    }

    #[test]
    fn exact_multiple_takes_one_extra_zero_length_step() {
        // dist == speed is not "less than", so the vehicle lands on the target
        // by stepping, then reports arrival on the following call.
        let mut pos = Position::new(0.0, 0.0);
        assert!(!move_towards(&mut pos, Position::new(2.0, 0.0), 2.0));
        assert_eq!(pos, Position::new(2.0, 0.0));
        assert!(move_towards(&mut pos, Position::new(2.0, 0.0), 2.0));
    }

    #[test]
    fn already_at_target_arrives_immediately() {
        let mut pos = Position::new(300.0, 320.0);
        assert!(move_towards(&mut pos, Position::new(300.0, 320.0), 1.0));
    }

    #[test]
    fn diagonal_step_keeps_length() {
        let mut pos = Position::new(0.0, 0.0);
        move_towards(&mut pos, Position::new(30.0, 40.0), 5.0);
        assert!((pos.x - 3.0).abs() < 1e-5);
        assert!((pos.y - 4.0).abs() < 1e-5);
        assert!((pos.distance_to(Position::new(30.0, 40.0)) - 45.0).abs() < 1e-4);
    }
}
