// Parking facility sizing
pub const PARKING_CAPACITY: usize = 10;
pub const PARKING_QUEUE_SIZE: usize = 5;
/// Spots per row of the lot grid (row = index / 5, column = index % 5).
pub const PARKING_ROW_WIDTH: usize = 5;

// Frame magic markers
pub const MSG_MAGIC: u32 = 0xCAFE_BABE;
pub const CMD_MAGIC: u32 = 0xDEAD_BEEF;
pub const COORD_MAGIC: u32 = 0xC005_1A10;

/// Upper bound on a frame body. A larger declared length is treated as a corrupt header.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

// Canvas the waypoints are expressed in
pub const CANVAS_WIDTH: f32 = 1200.0;
pub const CANVAS_HEIGHT: f32 = 800.0;
pub const ROAD_Y: f32 = 400.0;
