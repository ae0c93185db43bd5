// simulation_engine/mod.rs
pub mod intersections;
pub mod movement;
pub mod parking;
pub mod vehicles;
