pub mod spawner;
pub mod traffic_light;
pub mod traffic_light_controller;
