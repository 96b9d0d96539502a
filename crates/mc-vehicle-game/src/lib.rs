//! Game logic: ECS world, vehicles, trailer towing, and fluid mixer blocks.

pub mod components;
pub mod config;
pub mod error;
pub mod fluid_mixer;
pub mod game_world;
pub mod towing;
pub mod trailer;
pub mod vehicle_registry;

pub use config::VehicleConfig;
pub use error::VehicleError;
pub use game_world::{GameEvent, GameWorld, SimulationSide};
