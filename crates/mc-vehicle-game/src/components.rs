//! ECS components for players, vehicles and trailers.

use bevy_ecs::prelude::*;

/// Network identity for an entity.
#[derive(Component, Debug, Clone)]
pub struct EntityId {
    pub unique_id: i64,
    pub runtime_id: u64,
}

/// Position in the world.
#[derive(Component, Debug, Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn as_tuple(&self) -> (f32, f32, f32) {
        (self.x, self.y, self.z)
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Position at the start of the current tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct PreviousPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Rotation angles in degrees. `prev_yaw` is the yaw at the start of the tick
/// (used by observers to interpolate).
#[derive(Component, Debug, Clone, Copy)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub prev_yaw: f32,
}

/// Velocity vector in blocks/tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Whether the entity is resting on the ground.
#[derive(Component, Debug, Clone, Copy)]
pub struct OnGround(pub bool);

/// Axis-aligned bounding box dimensions.
#[derive(Component, Debug, Clone, Copy)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
}

/// Marker: this entity is a player.
#[derive(Component, Debug)]
pub struct Player;

/// Marker: this entity has been removed and is pending cleanup.
#[derive(Component, Debug)]
pub struct Dead;

/// Any drivable or towable vehicle.
#[derive(Component, Debug, Clone)]
pub struct Vehicle {
    /// Registry identifier, e.g. `"vehicle:atv"`.
    pub type_id: String,
    pub can_tow_trailer: bool,
    /// The trailer this vehicle has registered as towed by it.
    pub trailer: Option<Entity>,
}

/// Where a trailer couples to a vehicle, in the vehicle's local space.
#[derive(Component, Debug, Clone, Copy)]
pub struct TowBar {
    pub offset: (f32, f32, f32),
    /// Z offset of the vehicle body, added to `offset.2`.
    pub body_offset_z: f32,
}

/// Ground vehicles steer with an extra yaw on top of their body yaw.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LandVehicle {
    pub additional_yaw: f32,
}

/// The entity this entity is riding on.
#[derive(Component, Debug, Clone, Copy)]
pub struct RidingOn(pub Entity);

/// A towed trailer.
#[derive(Component, Debug, Clone)]
pub struct Trailer {
    /// The entity currently towing this trailer.
    pub pulling: Option<Entity>,
    /// Distance from the trailer origin to its hitch, in model pixels (1/16 block).
    pub hitch_offset: f32,
}

/// Cosmetic wheel spin in degrees.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct WheelRotation {
    pub current: f32,
    pub prev: f32,
}
