//! Trailer tick system and coupling rules.

use bevy_ecs::prelude::*;
use tracing::{debug, trace};

use crate::components::*;
use crate::config::VehicleConfig;
use crate::game_world::{GameEvent, OutgoingEvents, SimulationSide, Sound};
use crate::towing::{self, TowAnchor, TowBarGeometry};

/// Why a trailer lost its towing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachReason {
    /// The towing entity moved beyond the detach threshold.
    TooFar,
    /// The towing entity was removed from the world.
    PullerRemoved,
    /// The towing vehicle registered a different trailer (or none).
    PullerReleased,
}

/// Whether `entity` exists and has not been removed.
pub(crate) fn is_present(world: &World, entity: Entity) -> bool {
    world.get::<Position>(entity).is_some() && world.get::<Dead>(entity).is_none()
}

/// Whether `candidate` may tow a trailer.
///
/// Players always can. Vehicles need `can_tow_trailer`; when `check_riding`
/// is set, a vehicle that is itself riding something is refused.
pub(crate) fn can_tow(world: &World, candidate: Entity, check_riding: bool) -> bool {
    if !is_present(world, candidate) {
        return false;
    }
    if world.get::<Player>(candidate).is_some() {
        return true;
    }
    match world.get::<Vehicle>(candidate) {
        Some(vehicle) => {
            vehicle.can_tow_trailer && !(check_riding && world.get::<RidingOn>(candidate).is_some())
        }
        None => false,
    }
}

/// Set or clear the towing entity of `trailer`, publishing the new value.
///
/// Returns `false` (and clears the relation) when `candidate` cannot tow.
pub(crate) fn set_pulling_entity(world: &mut World, trailer: Entity, candidate: Option<Entity>) -> bool {
    let accepted = match candidate {
        Some(c) if c != trailer && can_tow(world, c, true) => Some(c),
        _ => None,
    };
    let Some(mut t) = world.get_mut::<Trailer>(trailer) else {
        return false;
    };
    t.pulling = accepted;

    publish_pulling(world, trailer, accepted);
    accepted.is_some()
}

/// Queue a sync event carrying the towing entity's unique id (`-1` for none).
fn publish_pulling(world: &mut World, trailer: Entity, pulling: Option<Entity>) {
    if !world.resource::<SimulationSide>().is_authoritative() {
        return;
    }
    let Some(trailer_runtime_id) = world.get::<EntityId>(trailer).map(|e| e.runtime_id) else {
        return;
    };
    let pulling_unique_id = pulling
        .and_then(|p| world.get::<EntityId>(p))
        .map(|e| e.unique_id)
        .unwrap_or(-1);
    world
        .resource_mut::<OutgoingEvents>()
        .events
        .push(GameEvent::PullingEntitySync {
            trailer_runtime_id,
            pulling_unique_id,
        });
}

/// Resolve a mirrored towing-entity id on an observer.
///
/// Only players and towing-capable vehicles are accepted.
pub(crate) fn resolve_synced_puller(world: &mut World, pulling_unique_id: i64) -> Option<Entity> {
    if pulling_unique_id == -1 {
        return None;
    }
    let found = world
        .query::<(Entity, &EntityId)>()
        .iter(world)
        .find(|(_, eid)| eid.unique_id == pulling_unique_id)
        .map(|(e, _)| e)?;
    can_tow(world, found, false).then_some(found)
}

fn detach(world: &mut World, trailer: Entity, reason: DetachReason) {
    if let Some(mut t) = world.get_mut::<Trailer>(trailer) {
        t.pulling = None;
    }
    let runtime_id = world.get::<EntityId>(trailer).map(|e| e.runtime_id).unwrap_or(0);
    debug!(trailer = runtime_id, ?reason, "trailer detached");

    world
        .resource_mut::<OutgoingEvents>()
        .events
        .push(GameEvent::TrailerDetached {
            trailer_runtime_id: runtime_id,
            reason,
        });
    publish_pulling(world, trailer, None);
}

fn anchor_of(world: &World, puller: Entity) -> Option<TowAnchor> {
    let pos = world.get::<Position>(puller)?;
    let yaw = world.get::<Rotation>(puller).map(|r| r.yaw).unwrap_or(0.0);
    let tow_bar = if world.get::<Vehicle>(puller).is_some() {
        world.get::<TowBar>(puller).map(|bar| TowBarGeometry {
            offset: bar.offset,
            body_offset_z: bar.body_offset_z,
            additional_yaw: world
                .get::<LandVehicle>(puller)
                .map(|l| l.additional_yaw)
                .unwrap_or(0.0),
        })
    } else {
        None
    };
    Some(TowAnchor {
        position: pos.as_tuple(),
        yaw,
        tow_bar,
    })
}

/// Integrate the trailer's current velocity and write the result back.
fn move_trailer(world: &mut World, trailer: Entity, ground_level: f32) {
    let Some(pos) = world.get::<Position>(trailer).copied() else {
        return;
    };
    let Some(vel) = world.get::<Velocity>(trailer).copied() else {
        return;
    };
    let (p, v, grounded) = towing::integrate(pos.as_tuple(), (vel.x, vel.y, vel.z), ground_level);
    if let Some(mut pos) = world.get_mut::<Position>(trailer) {
        (pos.x, pos.y, pos.z) = p;
    }
    if let Some(mut vel) = world.get_mut::<Velocity>(trailer) {
        (vel.x, vel.y, vel.z) = v;
    }
    if let Some(mut on_ground) = world.get_mut::<OnGround>(trailer) {
        on_ground.0 = grounded;
    }
}

fn follow(world: &mut World, trailer: Entity, anchor: &TowAnchor, config: &VehicleConfig) {
    let Some(pos) = world.get::<Position>(trailer).copied() else {
        return;
    };
    let hitch_offset = world.get::<Trailer>(trailer).map(|t| t.hitch_offset).unwrap_or(0.0);
    let prev_yaw = world.get::<Rotation>(trailer).map(|r| r.prev_yaw).unwrap_or(0.0);

    let step = towing::follow_step(
        pos.as_tuple(),
        prev_yaw,
        anchor,
        hitch_offset,
        config.heading_offset,
    );
    trace!(yaw = step.yaw, vx = step.velocity.0, vz = step.velocity.1, "trailer follow");

    if let Some(mut rot) = world.get_mut::<Rotation>(trailer) {
        rot.yaw = step.yaw;
        rot.prev_yaw = step.prev_yaw;
    }
    if let Some(mut vel) = world.get_mut::<Velocity>(trailer) {
        vel.x = step.velocity.0;
        vel.z = step.velocity.1;
    }
    move_trailer(world, trailer, config.ground_level);
}

fn tick_trailer(world: &mut World, trailer: Entity, config: &VehicleConfig, authoritative: bool) {
    if let Some(mut wheel) = world.get_mut::<WheelRotation>(trailer) {
        wheel.prev = wheel.current;
    }
    if let Some(mut vel) = world.get_mut::<Velocity>(trailer) {
        vel.y -= config.gravity;
    }

    let pulling = world.get::<Trailer>(trailer).and_then(|t| t.pulling);
    match pulling {
        Some(puller) => {
            let anchor = if is_present(world, puller) {
                anchor_of(world, puller)
            } else {
                None
            };
            let Some(anchor) = anchor else {
                detach(world, trailer, DetachReason::PullerRemoved);
                return;
            };

            if authoritative {
                let distance = world
                    .get::<Position>(trailer)
                    .zip(world.get::<Position>(puller))
                    .map(|(t, p)| t.distance_to(p))
                    .unwrap_or(0.0);
                if distance > config.trailer_detach_threshold {
                    world
                        .resource_mut::<OutgoingEvents>()
                        .events
                        .push(GameEvent::SoundPlayed {
                            sound: Sound::ItemBreak,
                            position: anchor.position,
                        });
                    detach(world, trailer, DetachReason::TooFar);
                    return;
                }
            }

            if let Some(vehicle) = world.get::<Vehicle>(puller) {
                if vehicle.trailer != Some(trailer) {
                    detach(world, trailer, DetachReason::PullerReleased);
                    return;
                }
            }

            follow(world, trailer, &anchor, config);
        }
        None if authoritative => {
            if let Some(mut vel) = world.get_mut::<Velocity>(trailer) {
                (vel.x, vel.y, vel.z) =
                    towing::apply_friction((vel.x, vel.y, vel.z), config.trailer_friction);
            }
            move_trailer(world, trailer, config.ground_level);
        }
        None => {}
    }

    let prev = world.get::<PreviousPosition>(trailer).map(|p| (p.x, p.y, p.z));
    let current = world.get::<Position>(trailer).map(|p| p.as_tuple());
    if let (Some(prev), Some(current)) = (prev, current) {
        if let Some(mut wheel) = world.get_mut::<WheelRotation>(trailer) {
            wheel.current += towing::wheel_spin(prev, current);
        }
    }
}

/// Run the towing update for every trailer.
pub fn system_trailer_tick(world: &mut World) {
    let config = world.resource::<VehicleConfig>().clone();
    let authoritative = world.resource::<SimulationSide>().is_authoritative();

    let trailers: Vec<Entity> = world
        .query_filtered::<Entity, (With<Trailer>, Without<Dead>)>()
        .iter(world)
        .collect();

    for trailer in trailers {
        tick_trailer(world, trailer, &config, authoritative);
    }
}
