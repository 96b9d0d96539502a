//! ECS game world: bevy_ecs World, vehicle management, tick systems, and event bus.

use std::sync::atomic::{AtomicI64, Ordering};

use bevy_ecs::prelude::*;
use tracing::debug;

use crate::components::*;
use crate::config::VehicleConfig;
use crate::error::VehicleError;
use crate::fluid_mixer::{
    self, BlockEntities, BlockEntityData, DroppedItem, Facing, FluidMixer, FluidMixerItemData,
    HeldItem, FLUID_MIXER_HARDNESS, FLUID_MIXER_ITEM,
};
use crate::trailer::{self, DetachReason};
use crate::vehicle_registry::{VehicleKind, VehicleRegistry};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Outgoing events queued by ECS operations for the host to consume.
#[derive(Resource, Default)]
pub struct OutgoingEvents {
    pub events: Vec<GameEvent>,
}

/// Global tick counter (incremented every 50 ms).
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

/// Thread-safe entity ID allocator (shared by players and vehicles).
#[derive(Resource)]
pub struct EntityIdAllocator {
    next: AtomicI64,
}

impl EntityIdAllocator {
    pub fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }

    /// Allocate the next unique entity ID.
    pub fn allocate(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Current value (next ID that will be allocated).
    pub fn current(&self) -> i64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Which copy of the simulation this world is.
///
/// The authoritative side decides couplings, detaches by distance, applies
/// friction and runs machines. Observers mirror the towing relation from
/// [`GameEvent::PullingEntitySync`] and only run the follow motion.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationSide {
    #[default]
    Authoritative,
    Observer,
}

impl SimulationSide {
    pub fn is_authoritative(self) -> bool {
        self == SimulationSide::Authoritative
    }
}

// ---------------------------------------------------------------------------
// Game events (ECS → host)
// ---------------------------------------------------------------------------

/// Sounds the world asks the host to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    ItemBreak,
}

/// GUIs the world asks the host to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiKind {
    FluidMixer,
}

/// Events produced by the game world, consumed by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A vehicle or trailer was spawned.
    EntitySpawned {
        runtime_id: u64,
        unique_id: i64,
        type_id: String,
        position: (f32, f32, f32),
    },
    /// An entity was removed.
    EntityRemoved { unique_id: i64 },
    /// A trailer moved this tick.
    TrailerMoved {
        runtime_id: u64,
        position: (f32, f32, f32),
        yaw: f32,
        wheel_rotation: f32,
        on_ground: bool,
    },
    /// The authoritative towing entity of a trailer changed (`-1` = none).
    PullingEntitySync {
        trailer_runtime_id: u64,
        pulling_unique_id: i64,
    },
    /// A trailer lost its towing entity.
    TrailerDetached {
        trailer_runtime_id: u64,
        reason: DetachReason,
    },
    SoundPlayed {
        sound: Sound,
        position: (f32, f32, f32),
    },
    OpenGui {
        player_runtime_id: u64,
        gui: GuiKind,
        position: (i32, i32, i32),
    },
    ItemDropped {
        position: (f32, f32, f32),
        item: DroppedItem,
    },
}

// ---------------------------------------------------------------------------
// GameWorld
// ---------------------------------------------------------------------------

/// Snapshot of a trailer for hosts and tests.
#[derive(Debug, Clone)]
pub struct TrailerSnapshot {
    pub runtime_id: u64,
    pub position: (f32, f32, f32),
    pub velocity: (f32, f32, f32),
    pub yaw: f32,
    pub prev_yaw: f32,
    pub wheel_rotation: f32,
    /// Runtime id of the towing entity.
    pub pulling: Option<u64>,
}

/// The ECS game world.
pub struct GameWorld {
    pub world: World,
    pub vehicle_registry: VehicleRegistry,
}

impl GameWorld {
    /// Create a new authoritative game world with the given starting entity ID.
    pub fn new(starting_entity_id: i64) -> Self {
        Self::with_config(
            starting_entity_id,
            VehicleConfig::default(),
            SimulationSide::Authoritative,
        )
    }

    pub fn with_config(starting_entity_id: i64, config: VehicleConfig, side: SimulationSide) -> Self {
        let mut world = World::new();
        world.insert_resource(OutgoingEvents::default());
        world.insert_resource(TickCounter::default());
        world.insert_resource(EntityIdAllocator::new(starting_entity_id));
        world.insert_resource(BlockEntities::default());
        world.insert_resource(config);
        world.insert_resource(side);

        Self {
            world,
            vehicle_registry: VehicleRegistry::new(),
        }
    }

    /// Run one game tick: previous state, trailers, movement collection, machines, cleanup.
    pub fn tick(&mut self) {
        self.world.resource_mut::<TickCounter>().0 += 1;
        system_record_previous(&mut self.world);
        trailer::system_trailer_tick(&mut self.world);
        system_collect_trailer_moves(&mut self.world);
        if self.side().is_authoritative() {
            fluid_mixer::system_fluid_mixer_tick(&mut self.world);
        }
        system_cleanup_dead(&mut self.world);
    }

    /// Drain all pending outgoing events.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.world.resource_mut::<OutgoingEvents>().events)
    }

    /// Return the current tick count.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<TickCounter>().0
    }

    pub fn side(&self) -> SimulationSide {
        *self.world.resource::<SimulationSide>()
    }

    pub fn config(&self) -> &VehicleConfig {
        self.world.resource::<VehicleConfig>()
    }

    /// Allocate an entity ID.
    pub fn allocate_entity_id(&self) -> i64 {
        self.world.resource::<EntityIdAllocator>().allocate()
    }

    /// Spawn a vehicle or trailer. Returns `(unique_id, runtime_id)`.
    pub fn spawn_vehicle(
        &mut self,
        type_id: &str,
        x: f32,
        y: f32,
        z: f32,
        yaw: f32,
    ) -> Result<(i64, u64), VehicleError> {
        let def = self
            .vehicle_registry
            .get(type_id)
            .ok_or_else(|| VehicleError::UnknownVehicleType(type_id.to_string()))?
            .clone();
        let entity_id = self.allocate_entity_id();
        let runtime_id = entity_id as u64;

        let mut entity = self.world.spawn((
            EntityId {
                unique_id: entity_id,
                runtime_id,
            },
            Position { x, y, z },
            PreviousPosition { x, y, z },
            Rotation {
                pitch: 0.0,
                yaw,
                prev_yaw: yaw,
            },
            Velocity {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            OnGround(false),
            BoundingBox {
                width: def.bb_width,
                height: def.bb_height,
            },
            Vehicle {
                type_id: def.type_id.clone(),
                can_tow_trailer: def.can_tow_trailer,
                trailer: None,
            },
        ));
        if let Some(offset) = def.tow_bar {
            entity.insert(TowBar {
                offset,
                body_offset_z: def.body_offset_z,
            });
        }
        match def.kind {
            VehicleKind::Land => {
                entity.insert(LandVehicle::default());
            }
            VehicleKind::Trailer => {
                entity.insert((
                    Trailer {
                        pulling: None,
                        hitch_offset: def.hitch_offset,
                    },
                    WheelRotation::default(),
                ));
            }
            VehicleKind::Water => {}
        }

        debug!(runtime_id, name = %def.display_name, "vehicle spawned");
        self.push_event(GameEvent::EntitySpawned {
            runtime_id,
            unique_id: entity_id,
            type_id: def.type_id,
            position: (x, y, z),
        });

        Ok((entity_id, runtime_id))
    }

    /// Spawn a player. Returns `(unique_id, runtime_id)`.
    pub fn spawn_player(&mut self, position: (f32, f32, f32)) -> (i64, u64) {
        let unique_id = self.allocate_entity_id();
        let runtime_id = unique_id as u64;
        self.world.spawn((
            EntityId {
                unique_id,
                runtime_id,
            },
            Position {
                x: position.0,
                y: position.1,
                z: position.2,
            },
            Rotation {
                pitch: 0.0,
                yaw: 0.0,
                prev_yaw: 0.0,
            },
            Player,
        ));
        (unique_id, runtime_id)
    }

    /// Update a player's position.
    pub fn update_player_position(&mut self, unique_id: i64, x: f32, y: f32, z: f32) {
        let mut query = self
            .world
            .query_filtered::<(&EntityId, &mut Position), With<Player>>();
        for (eid, mut pos) in query.iter_mut(&mut self.world) {
            if eid.unique_id == unique_id {
                pos.x = x;
                pos.y = y;
                pos.z = z;
                return;
            }
        }
    }

    /// Move a driven vehicle (position and heading come from its driver).
    pub fn update_vehicle_transform(
        &mut self,
        runtime_id: u64,
        position: (f32, f32, f32),
        yaw: f32,
    ) -> Result<(), VehicleError> {
        let entity = self.find_entity(runtime_id)?;
        if let Some(mut pos) = self.world.get_mut::<Position>(entity) {
            (pos.x, pos.y, pos.z) = position;
        }
        if let Some(mut rot) = self.world.get_mut::<Rotation>(entity) {
            rot.yaw = yaw;
        }
        Ok(())
    }

    /// Set the extra steering yaw of a land vehicle.
    pub fn set_additional_yaw(&mut self, runtime_id: u64, additional_yaw: f32) -> Result<(), VehicleError> {
        let entity = self.find_entity(runtime_id)?;
        if let Some(mut land) = self.world.get_mut::<LandVehicle>(entity) {
            land.additional_yaw = additional_yaw;
        }
        Ok(())
    }

    /// Make `rider` ride `mount`, or dismount it when `mount` is `None`.
    pub fn set_riding(&mut self, rider: u64, mount: Option<u64>) -> Result<(), VehicleError> {
        let rider = self.find_entity(rider)?;
        match mount {
            Some(mount) => {
                let mount = self.find_entity(mount)?;
                self.world.entity_mut(rider).insert(RidingOn(mount));
            }
            None => {
                self.world.entity_mut(rider).remove::<RidingOn>();
            }
        }
        Ok(())
    }

    /// Remove an entity. Couplings referring to it break on the next tick.
    pub fn remove_entity(&mut self, runtime_id: u64) -> bool {
        let Ok(entity) = self.find_entity(runtime_id) else {
            return false;
        };
        let unique_id = self
            .world
            .get::<EntityId>(entity)
            .map(|e| e.unique_id)
            .unwrap_or(0);

        let mut vehicles = self.world.query::<&mut Vehicle>();
        for mut vehicle in vehicles.iter_mut(&mut self.world) {
            if vehicle.trailer == Some(entity) {
                vehicle.trailer = None;
            }
        }

        self.world.entity_mut(entity).insert(Dead);
        self.push_event(GameEvent::EntityRemoved { unique_id });
        true
    }

    // -----------------------------------------------------------------------
    // Coupling
    // -----------------------------------------------------------------------

    /// Couple a trailer behind a towing vehicle.
    pub fn couple_trailer(&mut self, vehicle_rid: u64, trailer_rid: u64) -> Result<(), VehicleError> {
        let vehicle = self.find_entity(vehicle_rid)?;
        let trailer = self.find_trailer(trailer_rid)?;

        if !trailer::set_pulling_entity(&mut self.world, trailer, Some(vehicle)) {
            return Err(VehicleError::CannotTow {
                trailer: trailer_rid,
                puller: vehicle_rid,
            });
        }
        if let Some(mut v) = self.world.get_mut::<Vehicle>(vehicle) {
            v.trailer = Some(trailer);
        }
        debug!(vehicle = vehicle_rid, trailer = trailer_rid, "trailer coupled");
        Ok(())
    }

    /// Let a player pull a trailer by hand.
    pub fn hitch_to_player(&mut self, player_uid: i64, trailer_rid: u64) -> Result<(), VehicleError> {
        let (player, player_rid) = self
            .find_player(player_uid)
            .ok_or(VehicleError::NotFound(player_uid as u64))?;
        let trailer = self.find_trailer(trailer_rid)?;

        if !trailer::set_pulling_entity(&mut self.world, trailer, Some(player)) {
            return Err(VehicleError::CannotTow {
                trailer: trailer_rid,
                puller: player_rid,
            });
        }
        debug!(player = player_rid, trailer = trailer_rid, "trailer hitched to player");
        Ok(())
    }

    /// Release a trailer from whatever is towing it.
    pub fn uncouple_trailer(&mut self, trailer_rid: u64) -> Result<(), VehicleError> {
        let trailer = self.find_trailer(trailer_rid)?;
        let puller = self.world.get::<Trailer>(trailer).and_then(|t| t.pulling);
        if let Some(mut v) = puller.and_then(|p| self.world.get_mut::<Vehicle>(p)) {
            if v.trailer == Some(trailer) {
                v.trailer = None;
            }
        }
        trailer::set_pulling_entity(&mut self.world, trailer, None);
        Ok(())
    }

    /// Mirror the authoritative towing entity on an observer.
    ///
    /// A towing vehicle also gets this trailer registered, so the observer's
    /// release check sees the same pairing as the authoritative side.
    pub fn apply_pulling_sync(&mut self, trailer_rid: u64, pulling_unique_id: i64) -> Result<(), VehicleError> {
        let trailer = self.find_trailer(trailer_rid)?;
        let pulling = trailer::resolve_synced_puller(&mut self.world, pulling_unique_id);
        let previous = self.world.get::<Trailer>(trailer).and_then(|t| t.pulling);

        if previous != pulling {
            if let Some(mut v) = previous.and_then(|p| self.world.get_mut::<Vehicle>(p)) {
                if v.trailer == Some(trailer) {
                    v.trailer = None;
                }
            }
        }
        if let Some(mut v) = pulling.and_then(|p| self.world.get_mut::<Vehicle>(p)) {
            v.trailer = Some(trailer);
        }
        if let Some(mut t) = self.world.get_mut::<Trailer>(trailer) {
            t.pulling = pulling;
        }
        Ok(())
    }

    /// Runtime id of the entity towing `trailer_rid`.
    pub fn pulling_entity(&mut self, trailer_rid: u64) -> Option<u64> {
        let mut query = self.world.query::<(&EntityId, &Trailer)>();
        let pulling = query
            .iter(&self.world)
            .find(|(eid, _)| eid.runtime_id == trailer_rid)
            .and_then(|(_, t)| t.pulling)?;
        self.world.get::<EntityId>(pulling).map(|e| e.runtime_id)
    }

    /// Snapshot a trailer by runtime id.
    pub fn trailer(&mut self, runtime_id: u64) -> Option<TrailerSnapshot> {
        let mut query = self.world.query::<(
            &EntityId,
            &Position,
            &Velocity,
            &Rotation,
            &Trailer,
            Option<&WheelRotation>,
        )>();
        let (eid, pos, vel, rot, trailer, wheel) = query
            .iter(&self.world)
            .find(|(eid, ..)| eid.runtime_id == runtime_id)?;
        let pulling = trailer
            .pulling
            .and_then(|p| self.world.get::<EntityId>(p))
            .map(|e| e.runtime_id);
        Some(TrailerSnapshot {
            runtime_id: eid.runtime_id,
            position: pos.as_tuple(),
            velocity: (vel.x, vel.y, vel.z),
            yaw: rot.yaw,
            prev_yaw: rot.prev_yaw,
            wheel_rotation: wheel.map(|w| w.current).unwrap_or(0.0),
            pulling,
        })
    }

    /// Hitbox `(width, height)` of a spawned vehicle.
    pub fn bounding_box(&mut self, runtime_id: u64) -> Option<(f32, f32)> {
        let entity = self.find_entity(runtime_id).ok()?;
        self.world
            .get::<BoundingBox>(entity)
            .map(|bb| (bb.width, bb.height))
    }

    /// Overwrite a trailer's velocity.
    pub fn set_velocity(&mut self, runtime_id: u64, vx: f32, vy: f32, vz: f32) -> Result<(), VehicleError> {
        let entity = self.find_entity(runtime_id)?;
        if let Some(mut vel) = self.world.get_mut::<Velocity>(entity) {
            vel.x = vx;
            vel.y = vy;
            vel.z = vz;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fluid mixer blocks
    // -----------------------------------------------------------------------

    /// Place a fluid mixer, restoring state carried by its item if any.
    pub fn place_fluid_mixer(&mut self, pos: (i32, i32, i32), facing: Facing, item_data: Option<&FluidMixerItemData>) {
        let mixer = item_data.map(FluidMixer::from_item_data).unwrap_or_default();
        self.world
            .resource_mut::<BlockEntities>()
            .blocks
            .insert(pos, BlockEntityData::FluidMixer { facing, mixer });
    }

    pub fn fluid_mixer(&self, pos: (i32, i32, i32)) -> Option<&FluidMixer> {
        match self.world.resource::<BlockEntities>().blocks.get(&pos)? {
            BlockEntityData::FluidMixer { mixer, .. } => Some(mixer),
        }
    }

    /// Hardness of the block entity at `pos`, if any.
    pub fn block_hardness(&self, pos: (i32, i32, i32)) -> Option<f32> {
        match self.world.resource::<BlockEntities>().blocks.get(&pos)? {
            BlockEntityData::FluidMixer { .. } => Some(FLUID_MIXER_HARDNESS),
        }
    }

    pub fn fluid_mixer_mut(&mut self, pos: (i32, i32, i32)) -> Option<&mut FluidMixer> {
        match self
            .world
            .resource_mut::<BlockEntities>()
            .into_inner()
            .blocks
            .get_mut(&pos)?
        {
            BlockEntityData::FluidMixer { mixer, .. } => Some(mixer),
        }
    }

    /// A player used the block at `pos` while holding `held`.
    ///
    /// Bucket interactions come first; otherwise the mixer GUI opens. Always
    /// reports the click as handled.
    pub fn activate_block(&mut self, player_uid: i64, pos: (i32, i32, i32), held: &mut HeldItem) -> bool {
        if !self.side().is_authoritative() {
            return true;
        }
        let Some(mixer) = self.fluid_mixer_mut(pos) else {
            return true;
        };
        if mixer.interact(held) {
            debug!(?pos, ?held, "fluid mixer bucket interaction");
            return true;
        }
        if let Some((_, player_runtime_id)) = self.find_player(player_uid) {
            debug!(player = player_runtime_id, ?pos, "opening fluid mixer gui");
            self.push_event(GameEvent::OpenGui {
                player_runtime_id,
                gui: GuiKind::FluidMixer,
                position: pos,
            });
        }
        true
    }

    /// A player broke the block at `pos`.
    ///
    /// In survival the mixer drops itself carrying its tanks, fuel and name.
    /// Creative players and observers remove the block without a drop.
    pub fn remove_block_by_player(&mut self, player_uid: i64, pos: (i32, i32, i32), creative: bool) -> bool {
        let removed = self.world.resource_mut::<BlockEntities>().blocks.remove(&pos);
        let Some(BlockEntityData::FluidMixer { mixer, .. }) = removed else {
            return false;
        };
        if !self.side().is_authoritative() || creative {
            return true;
        }

        let item = DroppedItem {
            item_id: FLUID_MIXER_ITEM.to_string(),
            count: 1,
            display_name: mixer.has_custom_name().then(|| mixer.custom_name.clone()).flatten(),
            block_entity: Some(mixer.to_item_data()),
        };
        debug!(player = player_uid, ?pos, "fluid mixer dropped");
        self.push_event(GameEvent::ItemDropped {
            position: (pos.0 as f32 + 0.5, pos.1 as f32 + 0.5, pos.2 as f32 + 0.5),
            item,
        });
        true
    }

    // -----------------------------------------------------------------------
    // Lookup helpers
    // -----------------------------------------------------------------------

    fn push_event(&mut self, event: GameEvent) {
        self.world.resource_mut::<OutgoingEvents>().events.push(event);
    }

    /// Find a live entity by runtime_id.
    fn find_entity(&mut self, runtime_id: u64) -> Result<Entity, VehicleError> {
        let mut query = self
            .world
            .query_filtered::<(Entity, &EntityId), Without<Dead>>();
        query
            .iter(&self.world)
            .find(|(_, eid)| eid.runtime_id == runtime_id)
            .map(|(entity, _)| entity)
            .ok_or(VehicleError::NotFound(runtime_id))
    }

    fn find_trailer(&mut self, runtime_id: u64) -> Result<Entity, VehicleError> {
        let entity = self.find_entity(runtime_id)?;
        if self.world.get::<Trailer>(entity).is_none() {
            return Err(VehicleError::NotATrailer(runtime_id));
        }
        Ok(entity)
    }

    /// Find a player by unique id. Returns `(entity, runtime_id)`.
    fn find_player(&mut self, unique_id: i64) -> Option<(Entity, u64)> {
        let mut query = self
            .world
            .query_filtered::<(Entity, &EntityId), (With<Player>, Without<Dead>)>();
        query
            .iter(&self.world)
            .find(|(_, eid)| eid.unique_id == unique_id)
            .map(|(entity, eid)| (entity, eid.runtime_id))
    }
}

// ---------------------------------------------------------------------------
// Systems (manual, called by GameWorld::tick)
// ---------------------------------------------------------------------------

/// Remember where every moving entity started the tick.
fn system_record_previous(world: &mut World) {
    let mut query = world.query::<(&Position, &mut PreviousPosition, &mut Rotation)>();
    for (pos, mut prev, mut rot) in query.iter_mut(world) {
        prev.x = pos.x;
        prev.y = pos.y;
        prev.z = pos.z;
        rot.prev_yaw = rot.yaw;
    }
}

/// Emit TrailerMoved events for trailers that changed position or heading.
fn system_collect_trailer_moves(world: &mut World) {
    let mut moves = Vec::new();

    let mut query = world.query_filtered::<(
        &EntityId,
        &Position,
        &PreviousPosition,
        &Rotation,
        &WheelRotation,
        &OnGround,
    ), (With<Trailer>, Without<Dead>)>();

    for (eid, pos, prev, rot, wheel, on_ground) in query.iter(world) {
        let moved = (pos.x - prev.x).abs() > 0.001
            || (pos.y - prev.y).abs() > 0.001
            || (pos.z - prev.z).abs() > 0.001
            || (rot.yaw - rot.prev_yaw).abs() > 0.001;
        if moved {
            moves.push(GameEvent::TrailerMoved {
                runtime_id: eid.runtime_id,
                position: pos.as_tuple(),
                yaw: rot.yaw,
                wheel_rotation: wheel.current,
                on_ground: on_ground.0,
            });
        }
    }

    world.resource_mut::<OutgoingEvents>().events.extend(moves);
}

/// Despawn removed entities at the end of the tick.
fn system_cleanup_dead(world: &mut World) {
    let dead_entities: Vec<Entity> = world
        .query_filtered::<Entity, With<Dead>>()
        .iter(world)
        .collect();
    for entity in dead_entities {
        world.despawn(entity);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
