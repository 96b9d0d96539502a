//! Fluid mixer block entity.
//!
//! The mixer burns fuel items to blend blaze juice and ender sap into
//! fuelium. Players fill and empty its tanks with buckets; anything else
//! opens the mixer's GUI.

use std::collections::HashMap;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Block hardness of the fluid mixer.
pub const FLUID_MIXER_HARDNESS: f32 = 1.0;

/// Item id of the fluid mixer block.
pub const FLUID_MIXER_ITEM: &str = "vehicle:fluid_mixer";

/// Capacity of each mixer tank in millibuckets.
pub const TANK_CAPACITY: u32 = 5000;

/// One bucket in millibuckets.
pub const BUCKET_VOLUME: u32 = 1000;

/// Ticks one fuel item burns for.
pub const FUEL_BURN_TICKS: u32 = 200;

/// Ticks of burning needed per mixing cycle.
pub const EXTRACTION_TICKS: u32 = 20;

/// Millibuckets of each input consumed per cycle.
pub const MIX_INPUT: u32 = 10;

/// Millibuckets of fuelium produced per cycle.
pub const MIX_OUTPUT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fluid {
    BlazeJuice,
    EnderSap,
    Fuelium,
}

/// Horizontal orientation of a rotatable block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    North,
    South,
    West,
    East,
}

/// A single-fluid tank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidTank {
    pub fluid: Fluid,
    pub amount: u32,
    pub capacity: u32,
}

impl FluidTank {
    pub fn new(fluid: Fluid, capacity: u32) -> Self {
        Self {
            fluid,
            amount: 0,
            capacity,
        }
    }

    pub fn space(&self) -> u32 {
        self.capacity.saturating_sub(self.amount)
    }

    /// Add up to `amount`. Returns how much was accepted.
    pub fn fill(&mut self, fluid: Fluid, amount: u32) -> u32 {
        if fluid != self.fluid {
            return 0;
        }
        let accepted = amount.min(self.space());
        self.amount += accepted;
        accepted
    }

    /// Remove up to `amount`. Returns how much was removed.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let drained = amount.min(self.amount);
        self.amount -= drained;
        drained
    }
}

/// What a player is holding when they use a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeldItem {
    Empty,
    Bucket,
    FilledBucket(Fluid),
    Other(String),
}

/// Mixer state that travels with the item when the block is broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidMixerItemData {
    pub blaze_juice: u32,
    pub ender_sap: u32,
    pub fuelium: u32,
    pub fuel_items: u32,
    pub custom_name: Option<String>,
}

/// An item entity dropped into the world.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedItem {
    pub item_id: String,
    pub count: u32,
    pub display_name: Option<String>,
    pub block_entity: Option<FluidMixerItemData>,
}

/// Fluid mixer block entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluidMixer {
    pub blaze_juice: FluidTank,
    pub ender_sap: FluidTank,
    pub fuelium: FluidTank,
    /// Fuel items waiting in the fuel slot.
    pub fuel_items: u32,
    pub remaining_fuel: u32,
    pub fuel_max_progress: u32,
    pub extraction_progress: u32,
    pub custom_name: Option<String>,
}

impl Default for FluidMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl FluidMixer {
    pub fn new() -> Self {
        Self {
            blaze_juice: FluidTank::new(Fluid::BlazeJuice, TANK_CAPACITY),
            ender_sap: FluidTank::new(Fluid::EnderSap, TANK_CAPACITY),
            fuelium: FluidTank::new(Fluid::Fuelium, TANK_CAPACITY),
            fuel_items: 0,
            remaining_fuel: 0,
            fuel_max_progress: 0,
            extraction_progress: 0,
            custom_name: None,
        }
    }

    /// Rebuild a mixer from dropped-item data. Transient progress starts at zero.
    pub fn from_item_data(data: &FluidMixerItemData) -> Self {
        let mut mixer = Self::new();
        mixer.blaze_juice.amount = data.blaze_juice.min(TANK_CAPACITY);
        mixer.ender_sap.amount = data.ender_sap.min(TANK_CAPACITY);
        mixer.fuelium.amount = data.fuelium.min(TANK_CAPACITY);
        mixer.fuel_items = data.fuel_items;
        mixer.custom_name = data.custom_name.clone();
        mixer
    }

    /// Persistent state for the dropped item; position and progress are left out.
    pub fn to_item_data(&self) -> FluidMixerItemData {
        FluidMixerItemData {
            blaze_juice: self.blaze_juice.amount,
            ender_sap: self.ender_sap.amount,
            fuelium: self.fuelium.amount,
            fuel_items: self.fuel_items,
            custom_name: self.custom_name.clone(),
        }
    }

    pub fn has_custom_name(&self) -> bool {
        self.custom_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn is_burning(&self) -> bool {
        self.remaining_fuel > 0
    }

    fn can_mix(&self) -> bool {
        self.blaze_juice.amount >= MIX_INPUT
            && self.ender_sap.amount >= MIX_INPUT
            && self.fuelium.space() >= MIX_OUTPUT
    }

    /// Try to use a fluid container on the mixer.
    ///
    /// Filled input buckets go into the matching tank; an empty bucket takes a
    /// bucket of fuelium. Returns `true` and updates `held` if anything moved.
    pub fn interact(&mut self, held: &mut HeldItem) -> bool {
        match held {
            HeldItem::FilledBucket(fluid) => {
                let tank = match fluid {
                    Fluid::BlazeJuice => &mut self.blaze_juice,
                    Fluid::EnderSap => &mut self.ender_sap,
                    Fluid::Fuelium => return false,
                };
                if tank.space() < BUCKET_VOLUME {
                    return false;
                }
                tank.fill(*fluid, BUCKET_VOLUME);
                *held = HeldItem::Bucket;
                true
            }
            HeldItem::Bucket => {
                if self.fuelium.amount < BUCKET_VOLUME {
                    return false;
                }
                self.fuelium.drain(BUCKET_VOLUME);
                *held = HeldItem::FilledBucket(Fluid::Fuelium);
                true
            }
            HeldItem::Empty | HeldItem::Other(_) => false,
        }
    }

    /// Advance burning and mixing by one tick.
    pub fn tick(&mut self) {
        if !self.is_burning() && self.fuel_items > 0 && self.can_mix() {
            self.fuel_items -= 1;
            self.remaining_fuel = FUEL_BURN_TICKS;
            self.fuel_max_progress = FUEL_BURN_TICKS;
        }

        if !self.is_burning() {
            self.extraction_progress = 0;
            return;
        }
        self.remaining_fuel -= 1;

        if !self.can_mix() {
            self.extraction_progress = 0;
            return;
        }
        self.extraction_progress += 1;
        if self.extraction_progress >= EXTRACTION_TICKS {
            self.extraction_progress = 0;
            self.blaze_juice.drain(MIX_INPUT);
            self.ender_sap.drain(MIX_INPUT);
            self.fuelium.fill(Fluid::Fuelium, MIX_OUTPUT);
        }
    }
}

/// Block entity data stored per block.
#[derive(Debug, Clone)]
pub enum BlockEntityData {
    FluidMixer { facing: Facing, mixer: FluidMixer },
}

/// All block entities in the world, keyed by block position.
#[derive(Resource, Debug, Default)]
pub struct BlockEntities {
    pub blocks: HashMap<(i32, i32, i32), BlockEntityData>,
}

/// Advance every fluid mixer by one tick.
pub fn system_fluid_mixer_tick(world: &mut World) {
    let mut blocks = world.resource_mut::<BlockEntities>();
    for data in blocks.blocks.values_mut() {
        match data {
            BlockEntityData::FluidMixer { mixer, .. } => mixer.tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_mixer() -> FluidMixer {
        let mut mixer = FluidMixer::new();
        mixer.blaze_juice.amount = 1000;
        mixer.ender_sap.amount = 1000;
        mixer
    }

    #[test]
    fn tank_rejects_wrong_fluid() {
        let mut tank = FluidTank::new(Fluid::EnderSap, 100);
        assert_eq!(tank.fill(Fluid::BlazeJuice, 50), 0);
        assert_eq!(tank.fill(Fluid::EnderSap, 150), 100);
        assert_eq!(tank.drain(30), 30);
        assert_eq!(tank.amount, 70);
    }

    #[test]
    fn overfilled_tank_has_no_space() {
        let mut tank = FluidTank::new(Fluid::Fuelium, 100);
        tank.amount = 250;
        assert_eq!(tank.space(), 0);
        assert_eq!(tank.fill(Fluid::Fuelium, 10), 0);
        assert_eq!(tank.amount, 250);
    }

    #[test]
    fn bucket_fills_matching_tank() {
        let mut mixer = FluidMixer::new();
        let mut held = HeldItem::FilledBucket(Fluid::EnderSap);
        assert!(mixer.interact(&mut held));
        assert_eq!(held, HeldItem::Bucket);
        assert_eq!(mixer.ender_sap.amount, BUCKET_VOLUME);
        assert_eq!(mixer.blaze_juice.amount, 0);
    }

    #[test]
    fn full_tank_refuses_bucket() {
        let mut mixer = FluidMixer::new();
        mixer.blaze_juice.amount = TANK_CAPACITY - 500;
        let mut held = HeldItem::FilledBucket(Fluid::BlazeJuice);
        assert!(!mixer.interact(&mut held));
        assert_eq!(held, HeldItem::FilledBucket(Fluid::BlazeJuice));
    }

    #[test]
    fn fuelium_bucket_not_accepted() {
        let mut mixer = FluidMixer::new();
        let mut held = HeldItem::FilledBucket(Fluid::Fuelium);
        assert!(!mixer.interact(&mut held));
    }

    #[test]
    fn empty_bucket_drains_fuelium() {
        let mut mixer = FluidMixer::new();
        let mut held = HeldItem::Bucket;
        assert!(!mixer.interact(&mut held));

        mixer.fuelium.amount = 1500;
        assert!(mixer.interact(&mut held));
        assert_eq!(held, HeldItem::FilledBucket(Fluid::Fuelium));
        assert_eq!(mixer.fuelium.amount, 500);
    }

    #[test]
    fn no_fuel_no_mixing() {
        let mut mixer = filled_mixer();
        for _ in 0..100 {
            mixer.tick();
        }
        assert_eq!(mixer.fuelium.amount, 0);
        assert_eq!(mixer.extraction_progress, 0);
    }

    #[test]
    fn mixing_cycle() {
        let mut mixer = filled_mixer();
        mixer.fuel_items = 1;

        mixer.tick();
        assert_eq!(mixer.fuel_items, 0);
        assert_eq!(mixer.fuel_max_progress, FUEL_BURN_TICKS);
        assert_eq!(mixer.remaining_fuel, FUEL_BURN_TICKS - 1);
        assert_eq!(mixer.extraction_progress, 1);

        for _ in 1..EXTRACTION_TICKS {
            mixer.tick();
        }
        assert_eq!(mixer.fuelium.amount, MIX_OUTPUT);
        assert_eq!(mixer.blaze_juice.amount, 1000 - MIX_INPUT);
        assert_eq!(mixer.ender_sap.amount, 1000 - MIX_INPUT);
        assert_eq!(mixer.extraction_progress, 0);
    }

    #[test]
    fn fuel_runs_out() {
        let mut mixer = filled_mixer();
        mixer.fuel_items = 1;
        for _ in 0..FUEL_BURN_TICKS {
            mixer.tick();
        }
        assert!(!mixer.is_burning());
        let cycles = FUEL_BURN_TICKS / EXTRACTION_TICKS;
        assert_eq!(mixer.fuelium.amount, cycles * MIX_OUTPUT);

        mixer.tick();
        assert_eq!(mixer.fuelium.amount, cycles * MIX_OUTPUT);
    }

    #[test]
    fn item_data_drops_transient_state() {
        let mut mixer = filled_mixer();
        mixer.fuel_items = 3;
        mixer.remaining_fuel = 50;
        mixer.extraction_progress = 7;
        mixer.custom_name = Some("Refinery".into());

        let data = mixer.to_item_data();
        let restored = FluidMixer::from_item_data(&data);
        assert_eq!(restored.blaze_juice.amount, 1000);
        assert_eq!(restored.fuel_items, 3);
        assert_eq!(restored.remaining_fuel, 0);
        assert_eq!(restored.extraction_progress, 0);
        assert_eq!(restored.custom_name.as_deref(), Some("Refinery"));
    }
}
