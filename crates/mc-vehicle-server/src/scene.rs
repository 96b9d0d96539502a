//! Builds the startup scene described by `[[spawn]]` entries.

use std::collections::{HashMap, HashSet};

use mc_vehicle_game::GameWorld;
use tracing::info;

use crate::config::{ConfigError, SpawnEntry};

/// A spawned scene entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    pub unique_id: i64,
    pub runtime_id: u64,
    pub is_player: bool,
}

/// Spawn every entry, then apply the `tow` couplings.
pub fn spawn_scene(
    world: &mut GameWorld,
    entries: &[SpawnEntry],
) -> Result<HashMap<String, Spawned>, ConfigError> {
    let mut names = HashSet::new();
    if let Some(dup) = entries.iter().find(|e| !names.insert(e.name.as_str())) {
        return Err(ConfigError::DuplicateSpawnName(dup.name.clone()));
    }

    let mut spawned = HashMap::new();

    for entry in entries {
        let [x, y, z] = entry.position;
        let entity = if entry.kind == "player" {
            let (unique_id, runtime_id) = world.spawn_player((x, y, z));
            Spawned {
                unique_id,
                runtime_id,
                is_player: true,
            }
        } else {
            let (unique_id, runtime_id) = world.spawn_vehicle(&entry.kind, x, y, z, entry.yaw)?;
            Spawned {
                unique_id,
                runtime_id,
                is_player: false,
            }
        };
        info!(name = %entry.name, kind = %entry.kind, runtime_id = entity.runtime_id, "spawned");
        spawned.insert(entry.name.clone(), entity);
    }

    for entry in entries {
        let Some(target) = &entry.tow else {
            continue;
        };
        let puller = spawned
            .get(target)
            .copied()
            .ok_or_else(|| ConfigError::UnknownTowTarget {
                entity: entry.name.clone(),
                target: target.clone(),
            })?;
        let trailer = spawned[&entry.name].runtime_id;
        if puller.is_player {
            world.hitch_to_player(puller.unique_id, trailer)?;
        } else {
            world.couple_trailer(puller.runtime_id, trailer)?;
        }
        info!(trailer = %entry.name, puller = %target, "coupled");
    }

    Ok(spawned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_vehicle_game::VehicleError;

    fn entry(name: &str, kind: &str, position: [f32; 3], tow: Option<&str>) -> SpawnEntry {
        SpawnEntry {
            name: name.into(),
            kind: kind.into(),
            position,
            yaw: 0.0,
            tow: tow.map(Into::into),
        }
    }

    #[test]
    fn scene_couples_trailers() {
        let mut world = GameWorld::new(1);
        let entries = vec![
            entry("steve", "player", [5.0, 4.0, 5.0], None),
            entry("quad", "vehicle:atv", [0.0, 4.0, 0.0], None),
            entry("cart", "vehicle:trailer", [0.0, 4.0, -2.0], Some("quad")),
            entry("handcart", "vehicle:storage_trailer", [5.0, 4.0, 3.0], Some("steve")),
        ];
        let spawned = spawn_scene(&mut world, &entries).unwrap();
        assert_eq!(spawned.len(), 4);

        let quad = spawned["quad"].runtime_id;
        let steve = spawned["steve"].runtime_id;
        assert_eq!(world.pulling_entity(spawned["cart"].runtime_id), Some(quad));
        assert_eq!(world.pulling_entity(spawned["handcart"].runtime_id), Some(steve));
    }

    #[test]
    fn unknown_tow_target() {
        let mut world = GameWorld::new(1);
        let entries = vec![entry("cart", "vehicle:trailer", [0.0, 4.0, 0.0], Some("ghost"))];
        assert!(matches!(
            spawn_scene(&mut world, &entries),
            Err(ConfigError::UnknownTowTarget { .. })
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut world = GameWorld::new(1);
        let entries = vec![
            entry("quad", "vehicle:atv", [0.0, 4.0, 0.0], None),
            entry("quad", "vehicle:speed_boat", [9.0, 4.0, 0.0], None),
            entry("cart", "vehicle:trailer", [0.0, 4.0, -2.0], Some("quad")),
        ];
        assert!(matches!(
            spawn_scene(&mut world, &entries),
            Err(ConfigError::DuplicateSpawnName(name)) if name == "quad"
        ));
        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn unknown_vehicle_kind() {
        let mut world = GameWorld::new(1);
        let entries = vec![entry("blimp", "vehicle:blimp", [0.0, 4.0, 0.0], None)];
        assert!(matches!(
            spawn_scene(&mut world, &entries),
            Err(ConfigError::Vehicle(VehicleError::UnknownVehicleType(_)))
        ));
    }
}
