//! Tunable vehicle physics constants.

use bevy_ecs::prelude::*;
use serde::Deserialize;

/// Physics settings shared by every trailer. Loaded from the `[vehicle]`
/// section of the host configuration; any missing field takes its default.
#[derive(Resource, Debug, Clone, Deserialize)]
pub struct VehicleConfig {
    /// Maximum distance (blocks) between a trailer and its towing entity
    /// before the coupling breaks.
    #[serde(default = "default_trailer_detach_threshold")]
    pub trailer_detach_threshold: f32,
    /// Downward velocity added per tick (blocks/tick²).
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Horizontal velocity multiplier for an uncoupled trailer.
    #[serde(default = "default_trailer_friction")]
    pub trailer_friction: f32,
    /// Degrees subtracted from the hitch-to-tow-bar angle to get a model yaw.
    #[serde(default = "default_heading_offset")]
    pub heading_offset: f32,
    /// Height of the flat ground plane.
    #[serde(default = "default_ground_level")]
    pub ground_level: f32,
}

fn default_trailer_detach_threshold() -> f32 {
    6.0
}

fn default_gravity() -> f32 {
    0.08
}

fn default_trailer_friction() -> f32 {
    0.75
}

fn default_heading_offset() -> f32 {
    90.0
}

fn default_ground_level() -> f32 {
    4.0
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            trailer_detach_threshold: default_trailer_detach_threshold(),
            gravity: default_gravity(),
            trailer_friction: default_trailer_friction(),
            heading_offset: default_heading_offset(),
            ground_level: default_ground_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_defaults() {
        let config: VehicleConfig = toml::from_str("").unwrap();
        assert!((config.trailer_detach_threshold - 6.0).abs() < f32::EPSILON);
        assert!((config.gravity - 0.08).abs() < f32::EPSILON);
        assert!((config.trailer_friction - 0.75).abs() < f32::EPSILON);
        assert!((config.heading_offset - 90.0).abs() < f32::EPSILON);
        assert!((config.ground_level - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_override() {
        let config: VehicleConfig = toml::from_str(
            r#"
            trailer_detach_threshold = 10.0
            ground_level = 64.0
            "#,
        )
        .unwrap();
        assert!((config.trailer_detach_threshold - 10.0).abs() < f32::EPSILON);
        assert!((config.ground_level - 64.0).abs() < f32::EPSILON);
        assert!((config.trailer_friction - 0.75).abs() < f32::EPSILON);
    }
}
