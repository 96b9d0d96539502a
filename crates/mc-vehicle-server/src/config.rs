use mc_vehicle_game::{VehicleConfig, VehicleError};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate spawn entry name `{0}`")]
    DuplicateSpawnName(String),

    #[error("spawn entry `{entity}` tows unknown entity `{target}`")]
    UnknownTowTarget { entity: String, target: String },

    #[error("cannot build scene: {0}")]
    Vehicle(#[from] VehicleError),
}

#[derive(Debug, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub spawn: Vec<SpawnEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SimulationSection {
    /// Milliseconds between ticks. Default: 50 (20 TPS).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Stop after this many ticks. 0 = run until Ctrl+C.
    #[serde(default)]
    pub max_ticks: u64,
    /// Run as the authoritative side (couplings, friction, machines).
    #[serde(default = "default_authoritative")]
    pub authoritative: bool,
}

fn default_tick_ms() -> u64 {
    50
}

fn default_authoritative() -> bool {
    true
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            max_ticks: 0,
            authoritative: default_authoritative(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

/// An entity placed in the world at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnEntry {
    pub name: String,
    /// `"player"` or a vehicle type id such as `"vehicle:atv"`.
    pub kind: String,
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
    /// Name of the entity that tows this trailer.
    #[serde(default)]
    pub tow: Option<String>,
}

impl SimConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = SimConfig::parse(
            r#"
            [logging]
            level = "debug"
        "#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        // simulation section defaults when absent
        assert_eq!(config.simulation.tick_ms, 50);
        assert_eq!(config.simulation.max_ticks, 0);
        assert!(config.simulation.authoritative);
        // vehicle section defaults when absent
        assert!((config.vehicle.trailer_detach_threshold - 6.0).abs() < f32::EPSILON);
        assert!(config.spawn.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let config = SimConfig::parse(
            r#"
            [simulation]
            tick_ms = 10
            max_ticks = 200
            authoritative = false

            [logging]
            level = "info"

            [vehicle]
            trailer_detach_threshold = 8.0
            trailer_friction = 0.5

            [[spawn]]
            name = "quad"
            kind = "vehicle:atv"
            position = [0.0, 4.0, 0.0]
            yaw = 45.0

            [[spawn]]
            name = "cart"
            kind = "vehicle:trailer"
            position = [0.0, 4.0, -2.0]
            tow = "quad"
        "#,
        )
        .unwrap();
        assert_eq!(config.simulation.tick_ms, 10);
        assert_eq!(config.simulation.max_ticks, 200);
        assert!(!config.simulation.authoritative);
        assert!((config.vehicle.trailer_detach_threshold - 8.0).abs() < f32::EPSILON);
        assert!((config.vehicle.trailer_friction - 0.5).abs() < f32::EPSILON);
        assert!((config.vehicle.gravity - 0.08).abs() < f32::EPSILON);
        assert_eq!(config.spawn.len(), 2);
        assert_eq!(config.spawn[0].yaw, 45.0);
        assert_eq!(config.spawn[0].tow, None);
        assert_eq!(config.spawn[1].tow.as_deref(), Some("quad"));
    }

    #[test]
    fn missing_logging_is_error() {
        assert!(matches!(
            SimConfig::parse("[simulation]\ntick_ms = 50\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
