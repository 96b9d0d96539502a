//! Vehicle type definitions.
//!
//! Provides a registry of known vehicle and trailer types with their towing
//! geometry and hitbox dimensions.

/// How a vehicle moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleKind {
    Land,
    Water,
    Trailer,
}

/// Definition of a vehicle type.
#[derive(Debug, Clone)]
pub struct VehicleDefinition {
    /// Registry identifier, e.g. `"vehicle:atv"`.
    pub type_id: String,
    /// Display name, e.g. `"ATV"`.
    pub display_name: String,
    pub kind: VehicleKind,
    pub can_tow_trailer: bool,
    /// Local tow-bar offset in blocks, if the vehicle has one.
    pub tow_bar: Option<(f32, f32, f32)>,
    /// Z offset of the rendered body relative to the entity origin.
    pub body_offset_z: f32,
    /// Hitch offset in model pixels (trailers only).
    pub hitch_offset: f32,
    /// Bounding box width.
    pub bb_width: f32,
    /// Bounding box height.
    pub bb_height: f32,
}

/// Registry of supported vehicle types.
pub struct VehicleRegistry {
    vehicles: Vec<VehicleDefinition>,
}

impl Default for VehicleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleRegistry {
    /// Build the registry with all built-in vehicle types.
    pub fn new() -> Self {
        Self {
            vehicles: vec![
                VehicleDefinition {
                    type_id: "vehicle:atv".into(),
                    display_name: "ATV".into(),
                    kind: VehicleKind::Land,
                    can_tow_trailer: true,
                    tow_bar: Some((0.0, 0.0, -1.3)),
                    body_offset_z: 0.0,
                    hitch_offset: 0.0,
                    bb_width: 1.5,
                    bb_height: 1.0,
                },
                VehicleDefinition {
                    type_id: "vehicle:go_kart".into(),
                    display_name: "Go Kart".into(),
                    kind: VehicleKind::Land,
                    can_tow_trailer: false,
                    tow_bar: None,
                    body_offset_z: 0.0,
                    hitch_offset: 0.0,
                    bb_width: 1.5,
                    bb_height: 0.5,
                },
                VehicleDefinition {
                    type_id: "vehicle:speed_boat".into(),
                    display_name: "Speed Boat".into(),
                    kind: VehicleKind::Water,
                    can_tow_trailer: true,
                    tow_bar: Some((0.0, 0.0, -1.6)),
                    body_offset_z: 0.2,
                    hitch_offset: 0.0,
                    bb_width: 1.5,
                    bb_height: 1.0,
                },
                VehicleDefinition {
                    type_id: "vehicle:trailer".into(),
                    display_name: "Vehicle Trailer".into(),
                    kind: VehicleKind::Trailer,
                    can_tow_trailer: false,
                    tow_bar: None,
                    body_offset_z: 0.0,
                    hitch_offset: -14.0,
                    bb_width: 1.5,
                    bb_height: 1.5,
                },
                VehicleDefinition {
                    type_id: "vehicle:storage_trailer".into(),
                    display_name: "Storage Trailer".into(),
                    kind: VehicleKind::Trailer,
                    can_tow_trailer: false,
                    tow_bar: None,
                    body_offset_z: 0.0,
                    hitch_offset: -15.0,
                    bb_width: 1.5,
                    bb_height: 1.5,
                },
            ],
        }
    }

    /// Look up a vehicle definition by its type identifier.
    pub fn get(&self, type_id: &str) -> Option<&VehicleDefinition> {
        self.vehicles.iter().find(|v| v.type_id == type_id)
    }

    /// All known vehicle definitions.
    pub fn all(&self) -> &[VehicleDefinition] {
        &self.vehicles
    }

    /// Register an additional vehicle type.
    pub fn register_vehicle(&mut self, def: VehicleDefinition) {
        self.vehicles.push(def);
    }
}
