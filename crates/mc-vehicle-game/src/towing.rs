//! Tow-follow kinematics for trailers.
//!
//! A trailer does not ride rigidly behind its towing entity. Each tick it turns
//! to face the towing entity's tow bar and is then pulled so that its own hitch
//! lands on that tow bar.
//!
//! Yaw convention: yaw 0 faces +Z, yaw 90 faces -X (degrees, clockwise seen
//! from above).

/// Size of one model pixel in blocks.
pub const PIXEL: f32 = 0.0625;

/// Tow-bar geometry of a towing vehicle.
#[derive(Debug, Clone, Copy)]
pub struct TowBarGeometry {
    /// Local tow-bar offset in blocks.
    pub offset: (f32, f32, f32),
    /// Body Z offset added to `offset.2`.
    pub body_offset_z: f32,
    /// Extra steering yaw of land vehicles (0 for everything else).
    pub additional_yaw: f32,
}

/// What a trailer needs to know about the entity towing it.
#[derive(Debug, Clone, Copy)]
pub struct TowAnchor {
    pub position: (f32, f32, f32),
    pub yaw: f32,
    /// `None` for players and vehicles without a tow bar.
    pub tow_bar: Option<TowBarGeometry>,
}

/// Result of one follow step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowStep {
    /// New trailer yaw in degrees.
    pub yaw: f32,
    /// Previous yaw, shifted by whole turns so interpolation takes the short way.
    pub prev_yaw: f32,
    /// Horizontal velocity `(x, z)` that moves the hitch onto the tow bar.
    pub velocity: (f32, f32),
}

/// Rotate a vector about the Y axis by `angle` radians.
pub fn rotate_yaw(v: (f32, f32, f32), angle: f32) -> (f32, f32, f32) {
    let (sin, cos) = angle.sin_cos();
    (v.0 * cos + v.2 * sin, v.1, v.2 * cos - v.0 * sin)
}

/// World-space point where the trailer couples to its towing entity.
pub fn tow_bar_point(anchor: &TowAnchor) -> (f32, f32, f32) {
    let base = anchor.position;
    match anchor.tow_bar {
        Some(bar) => {
            let local = (bar.offset.0, bar.offset.1, bar.offset.2 + bar.body_offset_z);
            let angle = (-anchor.yaw + bar.additional_yaw).to_radians();
            let r = rotate_yaw(local, angle);
            (base.0 + r.0, base.1 + r.1, base.2 + r.2)
        }
        None => base,
    }
}

/// Yaw (degrees) of an entity at `from` facing `to`.
pub fn heading_towards(from: (f32, f32, f32), to: (f32, f32, f32), heading_offset: f32) -> f32 {
    (to.2 - from.2).atan2(to.0 - from.0).to_degrees() - heading_offset
}

/// Shift `prev_yaw` by whole turns until `prev_yaw - yaw` is in `[-180, 180)`.
pub fn wrap_previous_yaw(prev_yaw: f32, yaw: f32) -> f32 {
    let mut prev = prev_yaw;
    while prev - yaw < -180.0 {
        prev += 360.0;
    }
    while prev - yaw >= 180.0 {
        prev -= 360.0;
    }
    prev
}

/// Where the trailer origin must be for its hitch to sit on `tow_bar`.
pub fn hitch_point(tow_bar: (f32, f32, f32), yaw: f32, hitch_offset: f32) -> (f32, f32, f32) {
    let r = rotate_yaw((0.0, 0.0, hitch_offset * PIXEL), (-yaw).to_radians());
    (tow_bar.0 + r.0, tow_bar.1 + r.1, tow_bar.2 + r.2)
}

/// Compute the trailer's heading and horizontal velocity for this tick.
pub fn follow_step(
    position: (f32, f32, f32),
    prev_yaw: f32,
    anchor: &TowAnchor,
    hitch_offset: f32,
    heading_offset: f32,
) -> FollowStep {
    let bar = tow_bar_point(anchor);
    let yaw = heading_towards(position, bar, heading_offset);
    let prev_yaw = wrap_previous_yaw(prev_yaw, yaw);
    let hitch = hitch_point(bar, yaw, hitch_offset);
    FollowStep {
        yaw,
        prev_yaw,
        velocity: (hitch.0 - position.0, hitch.2 - position.2),
    }
}

/// Damp the horizontal velocity of a free-standing trailer.
pub fn apply_friction(velocity: (f32, f32, f32), friction: f32) -> (f32, f32, f32) {
    (velocity.0 * friction, velocity.1, velocity.2 * friction)
}

/// Integrate one tick of motion against a flat ground plane.
///
/// Returns `(new_position, new_velocity, on_ground)`.
pub fn integrate(
    position: (f32, f32, f32),
    velocity: (f32, f32, f32),
    ground_level: f32,
) -> ((f32, f32, f32), (f32, f32, f32), bool) {
    let mut pos = (
        position.0 + velocity.0,
        position.1 + velocity.1,
        position.2 + velocity.2,
    );
    let mut vel = velocity;
    let on_ground = pos.1 <= ground_level;
    if on_ground {
        pos.1 = ground_level;
        vel.1 = 0.0;
    }
    (pos, vel, on_ground)
}

/// Wheel spin (degrees) for having travelled from `prev` to `current` in one tick.
///
/// Negative: wheels roll backwards relative to the model's forward axis.
pub fn wheel_spin(prev: (f32, f32, f32), current: (f32, f32, f32)) -> f32 {
    let dx = current.0 - prev.0;
    let dy = current.1 - prev.1;
    let dz = current.2 - prev.2;
    // blocks per second
    let speed = (dx * dx + dy * dy + dz * dz).sqrt() * 20.0;
    -90.0 * (speed / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn assert_vec(actual: (f32, f32, f32), expected: (f32, f32, f32)) {
        assert!(
            (actual.0 - expected.0).abs() < EPS
                && (actual.1 - expected.1).abs() < EPS
                && (actual.2 - expected.2).abs() < EPS,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn rotate_yaw_quarter_turn() {
        let r = rotate_yaw((0.0, 1.0, 1.0), std::f32::consts::FRAC_PI_2);
        assert_vec(r, (1.0, 1.0, 0.0));
    }

    #[test]
    fn player_anchor_is_its_position() {
        let anchor = TowAnchor {
            position: (10.0, 64.0, 10.0),
            yaw: 37.0,
            tow_bar: None,
        };
        assert_vec(tow_bar_point(&anchor), (10.0, 64.0, 10.0));
    }

    #[test]
    fn tow_bar_follows_vehicle_heading() {
        let mut anchor = TowAnchor {
            position: (0.0, 4.0, 0.0),
            yaw: 0.0,
            tow_bar: Some(TowBarGeometry {
                offset: (0.0, 0.0, -1.3),
                body_offset_z: 0.0,
                additional_yaw: 0.0,
            }),
        };
        // Facing +Z: the bar is behind, on -Z.
        assert_vec(tow_bar_point(&anchor), (0.0, 4.0, -1.3));

        // Facing -X: the bar is behind, on +X.
        anchor.yaw = 90.0;
        assert_vec(tow_bar_point(&anchor), (1.3, 4.0, 0.0));
    }

    #[test]
    fn tow_bar_includes_body_offset_and_steering() {
        let anchor = TowAnchor {
            position: (0.0, 4.0, 0.0),
            yaw: 90.0,
            tow_bar: Some(TowBarGeometry {
                offset: (0.0, 0.5, -1.0),
                body_offset_z: -0.5,
                additional_yaw: 90.0,
            }),
        };
        // -90 + 90 cancels out: unrotated bar.
        assert_vec(tow_bar_point(&anchor), (0.0, 4.5, -1.5));
    }

    #[test]
    fn heading_offset_applied() {
        let yaw = heading_towards((8.0, 64.0, 10.0), (10.0, 64.0, 10.0), 90.0);
        assert!((yaw + 90.0).abs() < EPS);
        let yaw = heading_towards((0.0, 0.0, 0.0), (0.0, 0.0, 5.0), 90.0);
        assert!(yaw.abs() < EPS);
    }

    #[test]
    fn wrap_previous_yaw_stays_in_half_turn() {
        for &(prev, yaw) in &[
            (170.0, -170.0),
            (-170.0, 170.0),
            (0.0, 0.0),
            (-270.0, 90.0),
            (90.0, -270.0),
            (180.0, 0.0),
            (-180.0, 0.0),
            (720.0, 0.0),
        ] {
            let wrapped = wrap_previous_yaw(prev, yaw);
            let delta = wrapped - yaw;
            assert!(
                (-180.0..180.0).contains(&delta),
                "prev {prev} yaw {yaw} -> delta {delta}"
            );
            // Only whole turns are added.
            let turns = (wrapped - prev) / 360.0;
            assert!((turns - turns.round()).abs() < EPS);
        }
    }

    #[test]
    fn wrap_previous_yaw_short_way() {
        assert!((wrap_previous_yaw(170.0, -170.0) - (-190.0)).abs() < EPS);
        assert!((wrap_previous_yaw(-170.0, 170.0) - 190.0).abs() < EPS);
        assert!((wrap_previous_yaw(10.0, 20.0) - 10.0).abs() < EPS);
    }

    #[test]
    fn follow_step_towards_player() {
        let anchor = TowAnchor {
            position: (10.0, 64.0, 10.0),
            yaw: 0.0,
            tow_bar: None,
        };
        // 14 pixel hitch: trailer origin settles 0.875 blocks behind the anchor.
        let step = follow_step((8.0, 64.0, 10.0), 0.0, &anchor, -14.0, 90.0);
        assert!((step.yaw + 90.0).abs() < EPS);
        assert!((step.prev_yaw - 0.0).abs() < EPS);
        assert!((step.velocity.0 - 1.125).abs() < EPS);
        assert!(step.velocity.1.abs() < EPS);
    }

    #[test]
    fn follow_step_at_rest_when_hitched() {
        let anchor = TowAnchor {
            position: (10.0, 64.0, 10.0),
            yaw: 0.0,
            tow_bar: None,
        };
        // Two-block hitch with the trailer exactly two blocks behind.
        let step = follow_step((8.0, 64.0, 10.0), -90.0, &anchor, -32.0, 90.0);
        assert!(step.velocity.0.abs() < EPS);
        assert!(step.velocity.1.abs() < EPS);
    }

    #[test]
    fn friction_is_horizontal_only() {
        let v = apply_friction((1.0, -0.08, -2.0), 0.75);
        assert_vec(v, (0.75, -0.08, -1.5));
    }

    #[test]
    fn integrate_lands_on_ground() {
        let (pos, vel, on_ground) = integrate((0.0, 4.05, 0.0), (0.5, -0.08, 0.0), 4.0);
        assert_vec(pos, (0.5, 4.0, 0.0));
        assert_vec(vel, (0.5, 0.0, 0.0));
        assert!(on_ground);

        let (pos, _, on_ground) = integrate((0.0, 10.0, 0.0), (0.0, -0.08, 0.0), 4.0);
        assert!((pos.1 - 9.92).abs() < EPS);
        assert!(!on_ground);
    }

    #[test]
    fn wheel_spin_proportional_to_distance() {
        assert!(wheel_spin((0.0, 0.0, 0.0), (0.0, 0.0, 0.0)).abs() < EPS);
        // 0.5 blocks/tick = 10 blocks/s -> -90 degrees.
        assert!((wheel_spin((0.0, 0.0, 0.0), (0.3, 0.0, 0.4)) + 90.0).abs() < EPS);
    }
}
