use bevy_math::Vec3;

pub const CAPSULE_RADIUS: f32 = 42.0;
pub const CAPSULE_HALF_HEIGHT: f32 = 96.0;
/// Eye offset above the capsule centre.
pub const EYE_HEIGHT: f32 = 64.0;
pub const WALK_SPEED: f32 = 600.0;
pub const JUMP_VELOCITY: f32 = 600.0;
pub const GRAVITY: f32 = 980.0;
pub const AIR_CONTROL: f32 = 0.2;
/// Ground acceleration used to reach the walk speed.
pub const GROUND_ACCELERATION: f32 = 2048.0;
/// Degrees per second at full stick deflection.
pub const BASE_TURN_RATE: f32 = 45.0;
pub const BASE_LOOK_UP_RATE: f32 = 45.0;
pub const MAX_PITCH: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

/// Horizontal forward for a yaw angle (radians, 0 looks down -Z).
pub fn yaw_forward(yaw: f32) -> Vec3 {
    Vec3::new(-yaw.sin(), 0.0, -yaw.cos())
}

/// Horizontal right for a yaw angle.
pub fn yaw_right(yaw: f32) -> Vec3 {
    Vec3::new(yaw.cos(), 0.0, -yaw.sin())
}

/// Full view direction; positive pitch looks up.
pub fn view_direction(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        -yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
    .normalize_or_zero()
}

/// Angle delta for a rate-style axis (gamepad stick), in radians.
pub fn rate_to_delta(rate: f32, base_rate_degrees: f32, dt: f32) -> f32 {
    (rate * base_rate_degrees * dt).to_radians()
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    pitch.clamp(-MAX_PITCH, MAX_PITCH)
}

/// Input state for one frame, used by both client (prediction) and server (authoritative).
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementInput {
    pub move_forward: f32,
    pub move_right: f32,
    pub jump: bool,
    pub yaw: f32,
    pub pitch: f32,
    pub dt: f32,
}

impl MovementInput {
    /// Whether every numeric field is finite. A single NaN would poison the
    /// character's position and every distance measured from it.
    pub fn is_finite(&self) -> bool {
        [self.move_forward, self.move_right, self.yaw, self.pitch, self.dt]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Kinematic state advanced by [`step_movement`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
}

/// Advance a character by one frame of input.
///
/// Walking directions come from the yaw alone, so looking up or down never
/// slows the character. The capsule rests on a ground plane at y = 0.
pub fn step_movement(motion: Motion, input: &MovementInput) -> Motion {
    let dt = input.dt.max(0.0);
    let forward = yaw_forward(input.yaw);
    let right = yaw_right(input.yaw);

    let mut wish = forward * input.move_forward.clamp(-1.0, 1.0)
        + right * input.move_right.clamp(-1.0, 1.0);
    if wish.length_squared() > 1.0 {
        wish = wish.normalize();
    }
    let target = wish * WALK_SPEED;

    let mut velocity = motion.velocity;
    let mut grounded = motion.grounded;

    let accel = if grounded {
        GROUND_ACCELERATION
    } else {
        GROUND_ACCELERATION * AIR_CONTROL
    };
    let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
    let change = target - horizontal;
    let max_change = accel * dt;
    let applied = if change.length() > max_change {
        change.normalize_or_zero() * max_change
    } else {
        change
    };
    velocity.x += applied.x;
    velocity.z += applied.z;

    if input.jump && grounded {
        velocity.y = JUMP_VELOCITY;
        grounded = false;
    }
    if !grounded {
        velocity.y -= GRAVITY * dt;
    }

    let mut position = motion.position + velocity * dt;
    if position.y <= CAPSULE_HALF_HEIGHT {
        position.y = CAPSULE_HALF_HEIGHT;
        if velocity.y <= 0.0 {
            velocity.y = 0.0;
            grounded = true;
        }
    }

    Motion {
        position,
        velocity,
        grounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_input_is_detected() {
        let input = MovementInput {
            move_forward: 1.0,
            dt: 1.0 / 60.0,
            ..Default::default()
        };
        assert!(input.is_finite());
        assert!(!MovementInput { yaw: f32::NAN, ..input }.is_finite());
        assert!(!MovementInput { move_right: f32::INFINITY, ..input }.is_finite());
    }

    fn standing() -> Motion {
        Motion {
            position: Vec3::new(0.0, CAPSULE_HALF_HEIGHT, 0.0),
            velocity: Vec3::ZERO,
            grounded: true,
        }
    }

    #[test]
    fn forward_ignores_pitch() {
        let mut motion = standing();
        let input = MovementInput {
            move_forward: 1.0,
            pitch: 1.2,
            dt: 1.0 / 60.0,
            ..Default::default()
        };
        for _ in 0..120 {
            motion = step_movement(motion, &input);
        }
        assert!((motion.velocity.length() - WALK_SPEED).abs() < 1.0);
        assert!(motion.position.z < 0.0);
        assert_eq!(motion.position.y, CAPSULE_HALF_HEIGHT);
    }

    #[test]
    fn jump_leaves_and_returns_to_ground() {
        let mut motion = standing();
        let jump = MovementInput {
            jump: true,
            dt: 1.0 / 60.0,
            ..Default::default()
        };
        motion = step_movement(motion, &jump);
        assert!(!motion.grounded);
        assert!(motion.position.y > CAPSULE_HALF_HEIGHT);

        let idle = MovementInput {
            dt: 1.0 / 60.0,
            ..Default::default()
        };
        for _ in 0..120 {
            motion = step_movement(motion, &idle);
        }
        assert!(motion.grounded);
        assert_eq!(motion.position.y, CAPSULE_HALF_HEIGHT);
    }

    #[test]
    fn view_direction_matches_yaw_at_level_pitch() {
        let yaw = 0.7;
        let dir = view_direction(yaw, 0.0);
        assert!((dir - yaw_forward(yaw)).length() < 1e-5);
        assert!(view_direction(0.0, 0.5).y > 0.0);
    }

    #[test]
    fn turn_rate_scales_with_frame_time() {
        let delta = rate_to_delta(1.0, BASE_TURN_RATE, 2.0);
        assert!((delta - 90f32.to_radians()).abs() < 1e-5);
        assert_eq!(clamp_pitch(3.0), MAX_PITCH);
    }
}
