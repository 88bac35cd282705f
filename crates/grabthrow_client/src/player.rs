use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::prelude::*;

use grabthrow_protocol::movement::{
    BASE_LOOK_UP_RATE, BASE_TURN_RATE, MovementInput, clamp_pitch, rate_to_delta,
};
use grabthrow_protocol::protocol::{ClientMessage, SequenceNumber};

use crate::ClientTransportRes;
use crate::world::ClientWorld;

#[derive(Resource)]
pub struct InputSettings {
    pub mouse_sensitivity: f32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 0.003,
        }
    }
}

/// View angles and input numbering owned by the local player.
#[derive(Resource, Default)]
pub struct InputState {
    pub yaw: f32,
    pub pitch: f32,
    pub sequence: SequenceNumber,
}

impl InputState {
    /// Apply mouse motion (absolute) and arrow-key rates (scaled by the base rates).
    pub fn look(
        &mut self,
        mouse: Vec2,
        turn_rate: f32,
        look_up_rate: f32,
        sensitivity: f32,
        dt: f32,
    ) {
        self.yaw -= mouse.x * sensitivity;
        self.yaw -= rate_to_delta(turn_rate, BASE_TURN_RATE, dt);
        self.pitch -= mouse.y * sensitivity;
        self.pitch += rate_to_delta(look_up_rate, BASE_LOOK_UP_RATE, dt);
        self.pitch = clamp_pitch(self.pitch);
    }
}

fn axis(keys: &ButtonInput<KeyCode>, positive: KeyCode, negative: KeyCode) -> f32 {
    let mut value = 0.0;
    if keys.pressed(positive) {
        value += 1.0;
    }
    if keys.pressed(negative) {
        value -= 1.0;
    }
    value
}

/// Read bindings, predict locally, and forward input and requests to the server.
///
/// W/S and D/A drive the movement axes, the mouse or the arrow keys steer the
/// view, Space jumps, E picks up the focused object and Q throws.
pub fn client_handle_input(
    keys: Res<ButtonInput<KeyCode>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    settings: Res<InputSettings>,
    time: Res<Time>,
    transport: Res<ClientTransportRes>,
    mut state: ResMut<InputState>,
    mut world: ResMut<ClientWorld>,
) {
    let Some(local) = world.local_character() else {
        return;
    };
    let airborne = !local.grounded;
    let dt = time.delta_secs();

    let (old_yaw, old_pitch) = (state.yaw, state.pitch);
    state.look(
        mouse_motion.delta,
        axis(&keys, KeyCode::ArrowRight, KeyCode::ArrowLeft),
        axis(&keys, KeyCode::ArrowUp, KeyCode::ArrowDown),
        settings.mouse_sensitivity,
        dt,
    );

    let input = MovementInput {
        move_forward: axis(&keys, KeyCode::KeyW, KeyCode::KeyS),
        move_right: axis(&keys, KeyCode::KeyD, KeyCode::KeyA),
        jump: keys.pressed(KeyCode::Space),
        yaw: state.yaw,
        pitch: state.pitch,
        dt,
    };

    let has_input = input.move_forward != 0.0
        || input.move_right != 0.0
        || input.jump
        || state.yaw != old_yaw
        || state.pitch != old_pitch;

    // Only send input when something changed or the character is still moving.
    let moving = local.velocity != Vec3::ZERO;
    if has_input || airborne || moving {
        state.sequence += 1;
        transport.0.send(ClientMessage::InputCommand {
            sequence: state.sequence,
            dt: input.dt,
            yaw: input.yaw,
            pitch: input.pitch,
            move_forward: input.move_forward,
            move_right: input.move_right,
            jump: input.jump,
        });
        world.predict(&input);
    }

    if keys.just_pressed(KeyCode::KeyE) {
        transport.0.send(ClientMessage::RequestPickup);
    }
    if keys.just_pressed(KeyCode::KeyQ) {
        transport.0.send(ClientMessage::RequestThrow);
    }
}

#[cfg(test)]
mod tests {
    use grabthrow_protocol::movement::MAX_PITCH;

    use super::*;

    #[test]
    fn mouse_right_turns_right_and_up_looks_up() {
        let mut state = InputState::default();
        state.look(Vec2::new(100.0, -100.0), 0.0, 0.0, 0.003, 1.0 / 60.0);
        assert!(state.yaw < 0.0);
        assert!(state.pitch > 0.0);
    }

    #[test]
    fn rates_scale_with_frame_time() {
        let mut state = InputState::default();
        state.look(Vec2::ZERO, 1.0, 0.0, 0.003, 1.0);
        assert!((state.yaw + 45f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut state = InputState::default();
        state.look(Vec2::ZERO, 0.0, 1.0, 0.003, 10.0);
        assert_eq!(state.pitch, MAX_PITCH);
    }
}
