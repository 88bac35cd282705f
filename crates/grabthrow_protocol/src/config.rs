use serde::{Deserialize, Serialize};

pub const DEFAULT_FOCUS_DISTANCE: f32 = 500.0;
pub const DEFAULT_PICKUP_DISTANCE: f32 = 200.0;
pub const DEFAULT_THROW_SPEED: f32 = 1500.0;
pub const DEFAULT_THROW_COOLDOWN: f32 = 0.5;

/// Tunables shared by the authority and its clients.
///
/// The server sends its copy in `ConnectAccepted` so client-side scans classify
/// range the same way the authority will validate it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Length of the view ray used to find something to focus.
    pub focus_distance: f32,
    /// Maximum distance between a character and an object it may pick up.
    pub pickup_distance: f32,
    /// Launch speed of a thrown object.
    pub throw_speed: f32,
    /// Seconds between two throw activations of the same character.
    pub throw_cooldown: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            focus_distance: DEFAULT_FOCUS_DISTANCE,
            pickup_distance: DEFAULT_PICKUP_DISTANCE,
            throw_speed: DEFAULT_THROW_SPEED,
            throw_cooldown: DEFAULT_THROW_COOLDOWN,
        }
    }
}
