use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::InteractionConfig;
use crate::world::ObjectKind;

pub type SequenceNumber = u32;
pub type CharacterId = u64;
pub type ObjectId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Request to join the server.
    Connect { player_name: String },
    /// Graceful disconnect.
    Disconnect,
    /// Player input for one tick/frame.
    InputCommand {
        sequence: SequenceNumber,
        dt: f32,
        yaw: f32,
        pitch: f32,
        move_forward: f32,
        move_right: f32,
        jump: bool,
    },
    /// Pick up whatever the authority sees this character focusing.
    RequestPickup,
    /// Activate the throw ability.
    RequestThrow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Connection accepted, assigns a character.
    ConnectAccepted {
        character_id: CharacterId,
        position: Vec3,
        config: InteractionConfig,
    },
    /// Connection rejected with reason.
    ConnectRejected { reason: String },
    /// A character entered the world (also sent for characters already present).
    CharacterJoined {
        character_id: CharacterId,
        name: String,
        position: Vec3,
    },
    /// A character left the world.
    CharacterLeft { character_id: CharacterId },
    /// Broadcast of a character's pose to other clients.
    CharacterPositionUpdate {
        character_id: CharacterId,
        position: Vec3,
        yaw: f32,
        pitch: f32,
    },
    /// Authoritative state of the receiving client's own character.
    CharacterStateUpdate {
        last_processed_input: SequenceNumber,
        position: Vec3,
        velocity: Vec3,
        grounded: bool,
    },
    /// An object exists in the world.
    ObjectSpawned {
        id: ObjectId,
        kind: ObjectKind,
        position: Vec3,
        radius: f32,
    },
    /// An object moved (flying, sliding, or carried).
    ObjectMoved { id: ObjectId, position: Vec3 },
    /// A held object was thrown.
    ObjectLaunched {
        id: ObjectId,
        instigator: CharacterId,
        position: Vec3,
        velocity: Vec3,
    },
    /// A held object was released without a throw (holder left).
    ObjectDropped { id: ObjectId, position: Vec3 },
    /// Replicated possession of a character.
    PossessionChanged {
        character_id: CharacterId,
        held: Option<ObjectId>,
    },
    /// The throw ability of a character was activated.
    ThrowAnimation { character_id: CharacterId },
}
