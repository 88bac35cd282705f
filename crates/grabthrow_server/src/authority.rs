//! Authoritative handling of client requests.
//!
//! Every mutation of possession happens here, then fans out to all clients.

use bevy::prelude::*;

use grabthrow_protocol::interaction::{InteractionFeedback, NoFeedback};
use grabthrow_protocol::movement::{CAPSULE_RADIUS, MovementInput, view_direction};
use grabthrow_protocol::possession::{
    CameraMode, InteractableCallbacks, Montage, PickupOutcome, PresentationHooks,
};
use grabthrow_protocol::protocol::{CharacterId, ClientMessage, ObjectId, ServerMessage};
use grabthrow_protocol::transport::ServerTransport;

use crate::ability::Ability;
use crate::world_session::WorldSession;

/// Longest frame a client may claim for one input command.
const MAX_INPUT_DT: f32 = 0.25;
/// Upward speed added to every throw so objects arc.
const THROW_LIFT: f32 = 250.0;

/// Side effects requested by the possession flows, applied after the flow
/// returns so the flow can borrow the object world immutably.
#[derive(Debug, Default)]
struct AuthorityEffects {
    picked_up: Vec<(ObjectId, CharacterId)>,
    launched: Vec<(ObjectId, CharacterId)>,
}

impl InteractionFeedback for AuthorityEffects {
    fn on_can_interact(&mut self) {}
    fn on_cannot_interact(&mut self) {}
}

impl PresentationHooks for AuthorityEffects {
    // The authority is headless; clients play montages from the broadcasts.
    fn play_montage(&mut self, _montage: Montage) {}
    fn set_camera_mode(&mut self, _mode: CameraMode) {}
}

impl InteractableCallbacks for AuthorityEffects {
    fn on_picked_up(&mut self, object: ObjectId, holder: CharacterId) {
        self.picked_up.push((object, holder));
    }

    fn launch(&mut self, object: ObjectId, instigator: CharacterId) {
        self.launched.push((object, instigator));
    }
}

impl WorldSession {
    pub fn handle_message(
        &mut self,
        client_id: u64,
        msg: ClientMessage,
        transport: &dyn ServerTransport,
        now: f64,
    ) {
        match msg {
            ClientMessage::Connect { player_name } => {
                self.handle_connect(client_id, player_name, transport)
            }
            ClientMessage::Disconnect => self.handle_disconnect(client_id, transport),
            ClientMessage::InputCommand {
                sequence,
                dt,
                yaw,
                pitch,
                move_forward,
                move_right,
                jump,
            } => {
                let input = MovementInput {
                    move_forward,
                    move_right,
                    jump,
                    yaw,
                    pitch,
                    dt: dt.clamp(0.0, MAX_INPUT_DT),
                };
                if !input.is_finite() {
                    warn!("Dropping non-finite input {} from client {}", sequence, client_id);
                    return;
                }
                self.handle_input(client_id, sequence, &input, transport);
            }
            ClientMessage::RequestPickup => self.handle_pickup_request(client_id, transport),
            ClientMessage::RequestThrow => self.handle_throw_request(client_id, transport, now),
        }
    }

    fn handle_connect(
        &mut self,
        client_id: u64,
        player_name: String,
        transport: &dyn ServerTransport,
    ) {
        if self.characters.contains_key(&client_id) {
            transport.send(
                client_id,
                ServerMessage::ConnectRejected {
                    reason: "Already connected".to_string(),
                },
            );
            return;
        }
        if self.characters.len() >= self.settings.max_players {
            transport.send(
                client_id,
                ServerMessage::ConnectRejected {
                    reason: "Server is full".to_string(),
                },
            );
            transport.disconnect(client_id);
            return;
        }

        let config = self.config;
        let position = self.add_character(client_id, player_name.clone()).position;

        transport.send(
            client_id,
            ServerMessage::ConnectAccepted {
                character_id: client_id,
                position,
                config,
            },
        );

        for (&id, object) in &self.objects.objects {
            transport.send(
                client_id,
                ServerMessage::ObjectSpawned {
                    id,
                    kind: object.kind,
                    position: object.position,
                    radius: object.radius,
                },
            );
        }

        for (&id, other) in &self.characters {
            if id == client_id {
                continue;
            }
            transport.send(
                client_id,
                ServerMessage::CharacterJoined {
                    character_id: id,
                    name: other.name.clone(),
                    position: other.position,
                },
            );
            if let Some(held) = other.possession.held() {
                transport.send(
                    client_id,
                    ServerMessage::PossessionChanged {
                        character_id: id,
                        held: Some(held),
                    },
                );
            }
        }

        transport.broadcast_except(
            client_id,
            ServerMessage::CharacterJoined {
                character_id: client_id,
                name: player_name.clone(),
                position,
            },
        );

        info!("Player '{}' (id={}) connected", player_name, client_id);
    }

    fn handle_disconnect(&mut self, client_id: u64, transport: &dyn ServerTransport) {
        let Some(character) = self.remove_character(client_id) else {
            return;
        };

        if let Some(object) = character.possession.held() {
            let position = character.hand_position();
            self.objects.release(object, position, Vec3::ZERO);
            transport.broadcast(ServerMessage::ObjectDropped {
                id: object,
                position,
            });
        }

        transport.broadcast_except(
            client_id,
            ServerMessage::CharacterLeft {
                character_id: client_id,
            },
        );

        info!("Player '{}' (id={}) disconnected", character.name, client_id);
    }

    fn handle_input(
        &mut self,
        client_id: u64,
        sequence: u32,
        input: &MovementInput,
        transport: &dyn ServerTransport,
    ) {
        let Some(character) = self.characters.get_mut(&client_id) else {
            return;
        };
        character.apply_movement(input);
        self.last_input.insert(client_id, sequence);

        transport.send(
            client_id,
            ServerMessage::CharacterStateUpdate {
                last_processed_input: sequence,
                position: character.position,
                velocity: character.velocity,
                grounded: character.grounded,
            },
        );
        transport.broadcast_except(
            client_id,
            ServerMessage::CharacterPositionUpdate {
                character_id: client_id,
                position: character.position,
                yaw: character.yaw,
                pitch: character.pitch,
            },
        );
    }

    fn handle_pickup_request(&mut self, client_id: u64, transport: &dyn ServerTransport) {
        let WorldSession {
            ref mut characters,
            ref mut objects,
            ref config,
            ..
        } = *self;

        let Some(character) = characters.get_mut(&client_id) else {
            return;
        };

        let mut effects = AuthorityEffects::default();
        let outcome = character.authorize_pickup(config, &*objects, &mut effects);
        let PickupOutcome::PickedUp(object) = outcome else {
            debug!("Pickup by {} rejected: {:?}", client_id, outcome);
            return;
        };

        let hand = character.hand_position();
        for (picked, holder) in effects.picked_up {
            objects.attach(picked, holder);
            if let Some(held) = objects.get_mut(picked) {
                held.position = hand;
            }
        }

        transport.broadcast(ServerMessage::PossessionChanged {
            character_id: client_id,
            held: Some(object),
        });
        info!("Character {} picked up object {}", client_id, object);
    }

    fn handle_throw_request(&mut self, client_id: u64, transport: &dyn ServerTransport, now: f64) {
        if !self.characters.contains_key(&client_id) {
            return;
        }
        if !self.gate.try_activate(client_id, Ability::Throw, now) {
            debug!("Throw by {} blocked by ability gate", client_id);
            return;
        }

        transport.broadcast(ServerMessage::ThrowAnimation {
            character_id: client_id,
        });

        let WorldSession {
            ref mut characters,
            ref mut objects,
            ref config,
            ..
        } = *self;

        let Some(character) = characters.get_mut(&client_id) else {
            return;
        };

        let mut effects = AuthorityEffects::default();
        let Some(thrown) = character.throw_held(&mut effects) else {
            return;
        };

        transport.broadcast(ServerMessage::PossessionChanged {
            character_id: client_id,
            held: None,
        });

        let forward = view_direction(character.yaw, character.pitch);
        for (object, instigator) in effects.launched {
            let clearance = CAPSULE_RADIUS + objects.get(object).map_or(0.0, |o| o.radius) + 1.0;
            let position = character.eye() + forward * clearance;
            let velocity = forward * config.throw_speed + Vec3::Y * THROW_LIFT;
            objects.release(object, position, velocity);
            transport.broadcast(ServerMessage::ObjectLaunched {
                id: object,
                instigator,
                position,
                velocity,
            });
        }

        info!("Character {} threw object {}", client_id, thrown);
    }

    /// Authoritative focus scan for every character.
    pub fn scan_focus(&mut self) {
        let WorldSession {
            ref mut characters,
            ref objects,
            ref config,
            ..
        } = *self;

        for character in characters.values_mut() {
            character.scan(config, objects, &mut NoFeedback);
        }
    }

    /// Move free objects and carried objects, broadcasting every change.
    pub fn simulate(&mut self, dt: f32, transport: &dyn ServerTransport) {
        let WorldSession {
            ref characters,
            ref mut objects,
            ..
        } = *self;

        for id in objects.step(dt) {
            if let Some(object) = objects.get(id) {
                transport.broadcast(ServerMessage::ObjectMoved {
                    id,
                    position: object.position,
                });
            }
        }

        for character in characters.values() {
            let Some(held) = character.possession.held() else {
                continue;
            };
            let hand = character.hand_position();
            let Some(object) = objects.get_mut(held) else {
                continue;
            };
            if object.position.distance_squared(hand) > 0.01 {
                object.position = hand;
                transport.broadcast(ServerMessage::ObjectMoved {
                    id: held,
                    position: hand,
                });
            }
        }
    }
}
