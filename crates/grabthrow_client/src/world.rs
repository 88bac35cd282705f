use std::collections::HashMap;

use bevy::prelude::*;

use grabthrow_protocol::character::CharacterState;
use grabthrow_protocol::config::InteractionConfig;
use grabthrow_protocol::interaction::ScanOutcome;
use grabthrow_protocol::movement::MovementInput;
use grabthrow_protocol::possession::{CameraMode, Montage};
use grabthrow_protocol::protocol::{CharacterId, ObjectId, SequenceNumber, ServerMessage};
use grabthrow_protocol::world::{ObjectWorld, WorldObject};

use crate::presentation::{LocalFeedback, MirrorHooks, PresentationEvent};

/// Snap to the authoritative position beyond this prediction error.
const RECONCILE_THRESHOLD: f32 = 5.0;

/// Client-side mirror of the authority's world.
#[derive(Resource, Default)]
pub struct ClientWorld {
    pub player_name: String,
    pub local: Option<CharacterId>,
    pub config: InteractionConfig,
    pub camera: CameraMode,
    pub objects: ObjectWorld,
    pub characters: HashMap<CharacterId, CharacterState>,
    pub last_acknowledged: SequenceNumber,
    pub rejected: Option<String>,
}

impl ClientWorld {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            ..Default::default()
        }
    }

    pub fn local_character(&self) -> Option<&CharacterState> {
        self.local.and_then(|id| self.characters.get(&id))
    }

    /// Apply one server message, queueing whatever the presentation should show.
    pub fn apply(&mut self, msg: ServerMessage, out: &mut Vec<PresentationEvent>) {
        match msg {
            ServerMessage::ConnectAccepted {
                character_id,
                position,
                config,
            } => {
                let mut character =
                    CharacterState::new(character_id, self.player_name.clone(), Vec3::ZERO);
                character.position = position;
                character.controlled = true;
                self.characters.insert(character_id, character);
                self.local = Some(character_id);
                self.config = config;
                info!("Connected to server as character {}", character_id);
            }

            ServerMessage::ConnectRejected { reason } => {
                error!("Connection rejected: {}", reason);
                self.rejected = Some(reason);
            }

            ServerMessage::CharacterJoined {
                character_id,
                name,
                position,
            } => {
                if Some(character_id) == self.local {
                    return;
                }
                let mut character = CharacterState::new(character_id, name.clone(), Vec3::ZERO);
                character.position = position;
                self.characters.insert(character_id, character);
                out.push(PresentationEvent::CharacterJoined {
                    character: character_id,
                    name,
                    position,
                });
            }

            ServerMessage::CharacterLeft { character_id } => {
                if self.characters.remove(&character_id).is_some() {
                    out.push(PresentationEvent::CharacterLeft {
                        character: character_id,
                    });
                }
            }

            ServerMessage::CharacterPositionUpdate {
                character_id,
                position,
                yaw,
                pitch,
            } => {
                if Some(character_id) == self.local {
                    return;
                }
                if let Some(character) = self.characters.get_mut(&character_id) {
                    character.position = position;
                    character.yaw = yaw;
                    character.pitch = pitch;
                }
            }

            ServerMessage::CharacterStateUpdate {
                last_processed_input,
                position,
                velocity,
                grounded,
            } => {
                self.last_acknowledged = last_processed_input;
                let Some(character) = self.local.and_then(|id| self.characters.get_mut(&id))
                else {
                    return;
                };
                if character.position.distance(position) > RECONCILE_THRESHOLD {
                    character.position = position;
                }
                character.velocity = velocity;
                character.grounded = grounded;
            }

            ServerMessage::ObjectSpawned {
                id,
                kind,
                position,
                radius,
            } => {
                self.objects.insert(id, WorldObject::new(kind, position, radius));
            }

            ServerMessage::ObjectMoved { id, position } => {
                if let Some(object) = self.objects.get_mut(id) {
                    object.position = position;
                }
            }

            ServerMessage::ObjectLaunched {
                id,
                position,
                velocity,
                ..
            } => {
                self.objects.release(id, position, velocity);
            }

            ServerMessage::ObjectDropped { id, position } => {
                self.objects.release(id, position, Vec3::ZERO);
            }

            ServerMessage::PossessionChanged { character_id, held } => {
                self.apply_possession(character_id, held, out);
            }

            ServerMessage::ThrowAnimation { character_id } => {
                let holding = self
                    .characters
                    .get(&character_id)
                    .is_some_and(|c| c.possession.is_holding());
                if holding {
                    out.push(PresentationEvent::MontagePlayed {
                        character: character_id,
                        montage: Montage::ThrowItem,
                    });
                }
            }
        }
    }

    fn apply_possession(
        &mut self,
        character_id: CharacterId,
        held: Option<ObjectId>,
        out: &mut Vec<PresentationEvent>,
    ) {
        let ClientWorld {
            ref local,
            ref mut characters,
            ref mut objects,
            ref mut camera,
            ..
        } = *self;

        let Some(character) = characters.get_mut(&character_id) else {
            return;
        };
        let mut hooks = MirrorHooks {
            character: character_id,
            local: *local == Some(character_id),
            objects,
            camera,
            events: out,
        };
        match held {
            Some(object) => character.mirror_pickup(object, &mut hooks),
            None => {
                character.throw_held(&mut hooks);
            }
        }
    }

    /// Client-side focus scan for the local character only.
    pub fn scan_local(&mut self, out: &mut Vec<PresentationEvent>) -> Option<ScanOutcome> {
        let ClientWorld {
            ref local,
            ref mut characters,
            ref objects,
            ref config,
            ..
        } = *self;

        let id = (*local)?;
        let character = characters.get_mut(&id)?;
        let mut feedback = LocalFeedback {
            character: id,
            events: out,
        };
        Some(character.scan(config, objects, &mut feedback))
    }

    /// Predict the local character's movement ahead of the server.
    pub fn predict(&mut self, input: &MovementInput) {
        let Some(character) = self.local.and_then(|id| self.characters.get_mut(&id)) else {
            return;
        };
        character.apply_movement(input);
    }
}

#[cfg(test)]
mod tests {
    use grabthrow_protocol::world::ObjectKind;

    use super::*;

    const LOCAL: CharacterId = 1;
    const REMOTE: CharacterId = 2;
    const BALL: ObjectId = 7;

    /// Local character at the origin with a ball 150 units ahead of its eye.
    fn connected() -> ClientWorld {
        let mut world = ClientWorld::new("me");
        let mut out = Vec::new();
        world.apply(
            ServerMessage::ConnectAccepted {
                character_id: LOCAL,
                position: Vec3::new(0.0, 96.0, 0.0),
                config: InteractionConfig::default(),
            },
            &mut out,
        );
        world.apply(
            ServerMessage::CharacterJoined {
                character_id: REMOTE,
                name: "them".into(),
                position: Vec3::new(300.0, 96.0, 0.0),
            },
            &mut out,
        );
        world.apply(
            ServerMessage::ObjectSpawned {
                id: BALL,
                kind: ObjectKind::Throwable,
                position: Vec3::new(0.0, 160.0, -150.0),
                radius: 20.0,
            },
            &mut out,
        );
        world
    }

    #[test]
    fn connect_accepted_creates_a_controlled_local_character() {
        let world = connected();
        let local = world.local_character().unwrap();
        assert_eq!(local.id, LOCAL);
        assert_eq!(local.name, "me");
        assert!(local.controlled);
        assert!(!world.characters[&REMOTE].controlled);
    }

    #[test]
    fn local_scan_reports_affordance() {
        let mut world = connected();
        let mut out = Vec::new();

        let outcome = world.scan_local(&mut out);

        assert!(matches!(outcome, Some(ScanOutcome::Focused { object: BALL, .. })));
        assert_eq!(out, vec![PresentationEvent::CanInteract { character: LOCAL }]);
    }

    #[test]
    fn local_pickup_enters_throwable_camera() {
        let mut world = connected();
        let mut out = Vec::new();

        world.apply(
            ServerMessage::PossessionChanged {
                character_id: LOCAL,
                held: Some(BALL),
            },
            &mut out,
        );

        assert_eq!(
            out,
            vec![
                PresentationEvent::ItemPickedUp {
                    character: LOCAL,
                    object: BALL
                },
                PresentationEvent::CameraModeChanged {
                    mode: CameraMode::Throwable
                },
                PresentationEvent::MontagePlayed {
                    character: LOCAL,
                    montage: Montage::PickItem
                },
                PresentationEvent::CannotInteract { character: LOCAL },
            ]
        );
        assert_eq!(world.camera, CameraMode::Throwable);
        assert_eq!(world.objects.get(BALL).unwrap().holder, Some(LOCAL));
    }

    #[test]
    fn remote_pickup_plays_montage_without_local_ui() {
        let mut world = connected();
        let mut out = Vec::new();

        world.apply(
            ServerMessage::PossessionChanged {
                character_id: REMOTE,
                held: Some(BALL),
            },
            &mut out,
        );

        assert_eq!(
            out,
            vec![
                PresentationEvent::ItemPickedUp {
                    character: REMOTE,
                    object: BALL
                },
                PresentationEvent::MontagePlayed {
                    character: REMOTE,
                    montage: Montage::PickItem
                },
            ]
        );
        assert_eq!(world.camera, CameraMode::Default);
        assert_eq!(world.characters[&REMOTE].possession.held(), Some(BALL));
    }

    #[test]
    fn repeated_possession_broadcast_is_applied_once() {
        let mut world = connected();
        let mut out = Vec::new();
        let pickup = ServerMessage::PossessionChanged {
            character_id: LOCAL,
            held: Some(BALL),
        };

        world.apply(pickup.clone(), &mut out);
        let first = out.len();
        world.apply(pickup, &mut out);

        assert_eq!(out.len(), first);
    }

    #[test]
    fn throw_sequence_mirrors_the_authority() {
        let mut world = connected();
        let mut out = Vec::new();
        world.apply(
            ServerMessage::PossessionChanged {
                character_id: LOCAL,
                held: Some(BALL),
            },
            &mut out,
        );
        out.clear();

        world.apply(ServerMessage::ThrowAnimation { character_id: LOCAL }, &mut out);
        world.apply(
            ServerMessage::PossessionChanged {
                character_id: LOCAL,
                held: None,
            },
            &mut out,
        );
        world.apply(
            ServerMessage::ObjectLaunched {
                id: BALL,
                instigator: LOCAL,
                position: Vec3::new(0.0, 160.0, -70.0),
                velocity: Vec3::new(0.0, 250.0, -1500.0),
            },
            &mut out,
        );

        assert_eq!(
            out,
            vec![
                PresentationEvent::MontagePlayed {
                    character: LOCAL,
                    montage: Montage::ThrowItem
                },
                PresentationEvent::CameraModeChanged {
                    mode: CameraMode::Default
                },
                PresentationEvent::ItemThrown {
                    character: LOCAL,
                    object: BALL
                },
            ]
        );
        let ball = world.objects.get(BALL).unwrap();
        assert_eq!(ball.holder, None);
        assert_eq!(ball.velocity, Vec3::new(0.0, 250.0, -1500.0));
        assert!(!world.local_character().unwrap().possession.is_holding());
    }

    #[test]
    fn empty_handed_throw_animation_is_ignored() {
        let mut world = connected();
        let mut out = Vec::new();
        world.apply(ServerMessage::ThrowAnimation { character_id: LOCAL }, &mut out);
        world.apply(
            ServerMessage::PossessionChanged {
                character_id: LOCAL,
                held: None,
            },
            &mut out,
        );
        assert!(out.is_empty());
        assert_eq!(world.camera, CameraMode::Default);
    }

    #[test]
    fn state_update_snaps_only_past_the_threshold() {
        let mut world = connected();
        let mut out = Vec::new();
        let start = world.local_character().unwrap().position;

        world.apply(
            ServerMessage::CharacterStateUpdate {
                last_processed_input: 3,
                position: start + Vec3::new(1.0, 0.0, 0.0),
                velocity: Vec3::ZERO,
                grounded: true,
            },
            &mut out,
        );
        assert_eq!(world.local_character().unwrap().position, start);
        assert_eq!(world.last_acknowledged, 3);

        let far = start + Vec3::new(50.0, 0.0, 0.0);
        world.apply(
            ServerMessage::CharacterStateUpdate {
                last_processed_input: 4,
                position: far,
                velocity: Vec3::ZERO,
                grounded: true,
            },
            &mut out,
        );
        assert_eq!(world.local_character().unwrap().position, far);
    }

    #[test]
    fn leaving_character_is_removed() {
        let mut world = connected();
        let mut out = Vec::new();
        world.apply(ServerMessage::CharacterLeft { character_id: REMOTE }, &mut out);
        world.apply(ServerMessage::CharacterLeft { character_id: REMOTE }, &mut out);
        assert!(!world.characters.contains_key(&REMOTE));
        assert_eq!(out, vec![PresentationEvent::CharacterLeft { character: REMOTE }]);
    }
}
