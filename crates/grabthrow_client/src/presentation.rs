use bevy::prelude::*;

use grabthrow_protocol::interaction::InteractionFeedback;
use grabthrow_protocol::possession::{
    CameraMode, InteractableCallbacks, Montage, PresentationHooks,
};
use grabthrow_protocol::protocol::{CharacterId, ObjectId};
use grabthrow_protocol::world::ObjectWorld;

use crate::events::{
    CameraModeChangedEvent, CanInteractEvent, CannotInteractEvent, CharacterJoinEvent,
    CharacterLeaveEvent, ItemPickedUpEvent, ItemThrownEvent, MontagePlayedEvent,
};

/// Something the presentation layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    CanInteract { character: CharacterId },
    CannotInteract { character: CharacterId },
    ItemPickedUp { character: CharacterId, object: ObjectId },
    ItemThrown { character: CharacterId, object: ObjectId },
    MontagePlayed { character: CharacterId, montage: Montage },
    CameraModeChanged { mode: CameraMode },
    CharacterJoined { character: CharacterId, name: String, position: Vec3 },
    CharacterLeft { character: CharacterId },
}

/// Events produced this tick, flushed to bevy events once per frame.
#[derive(Resource, Default)]
pub struct PresentationQueue {
    pub events: Vec<PresentationEvent>,
}

/// Affordance notifications for the local character's own scans.
pub(crate) struct LocalFeedback<'a> {
    pub character: CharacterId,
    pub events: &'a mut Vec<PresentationEvent>,
}

impl InteractionFeedback for LocalFeedback<'_> {
    fn on_can_interact(&mut self) {
        self.events.push(PresentationEvent::CanInteract {
            character: self.character,
        });
    }

    fn on_cannot_interact(&mut self) {
        self.events.push(PresentationEvent::CannotInteract {
            character: self.character,
        });
    }
}

/// Hooks used when mirroring a possession change broadcast by the server.
///
/// Montages play for every character. UI notifications and the camera only
/// follow the local character.
pub(crate) struct MirrorHooks<'a> {
    pub character: CharacterId,
    pub local: bool,
    pub objects: &'a mut ObjectWorld,
    pub camera: &'a mut CameraMode,
    pub events: &'a mut Vec<PresentationEvent>,
}

impl InteractionFeedback for MirrorHooks<'_> {
    fn on_can_interact(&mut self) {
        if self.local {
            self.events.push(PresentationEvent::CanInteract {
                character: self.character,
            });
        }
    }

    fn on_cannot_interact(&mut self) {
        if self.local {
            self.events.push(PresentationEvent::CannotInteract {
                character: self.character,
            });
        }
    }
}

impl PresentationHooks for MirrorHooks<'_> {
    fn play_montage(&mut self, montage: Montage) {
        self.events.push(PresentationEvent::MontagePlayed {
            character: self.character,
            montage,
        });
    }

    fn set_camera_mode(&mut self, mode: CameraMode) {
        if !self.local {
            return;
        }
        *self.camera = mode;
        self.events.push(PresentationEvent::CameraModeChanged { mode });
    }
}

impl InteractableCallbacks for MirrorHooks<'_> {
    fn on_picked_up(&mut self, object: ObjectId, holder: CharacterId) {
        self.objects.attach(object, holder);
        self.events.push(PresentationEvent::ItemPickedUp {
            character: holder,
            object,
        });
        self.set_camera_mode(CameraMode::Throwable);
    }

    // The object itself is released by the `ObjectLaunched` that follows.
    fn launch(&mut self, object: ObjectId, instigator: CharacterId) {
        self.events.push(PresentationEvent::ItemThrown {
            character: instigator,
            object,
        });
    }
}

/// Turn queued presentation events into bevy events for the hook dispatchers.
#[allow(clippy::too_many_arguments)]
pub fn flush_presentation(
    mut queue: ResMut<PresentationQueue>,
    mut ev_can: EventWriter<CanInteractEvent>,
    mut ev_cannot: EventWriter<CannotInteractEvent>,
    mut ev_picked_up: EventWriter<ItemPickedUpEvent>,
    mut ev_thrown: EventWriter<ItemThrownEvent>,
    mut ev_montage: EventWriter<MontagePlayedEvent>,
    mut ev_camera: EventWriter<CameraModeChangedEvent>,
    mut ev_join: EventWriter<CharacterJoinEvent>,
    mut ev_leave: EventWriter<CharacterLeaveEvent>,
) {
    for event in queue.events.drain(..) {
        match event {
            PresentationEvent::CanInteract { character } => {
                ev_can.send(CanInteractEvent { character });
            }
            PresentationEvent::CannotInteract { character } => {
                ev_cannot.send(CannotInteractEvent { character });
            }
            PresentationEvent::ItemPickedUp { character, object } => {
                ev_picked_up.send(ItemPickedUpEvent { character, object });
            }
            PresentationEvent::ItemThrown { character, object } => {
                ev_thrown.send(ItemThrownEvent { character, object });
            }
            PresentationEvent::MontagePlayed { character, montage } => {
                ev_montage.send(MontagePlayedEvent { character, montage });
            }
            PresentationEvent::CameraModeChanged { mode } => {
                ev_camera.send(CameraModeChangedEvent { mode });
            }
            PresentationEvent::CharacterJoined {
                character,
                name,
                position,
            } => {
                ev_join.send(CharacterJoinEvent {
                    character_id: character,
                    name,
                    position,
                });
            }
            PresentationEvent::CharacterLeft { character } => {
                ev_leave.send(CharacterLeaveEvent {
                    character_id: character,
                });
            }
        }
    }
}
