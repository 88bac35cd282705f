use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::InteractionConfig;
use crate::interaction::{FocusTracker, InteractionFeedback, WorldQuery};
use crate::protocol::{CharacterId, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Montage {
    PickItem,
    ThrowItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraMode {
    #[default]
    Default,
    /// Close over-the-shoulder camera used while aiming a held object.
    Throwable,
}

/// Reactions of the object itself.
pub trait InteractableCallbacks {
    /// Possession of `object` began.
    fn on_picked_up(&mut self, object: ObjectId, holder: CharacterId);
    /// The object leaves its holder's hand under its own launch behavior.
    fn launch(&mut self, object: ObjectId, instigator: CharacterId);
}

/// Presentation side effects. Fire-and-forget.
pub trait PresentationHooks: InteractionFeedback {
    fn play_montage(&mut self, montage: Montage);
    fn set_camera_mode(&mut self, mode: CameraMode);
}

/// The object a character holds. Replicated from the authority.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Possession {
    held: Option<ObjectId>,
}

impl Possession {
    pub fn held(&self) -> Option<ObjectId> {
        self.held
    }

    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickupOutcome {
    NothingFocused,
    /// The focused object is gone or is no longer pickable.
    Unavailable(ObjectId),
    OutOfRange { object: ObjectId, distance: f32 },
    PickedUp(ObjectId),
}

/// Authority half of the pickup flow.
///
/// Distance is measured again here from authority state, never taken from the
/// requesting client. Every rejection leaves focus and possession untouched.
pub fn authorize_pickup<H>(
    character: CharacterId,
    actor_position: Vec3,
    focus: &mut FocusTracker,
    possession: &mut Possession,
    config: &InteractionConfig,
    world: &impl WorldQuery,
    hooks: &mut H,
) -> PickupOutcome
where
    H: InteractableCallbacks + PresentationHooks,
{
    let Some(object) = focus.get() else {
        return PickupOutcome::NothingFocused;
    };
    if possession.is_holding() || !world.is_interactable(object) {
        return PickupOutcome::Unavailable(object);
    }
    let Some(position) = world.position_of(object) else {
        return PickupOutcome::Unavailable(object);
    };

    let distance = actor_position.distance(position);
    if distance.is_nan() || distance > config.pickup_distance {
        tracing::debug!(character, object, distance, "pickup out of range");
        return PickupOutcome::OutOfRange { object, distance };
    }

    take_possession(character, object, focus, possession, hooks);
    PickupOutcome::PickedUp(object)
}

/// Apply a possession that the authority already granted.
///
/// Observers run this on `PossessionChanged` without re-validating.
pub fn mirror_pickup<H>(
    character: CharacterId,
    object: ObjectId,
    focus: &mut FocusTracker,
    possession: &mut Possession,
    hooks: &mut H,
) where
    H: InteractableCallbacks + PresentationHooks,
{
    if possession.held == Some(object) {
        return;
    }
    take_possession(character, object, focus, possession, hooks);
}

fn take_possession<H>(
    character: CharacterId,
    object: ObjectId,
    focus: &mut FocusTracker,
    possession: &mut Possession,
    hooks: &mut H,
) where
    H: InteractableCallbacks + PresentationHooks,
{
    possession.held = Some(object);
    focus.clear();
    hooks.on_picked_up(object, character);
    hooks.play_montage(Montage::PickItem);
    // Nothing is focused any more, so close the affordance.
    hooks.on_cannot_interact();
}

/// Throw the held object, if any.
///
/// Returns the thrown object. With empty hands nothing happens at all,
/// not even the camera transition.
pub fn throw_held<H>(
    character: CharacterId,
    possession: &mut Possession,
    hooks: &mut H,
) -> Option<ObjectId>
where
    H: InteractableCallbacks + PresentationHooks,
{
    let object = possession.held?;
    hooks.set_camera_mode(CameraMode::Default);
    possession.held = None;
    hooks.launch(object, character);
    Some(object)
}
