use bevy_math::{Quat, Vec3};

use crate::config::InteractionConfig;
use crate::interaction::{
    FocusTracker, InteractionFeedback, ScanOutcome, Scanner, ViewerPose, WorldQuery,
};
use crate::movement::{self, CAPSULE_HALF_HEIGHT, EYE_HEIGHT, Motion, MovementInput};
use crate::possession::{
    self, InteractableCallbacks, PickupOutcome, Possession, PresentationHooks,
};
use crate::protocol::{CharacterId, ObjectId};
use crate::world::HAND_OFFSET;

/// One player character: its pose, its focus, and what it holds.
#[derive(Debug, Clone)]
pub struct CharacterState {
    pub id: CharacterId,
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub grounded: bool,
    /// Whether a player currently controls this character.
    pub controlled: bool,
    pub focus: FocusTracker,
    pub possession: Possession,
}

impl CharacterState {
    pub fn new(id: CharacterId, name: impl Into<String>, feet: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            position: Vec3::new(feet.x, feet.y.max(0.0) + CAPSULE_HALF_HEIGHT, feet.z),
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            grounded: true,
            controlled: false,
            focus: FocusTracker::default(),
            possession: Possession::default(),
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::Y * EYE_HEIGHT
    }

    /// Eye and view direction, absent without a controller.
    pub fn viewer_pose(&self) -> Option<ViewerPose> {
        self.controlled
            .then(|| ViewerPose::from_angles(self.eye(), self.yaw, self.pitch))
    }

    /// Where a carried object sits.
    pub fn hand_position(&self) -> Vec3 {
        self.position + Quat::from_rotation_y(self.yaw) * HAND_OFFSET
    }

    pub fn motion(&self) -> Motion {
        Motion {
            position: self.position,
            velocity: self.velocity,
            grounded: self.grounded,
        }
    }

    pub fn apply_movement(&mut self, input: &MovementInput) {
        self.yaw = input.yaw;
        self.pitch = movement::clamp_pitch(input.pitch);
        let motion = movement::step_movement(self.motion(), input);
        self.position = motion.position;
        self.velocity = motion.velocity;
        self.grounded = motion.grounded;
    }

    /// Per-tick focus scan.
    pub fn scan(
        &mut self,
        config: &InteractionConfig,
        world: &impl WorldQuery,
        feedback: &mut impl InteractionFeedback,
    ) -> ScanOutcome {
        let scanner = Scanner {
            pose: self.viewer_pose(),
            actor_position: self.position,
            holding: self.possession.is_holding(),
        };
        scanner.scan(&mut self.focus, config, world, feedback)
    }

    /// Authority-side pickup of the focused object.
    pub fn authorize_pickup<H>(
        &mut self,
        config: &InteractionConfig,
        world: &impl WorldQuery,
        hooks: &mut H,
    ) -> PickupOutcome
    where
        H: InteractableCallbacks + PresentationHooks,
    {
        possession::authorize_pickup(
            self.id,
            self.position,
            &mut self.focus,
            &mut self.possession,
            config,
            world,
            hooks,
        )
    }

    /// Observer-side application of a granted pickup.
    pub fn mirror_pickup<H>(&mut self, object: ObjectId, hooks: &mut H)
    where
        H: InteractableCallbacks + PresentationHooks,
    {
        possession::mirror_pickup(self.id, object, &mut self.focus, &mut self.possession, hooks);
    }

    pub fn throw_held<H>(&mut self, hooks: &mut H) -> Option<ObjectId>
    where
        H: InteractableCallbacks + PresentationHooks,
    {
        possession::throw_held(self.id, &mut self.possession, hooks)
    }
}
