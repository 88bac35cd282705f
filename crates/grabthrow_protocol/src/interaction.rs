//! View-ray focus detection.
//!
//! Every tick each controlled character casts a ray from its eye along its view
//! direction. The first object hit becomes the character's focus when it can be
//! picked up, and a can/cannot notification tells the presentation layer whether
//! it is close enough.

use bevy_math::Vec3;

use crate::config::InteractionConfig;
use crate::movement::view_direction;
use crate::protocol::ObjectId;

/// Eye position and view direction of a controlled character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerPose {
    pub eye: Vec3,
    pub forward: Vec3,
}

impl ViewerPose {
    pub fn from_angles(eye: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            eye,
            forward: view_direction(yaw, pitch),
        }
    }

    pub fn ray(&self, length: f32) -> TraceRay {
        TraceRay {
            start: self.eye,
            end: self.eye + self.forward * length,
            trace_complex: false,
        }
    }
}

/// A single nearest-hit visibility query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRay {
    pub start: Vec3,
    pub end: Vec3,
    pub trace_complex: bool,
}

/// World services the scanner and the pickup flow depend on.
pub trait WorldQuery {
    /// First object along the ray, if any.
    fn trace_nearest(&self, ray: &TraceRay) -> Option<ObjectId>;
    /// Whether the object currently exposes the "can be picked up" capability.
    fn is_interactable(&self, object: ObjectId) -> bool;
    fn position_of(&self, object: ObjectId) -> Option<Vec3>;
}

/// Affordance notifications consumed by the presentation layer.
pub trait InteractionFeedback {
    fn on_can_interact(&mut self);
    fn on_cannot_interact(&mut self);
}

/// Feedback sink for peers without a presentation layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl InteractionFeedback for NoFeedback {
    fn on_can_interact(&mut self) {}
    fn on_cannot_interact(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeClass {
    CanPick,
    CannotPick,
}

pub fn classify_range(actor: Vec3, object: Vec3, pickup_distance: f32) -> RangeClass {
    if actor.distance(object) <= pickup_distance {
        RangeClass::CanPick
    } else {
        RangeClass::CannotPick
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No controller, or already holding something. Nothing was queried.
    Suspended,
    /// The ray hit nothing. Focus keeps its previous value.
    Miss,
    /// The ray hit something that cannot be picked up.
    NotInteractable,
    /// The ray hit an interactable, which is now focused.
    Focused { object: ObjectId, range: RangeClass },
}

/// The interactable a character is currently aimed at.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FocusTracker {
    focused: Option<ObjectId>,
}

impl FocusTracker {
    pub fn get(&self) -> Option<ObjectId> {
        self.focused
    }

    pub fn is_empty(&self) -> bool {
        self.focused.is_none()
    }

    pub(crate) fn set(&mut self, object: ObjectId) {
        self.focused = Some(object);
    }

    pub(crate) fn clear(&mut self) {
        self.focused = None;
    }
}

/// Everything one scan reads about the scanning character.
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    /// `None` when the character has no controller this tick.
    pub pose: Option<ViewerPose>,
    pub actor_position: Vec3,
    pub holding: bool,
}

impl Scanner {
    /// Run one scan, updating `focus` and firing at most one notification.
    ///
    /// A miss leaves the previous focus in place.
    pub fn scan(
        &self,
        focus: &mut FocusTracker,
        config: &InteractionConfig,
        world: &impl WorldQuery,
        feedback: &mut impl InteractionFeedback,
    ) -> ScanOutcome {
        let Some(pose) = self.pose else {
            return ScanOutcome::Suspended;
        };
        if self.holding {
            return ScanOutcome::Suspended;
        }

        let Some(hit) = world.trace_nearest(&pose.ray(config.focus_distance)) else {
            return ScanOutcome::Miss;
        };

        let outcome = classify_hit(
            hit,
            self.actor_position,
            self.holding,
            config,
            world,
            feedback,
        );
        if let ScanOutcome::Focused { object, .. } = outcome {
            focus.set(object);
        }
        outcome
    }
}

/// Classify a hit object and fire the matching notification.
///
/// A non-interactable hit while holding something stays silent.
pub fn classify_hit(
    hit: ObjectId,
    actor_position: Vec3,
    holding: bool,
    config: &InteractionConfig,
    world: &impl WorldQuery,
    feedback: &mut impl InteractionFeedback,
) -> ScanOutcome {
    if !world.is_interactable(hit) {
        if !holding {
            feedback.on_cannot_interact();
        }
        return ScanOutcome::NotInteractable;
    }

    let Some(position) = world.position_of(hit) else {
        return ScanOutcome::NotInteractable;
    };

    let range = classify_range(actor_position, position, config.pickup_distance);
    match range {
        RangeClass::CanPick => feedback.on_can_interact(),
        RangeClass::CannotPick => feedback.on_cannot_interact(),
    }
    ScanOutcome::Focused { object: hit, range }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Fixed-answer world: the trace always reports `hit`.
    #[derive(Default)]
    pub(crate) struct FakeWorld {
        pub hit: Option<ObjectId>,
        pub interactable: HashMap<ObjectId, Vec3>,
        pub props: HashMap<ObjectId, Vec3>,
        pub traces: std::cell::Cell<u32>,
    }

    impl WorldQuery for FakeWorld {
        fn trace_nearest(&self, _ray: &TraceRay) -> Option<ObjectId> {
            self.traces.set(self.traces.get() + 1);
            self.hit
        }

        fn is_interactable(&self, object: ObjectId) -> bool {
            self.interactable.contains_key(&object)
        }

        fn position_of(&self, object: ObjectId) -> Option<Vec3> {
            self.interactable
                .get(&object)
                .or_else(|| self.props.get(&object))
                .copied()
        }
    }

    #[derive(Debug, Default, PartialEq, Eq)]
    pub(crate) struct CountingFeedback {
        pub can: u32,
        pub cannot: u32,
    }

    impl InteractionFeedback for CountingFeedback {
        fn on_can_interact(&mut self) {
            self.can += 1;
        }
        fn on_cannot_interact(&mut self) {
            self.cannot += 1;
        }
    }

    fn scanner(holding: bool) -> Scanner {
        Scanner {
            pose: Some(ViewerPose::from_angles(Vec3::new(0.0, 64.0, 0.0), 0.0, 0.0)),
            actor_position: Vec3::ZERO,
            holding,
        }
    }

    #[test]
    fn interactable_in_range_is_focused_with_can_pick() {
        let mut world = FakeWorld {
            hit: Some(1),
            ..Default::default()
        };
        world.interactable.insert(1, Vec3::new(0.0, 0.0, -150.0));
        let mut focus = FocusTracker::default();
        let mut feedback = CountingFeedback::default();

        let config = InteractionConfig::default();
        let outcome = scanner(false).scan(&mut focus, &config, &world, &mut feedback);

        assert_eq!(
            outcome,
            ScanOutcome::Focused {
                object: 1,
                range: RangeClass::CanPick
            }
        );
        assert_eq!(focus.get(), Some(1));
        assert_eq!(feedback, CountingFeedback { can: 1, cannot: 0 });
    }

    #[test]
    fn non_interactable_hit_keeps_focus_and_fires_cannot_pick() {
        let mut world = FakeWorld {
            hit: Some(2),
            ..Default::default()
        };
        world.props.insert(2, Vec3::new(0.0, 0.0, -50.0));
        let mut focus = FocusTracker::default();
        focus.set(9);
        let mut feedback = CountingFeedback::default();

        let config = InteractionConfig::default();
        let outcome = scanner(false).scan(&mut focus, &config, &world, &mut feedback);

        assert_eq!(outcome, ScanOutcome::NotInteractable);
        assert_eq!(focus.get(), Some(9));
        assert_eq!(feedback, CountingFeedback { can: 0, cannot: 1 });
    }

    #[test]
    fn non_interactable_hit_while_holding_is_silent() {
        let world = FakeWorld::default();
        let mut feedback = CountingFeedback::default();
        let outcome = classify_hit(
            2,
            Vec3::ZERO,
            true,
            &InteractionConfig::default(),
            &world,
            &mut feedback,
        );
        assert_eq!(outcome, ScanOutcome::NotInteractable);
        assert_eq!(feedback, CountingFeedback::default());
    }

    #[test]
    fn holding_suspends_the_query() {
        let mut world = FakeWorld {
            hit: Some(1),
            ..Default::default()
        };
        world.interactable.insert(1, Vec3::new(0.0, 0.0, -100.0));
        let mut focus = FocusTracker::default();
        let mut feedback = CountingFeedback::default();

        let config = InteractionConfig::default();
        let outcome = scanner(true).scan(&mut focus, &config, &world, &mut feedback);

        assert_eq!(outcome, ScanOutcome::Suspended);
        assert_eq!(world.traces.get(), 0);
        assert!(focus.is_empty());
        assert_eq!(feedback, CountingFeedback::default());
    }

    #[test]
    fn missing_controller_leaves_focus_untouched() {
        let world = FakeWorld::default();
        let mut focus = FocusTracker::default();
        focus.set(4);
        let mut feedback = CountingFeedback::default();
        let scan = Scanner {
            pose: None,
            ..scanner(false)
        };

        let outcome = scan.scan(&mut focus, &InteractionConfig::default(), &world, &mut feedback);

        assert_eq!(outcome, ScanOutcome::Suspended);
        assert_eq!(focus.get(), Some(4));
        assert_eq!(world.traces.get(), 0);
    }

    #[test]
    fn focus_only_ever_holds_interactables() {
        let mut world = FakeWorld::default();
        world.interactable.insert(1, Vec3::new(0.0, 0.0, -300.0));
        world.props.insert(2, Vec3::new(0.0, 0.0, -100.0));
        let mut focus = FocusTracker::default();
        let mut feedback = CountingFeedback::default();
        let config = InteractionConfig::default();

        for hit in [Some(2), None, Some(1), Some(2), None, Some(3)] {
            world.hit = hit;
            scanner(false).scan(&mut focus, &config, &world, &mut feedback);
            if let Some(focused) = focus.get() {
                assert!(world.is_interactable(focused));
            }
        }
        assert_eq!(focus.get(), Some(1));
    }
}
