use std::collections::HashMap;

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use grabthrow_protocol::character::CharacterState;
use grabthrow_protocol::config::InteractionConfig;
use grabthrow_protocol::protocol::{CharacterId, ObjectId, SequenceNumber};
use grabthrow_protocol::world::{ObjectKind, ObjectWorld, WorldObject};

use crate::ability::{Ability, AbilityGate, CooldownGate};

/// Distance of player spawn points from the world origin.
const SPAWN_RING_RADIUS: f32 = 300.0;
/// Keep scattered objects clear of the spawn ring.
const SCATTER_INNER_RADIUS: f32 = 450.0;

/// World generation and admission limits.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub max_players: usize,
    pub throwables: u32,
    pub props: u32,
    pub spawn_radius: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            max_players: 8,
            throwables: 12,
            props: 6,
            spawn_radius: 1200.0,
        }
    }
}

/// Server-side world session containing all authoritative game state.
#[derive(Resource)]
pub struct WorldSession {
    pub name: String,
    pub seed: u64,
    pub tick: u64,
    pub config: InteractionConfig,
    pub settings: WorldSettings,
    pub objects: ObjectWorld,
    pub characters: HashMap<CharacterId, CharacterState>,
    pub last_input: HashMap<CharacterId, SequenceNumber>,
    pub gate: Box<dyn AbilityGate>,
    pub next_object_id: ObjectId,
}

impl WorldSession {
    /// Empty world with a cooldown gate built from `config`.
    pub fn empty(
        name: impl Into<String>,
        config: InteractionConfig,
        settings: WorldSettings,
    ) -> Self {
        let gate = CooldownGate::new().with_cooldown(Ability::Throw, config.throw_cooldown as f64);
        Self {
            name: name.into(),
            seed: 0,
            tick: 0,
            config,
            settings,
            objects: ObjectWorld::default(),
            characters: HashMap::new(),
            last_input: HashMap::new(),
            gate: Box::new(gate),
            next_object_id: 1,
        }
    }

    /// World with objects scattered deterministically from `seed`.
    pub fn generate(
        name: impl Into<String>,
        seed: u64,
        config: InteractionConfig,
        settings: WorldSettings,
    ) -> Self {
        let mut session = Self::empty(name, config, settings);
        session.seed = seed;

        let mut rng = StdRng::seed_from_u64(seed);
        let outer = session.settings.spawn_radius.max(SCATTER_INNER_RADIUS + 1.0);
        let layout = [
            (ObjectKind::Throwable, session.settings.throwables, 15.0..30.0),
            (ObjectKind::Prop, session.settings.props, 60.0..120.0),
        ];
        for (kind, count, radii) in layout {
            for _ in 0..count {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let distance = rng.gen_range(SCATTER_INNER_RADIUS..outer);
                let radius = rng.gen_range(radii.clone());
                let position = Vec3::new(angle.cos() * distance, radius, angle.sin() * distance);
                session.spawn_object(kind, position, radius);
            }
        }
        session
    }

    pub fn with_gate(mut self, gate: impl AbilityGate) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn spawn_object(&mut self, kind: ObjectKind, position: Vec3, radius: f32) -> ObjectId {
        let id = self.next_object_id;
        self.next_object_id += 1;
        self.objects.insert(id, WorldObject::new(kind, position, radius));
        id
    }

    /// Feet position for the next character to join.
    pub fn spawn_point(&self) -> Vec3 {
        let angle = self.characters.len() as f32 * 1.3;
        Vec3::new(
            angle.cos() * SPAWN_RING_RADIUS,
            0.0,
            angle.sin() * SPAWN_RING_RADIUS,
        )
    }

    pub fn add_character(
        &mut self,
        id: CharacterId,
        name: impl Into<String>,
    ) -> &mut CharacterState {
        let mut character = CharacterState::new(id, name, self.spawn_point());
        character.controlled = true;
        self.last_input.insert(id, 0);
        self.characters.entry(id).or_insert(character)
    }

    pub fn remove_character(&mut self, id: CharacterId) -> Option<CharacterState> {
        self.last_input.remove(&id);
        self.gate.forget(id);
        self.characters.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let config = InteractionConfig::default();
        let a = WorldSession::generate("a", 7, config, WorldSettings::default());
        let b = WorldSession::generate("b", 7, config, WorldSettings::default());
        assert_eq!(a.objects.objects.len(), 18);
        assert_eq!(a.objects.objects, b.objects.objects);
        let throwables = a
            .objects
            .objects
            .values()
            .filter(|o| o.kind == ObjectKind::Throwable)
            .count();
        assert_eq!(throwables, 12);
    }

    #[test]
    fn characters_spawn_controlled_on_the_ground() {
        let mut session =
            WorldSession::empty("w", InteractionConfig::default(), WorldSettings::default());
        let character = session.add_character(3, "p");
        assert!(character.controlled);
        assert!(character.grounded);
        assert!(character.viewer_pose().is_some());
    }
}
