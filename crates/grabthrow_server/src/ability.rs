use std::collections::HashMap;

use grabthrow_protocol::protocol::CharacterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ability {
    Throw,
}

/// Decides whether an ability may run right now.
///
/// Consulted by the authority before the server half of an activation.
pub trait AbilityGate: Send + Sync + 'static {
    fn try_activate(&mut self, character: CharacterId, ability: Ability, now: f64) -> bool;
    /// Drop all state kept for a character that left.
    fn forget(&mut self, character: CharacterId);
}

/// Per-character cooldowns.
#[derive(Debug, Default)]
pub struct CooldownGate {
    cooldowns: HashMap<Ability, f64>,
    last_activation: HashMap<(CharacterId, Ability), f64>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cooldown(mut self, ability: Ability, seconds: f64) -> Self {
        self.cooldowns.insert(ability, seconds.max(0.0));
        self
    }
}

impl AbilityGate for CooldownGate {
    fn try_activate(&mut self, character: CharacterId, ability: Ability, now: f64) -> bool {
        let cooldown = self.cooldowns.get(&ability).copied().unwrap_or(0.0);
        let key = (character, ability);
        if let Some(&last) = self.last_activation.get(&key) {
            if now - last < cooldown {
                return false;
            }
        }
        self.last_activation.insert(key, now);
        true
    }

    fn forget(&mut self, character: CharacterId) {
        self.last_activation.retain(|(id, _), _| *id != character);
    }
}
