//! Gameplay components.

use engine_ecs::Component;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Units per second.
    pub speed: f32,
    pub attack_radius: f32,
    pub attack_damage: i32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            speed: 6.0,
            attack_radius: 2.5,
            attack_damage: 4,
        }
    }
}

impl Component for Player {
    fn type_name() -> &'static str {
        "Player"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    #[must_use]
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Subtract `amount`, never going below zero. Returns the new value.
    pub fn damage(&mut self, amount: i32) -> i32 {
        self.current = (self.current - amount).max(0);
        self.current
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.max <= 0 {
            return 0.0;
        }
        self.current as f32 / self.max as f32
    }
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Damage per hit on the player.
    pub damage: i32,
    /// Seconds between hits.
    pub cooldown: f32,
    /// Seconds until the next hit is allowed.
    pub ready_in: f32,
    /// Score awarded when killed.
    pub reward: u32,
}

impl Default for Enemy {
    fn default() -> Self {
        Self {
            damage: 1,
            cooldown: 0.5,
            ready_in: 0.0,
            reward: 10,
        }
    }
}

impl Component for Enemy {
    fn type_name() -> &'static str {
        "Enemy"
    }
}
