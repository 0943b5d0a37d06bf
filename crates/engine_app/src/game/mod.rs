//! Demo game: a player moved by input, enemies driven by per-entity state
//! machines, and a scoreboard fed through an event bus.

pub mod brain;
pub mod components;
pub mod scene;
pub mod score;
pub mod systems;
