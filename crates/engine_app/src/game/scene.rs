//! Demo scene assembly.

use engine_ecs::{ComponentRegistry, EntityId, World};
use engine_events::EventBus;
use engine_math::{Transform2D, Vec2, Velocity2D};
use tracing::info;

use crate::driver::StopFlag;
use crate::game::brain::Brain;
use crate::game::components::{Enemy, Health, Player};
use crate::game::score::{ScoreEvent, Scoreboard};
use crate::game::systems::{ATTACK_KEY, BrainSystem, Combat, Movement, PlayerControl, Spawner};
use crate::input::{ScriptedInput, SharedInput};
use crate::render::Sprite;

const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub enemies: usize,
    /// Radius of the circular arena.
    pub arena: f32,
    /// Seconds between spawner checks.
    pub spawn_interval: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            enemies: 5,
            arena: 20.0,
            spawn_interval: 2.0,
        }
    }
}

/// Component types captured by snapshots. [`Brain`] holds live state and is
/// left out.
#[must_use]
pub fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry
        .register::<Transform2D>()
        .register::<Velocity2D>()
        .register::<Sprite>()
        .register::<Player>()
        .register::<Health>()
        .register::<Enemy>();
    registry
}

pub fn spawn_player(world: &mut World) -> EntityId {
    let player = world.create_named_entity("player");
    player.add_component(Transform2D::IDENTITY);
    player.add_component(Velocity2D::default());
    player.add_component(Player::default());
    player.add_component(Health::new(10));
    player.add_component(Sprite::new('@', 1.0).on_layer(1));
    player.id()
}

/// Spawn the `index`-th enemy on a spiral inside the arena.
pub fn spawn_enemy(world: &mut World, index: usize, arena: f32) -> EntityId {
    let angle = index as f32 * GOLDEN_ANGLE;
    let radius = arena * (0.4 + 0.15 * (index % 4) as f32);
    let position = Vec2::from_angle(angle) * radius;

    let enemy = world.create_named_entity(format!("enemy-{index}"));
    enemy.add_component(Transform2D::from_position(position));
    enemy.add_component(Velocity2D::default());
    enemy.add_component(Enemy::default());
    enemy.add_component(Health::new(8));
    enemy.add_component(Brain::new(3.0, 8.0));
    enemy.add_component(Sprite::new('e', 1.0));
    enemy.id()
}

/// Handles the caller keeps after building the scene.
pub struct Game {
    pub player: EntityId,
    pub score: EventBus<ScoreEvent>,
    pub scoreboard: Scoreboard,
}

/// Populate `world` with the player, the initial enemies, and every system.
pub fn build(world: &mut World, config: &SceneConfig, input: SharedInput, stop: StopFlag) -> Game {
    let score = EventBus::new();
    let scoreboard = Scoreboard::attach(&score);

    let player = spawn_player(world);
    for index in 0..config.enemies {
        spawn_enemy(world, index, config.arena);
    }

    world.add_system(PlayerControl::new(input.clone()));
    world.add_system(BrainSystem);
    world.add_system(Movement::new(config.arena));
    world.add_system(Combat::new(input, score.clone(), stop));
    world.add_system(Spawner::new(
        config.spawn_interval,
        config.enemies,
        config.arena,
    ));

    info!(
        enemies = config.enemies,
        systems = world.stats().systems,
        "scene built"
    );
    Game {
        player,
        score,
        scoreboard,
    }
}

/// Walk toward the enemies and swing periodically.
#[must_use]
pub fn demo_script(frames: u64) -> ScriptedInput {
    let mut script = ScriptedInput::new()
        .hold("ArrowRight", 1, 90)
        .hold("ArrowUp", 60, 150)
        .hold("ArrowLeft", 150, 260)
        .hold("ArrowDown", 240, 330);
    let mut frame = 20;
    while frame < frames {
        script = script.tap(ATTACK_KEY, frame);
        frame += 15;
    }
    script
}
