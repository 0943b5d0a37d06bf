//! Gameplay systems, in run order.
//!
//! | priority | system          | reads                          | writes                   |
//! |----------|-----------------|--------------------------------|--------------------------|
//! | 0        | `PlayerControl` | input                          | player velocity          |
//! | 10       | `BrainSystem`   | positions, health              | brain, enemy velocity    |
//! | 20       | `Movement`      | velocity                       | transform                |
//! | 30       | `Combat`        | input, positions               | health, removes the dead |
//! | 40       | `Spawner`       | enemy count                    | creates enemies          |

use engine_ecs::{Component, ComponentTypeId, EcsError, EntityId, System, SystemContext, World};
use engine_events::EventBus;
use engine_math::{Transform2D, Vec2, Velocity2D};
use tracing::{debug, info};

use crate::driver::StopFlag;
use crate::game::brain::Brain;
use crate::game::components::{Enemy, Health, Player};
use crate::game::scene;
use crate::game::score::ScoreEvent;
use crate::input::SharedInput;

pub const ATTACK_KEY: &str = "Space";
const CONTACT_RANGE: f32 = 1.0;

/// First active player and its position.
fn find_player(world: &World) -> Option<(EntityId, Transform2D)> {
    let id = *world
        .get_entities_with_components(&[Player::component_type_id(), Transform2D::component_type_id()])
        .first()?;
    Some((id, *world.get_component::<Transform2D>(id)?))
}

pub struct PlayerControl {
    input: SharedInput,
}

impl PlayerControl {
    #[must_use]
    pub fn new(input: SharedInput) -> Self {
        Self { input }
    }
}

impl System for PlayerControl {
    fn name(&self) -> &str {
        "player_control"
    }

    fn required_components(&self) -> Vec<ComponentTypeId> {
        vec![Player::component_type_id(), Velocity2D::component_type_id()]
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        let dir = self
            .input
            .borrow()
            .axis("ArrowLeft", "ArrowRight", "ArrowUp", "ArrowDown");
        for id in ctx.entities() {
            let speed = ctx.world.require_component::<Player>(id)?.speed;
            ctx.world
                .update_component::<Velocity2D, _>(id, |v| v.linear = dir * speed)?;
        }
        Ok(())
    }
}

pub struct BrainSystem;

impl System for BrainSystem {
    fn name(&self) -> &str {
        "brain"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn required_components(&self) -> Vec<ComponentTypeId> {
        vec![
            Brain::component_type_id(),
            Transform2D::component_type_id(),
            Velocity2D::component_type_id(),
        ]
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        let target = find_player(ctx.world).map(|(_, t)| t.position);
        let dt = ctx.dt;
        for id in ctx.entities() {
            let position = ctx.world.require_component::<Transform2D>(id)?.position;
            let health = ctx.world.get_component::<Health>(id).map_or(1.0, Health::ratio);
            let velocity = ctx
                .world
                .update_component::<Brain, _>(id, |brain| brain.think(position, target, health, dt))?;
            ctx.world
                .update_component::<Velocity2D, _>(id, |v| v.linear = velocity)?;
        }
        Ok(())
    }
}

/// Integrates velocities and keeps everything inside the arena.
pub struct Movement {
    half_extent: f32,
}

impl Movement {
    #[must_use]
    pub fn new(half_extent: f32) -> Self {
        Self { half_extent }
    }
}

impl System for Movement {
    fn name(&self) -> &str {
        "movement"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn required_components(&self) -> Vec<ComponentTypeId> {
        vec![Transform2D::component_type_id(), Velocity2D::component_type_id()]
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        let dt = ctx.dt;
        let bound = self.half_extent;
        for id in ctx.entities() {
            let velocity = *ctx.world.require_component::<Velocity2D>(id)?;
            ctx.world.update_component::<Transform2D, _>(id, |t| {
                velocity.integrate(t, dt);
                t.position = t.position.clamp_length_max(bound);
                if velocity.linear != Vec2::ZERO {
                    t.look_at(t.position + velocity.linear);
                }
            })?;
        }
        Ok(())
    }
}

/// Resolves player attacks and enemy contact, and removes the dead.
pub struct Combat {
    input: SharedInput,
    score: EventBus<ScoreEvent>,
    stop: StopFlag,
}

impl Combat {
    #[must_use]
    pub fn new(input: SharedInput, score: EventBus<ScoreEvent>, stop: StopFlag) -> Self {
        Self { input, score, stop }
    }
}

impl System for Combat {
    fn name(&self) -> &str {
        "combat"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn required_components(&self) -> Vec<ComponentTypeId> {
        vec![
            Enemy::component_type_id(),
            Health::component_type_id(),
            Transform2D::component_type_id(),
        ]
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        let Some((player_id, player_at)) = find_player(ctx.world) else {
            return Ok(());
        };
        let player = ctx.world.require_component::<Player>(player_id)?.clone();
        let attacking = self.input.borrow().is_just_pressed(ATTACK_KEY);
        let dt = ctx.dt;

        for id in ctx.entities() {
            let distance = ctx
                .world
                .require_component::<Transform2D>(id)?
                .distance_to(&player_at);

            if attacking && distance <= player.attack_radius {
                let left = ctx
                    .world
                    .update_component::<Health, _>(id, |h| h.damage(player.attack_damage))?;
                if left == 0 {
                    let reward = ctx.world.require_component::<Enemy>(id)?.reward;
                    ctx.world.remove_entity(id);
                    debug!(entity = %id, reward, "enemy killed");
                    ScoreEvent::EnemyKilled { entity: id, reward }.emit(&self.score);
                    continue;
                }
            }

            let hit = ctx.world.update_component::<Enemy, _>(id, |enemy| {
                enemy.ready_in = (enemy.ready_in - dt).max(0.0);
                if distance <= CONTACT_RANGE && enemy.ready_in == 0.0 {
                    enemy.ready_in = enemy.cooldown;
                    Some(enemy.damage)
                } else {
                    None
                }
            })?;
            let Some(damage) = hit else {
                continue;
            };

            let remaining = ctx
                .world
                .update_component::<Health, _>(player_id, |h| h.damage(damage))?;
            ScoreEvent::PlayerHit { damage, remaining }.emit(&self.score);
            if remaining == 0 {
                ctx.world.remove_entity(player_id);
                ScoreEvent::PlayerDied { entity: player_id }.emit(&self.score);
                self.stop.set(true);
                break;
            }
        }
        Ok(())
    }
}

/// Tops the enemy count back up on a fixed interval.
pub struct Spawner {
    interval: f32,
    elapsed: f32,
    max_enemies: usize,
    spawned: usize,
    arena: f32,
}

impl Spawner {
    #[must_use]
    pub fn new(interval: f32, max_enemies: usize, arena: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            max_enemies,
            spawned: 0,
            arena,
        }
    }
}

impl System for Spawner {
    fn name(&self) -> &str {
        "spawner"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn required_components(&self) -> Vec<ComponentTypeId> {
        vec![Enemy::component_type_id()]
    }

    fn on_init(&mut self, world: &mut World) {
        self.spawned = world
            .get_entities_with_components(&[Enemy::component_type_id()])
            .len();
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        self.elapsed += ctx.dt;
        if self.elapsed < self.interval {
            return Ok(());
        }
        self.elapsed = 0.0;

        let alive = ctx.entities().len();
        if alive >= self.max_enemies {
            return Ok(());
        }
        let id = scene::spawn_enemy(ctx.world, self.spawned, self.arena);
        self.spawned += 1;
        info!(entity = %id, alive, tick = ctx.tick, "enemy spawned");
        Ok(())
    }
}
