//! Enemy AI as a state machine.
//!
//! ```text
//! idle  --target in sight-->          chase
//! chase --health below threshold-->   flee
//! chase --target lost-->              idle
//! flee  --far enough, after 1s-->     idle      (never straight to chase)
//! ```

use engine_ecs::{Component, EntityId};
use engine_fsm::{State, StateMachine};
use engine_math::Vec2;
use tracing::debug;

pub const IDLE: &str = "idle";
pub const CHASE: &str = "chase";
pub const FLEE: &str = "flee";

const FLEE_BELOW_HEALTH: f32 = 0.35;
const MIN_FLEE_SECS: f32 = 1.0;

/// Inputs the brain reads and the velocity it writes.
#[derive(Debug, Clone, Default)]
pub struct BrainContext {
    pub entity: EntityId,
    pub position: Vec2,
    pub target: Option<Vec2>,
    pub health_ratio: f32,
    pub speed: f32,
    pub sight: f32,
    pub time_in_state: f32,
    /// Output.
    pub velocity: Vec2,
}

impl BrainContext {
    fn target_distance(&self) -> Option<f32> {
        self.target.map(|t| t.distance(self.position))
    }

    fn toward_target(&self) -> Vec2 {
        self.target
            .map_or(Vec2::ZERO, |t| (t - self.position).normalize_or_zero())
    }
}

struct Idle;

impl State<BrainContext> for Idle {
    fn name(&self) -> &str {
        IDLE
    }

    fn on_enter(&mut self, ctx: &mut BrainContext, _previous: Option<&str>) {
        ctx.time_in_state = 0.0;
        ctx.velocity = Vec2::ZERO;
    }

    fn on_update(&mut self, ctx: &mut BrainContext, _dt: f32) -> Option<String> {
        ctx.velocity = Vec2::ZERO;
        match ctx.target_distance() {
            Some(d) if d <= ctx.sight => Some(CHASE.into()),
            _ => None,
        }
    }
}

struct Chase;

impl State<BrainContext> for Chase {
    fn name(&self) -> &str {
        CHASE
    }

    fn on_enter(&mut self, ctx: &mut BrainContext, _previous: Option<&str>) {
        ctx.time_in_state = 0.0;
    }

    fn on_update(&mut self, ctx: &mut BrainContext, _dt: f32) -> Option<String> {
        if ctx.health_ratio < FLEE_BELOW_HEALTH {
            return Some(FLEE.into());
        }
        match ctx.target_distance() {
            Some(d) if d <= ctx.sight * 1.5 => {
                ctx.velocity = ctx.toward_target() * ctx.speed;
                None
            }
            _ => Some(IDLE.into()),
        }
    }
}

struct Flee;

impl State<BrainContext> for Flee {
    fn name(&self) -> &str {
        FLEE
    }

    fn on_enter(&mut self, ctx: &mut BrainContext, _previous: Option<&str>) {
        ctx.time_in_state = 0.0;
    }

    fn on_update(&mut self, ctx: &mut BrainContext, _dt: f32) -> Option<String> {
        ctx.velocity = -ctx.toward_target() * ctx.speed * 1.2;
        match ctx.target_distance() {
            Some(d) if d <= ctx.sight * 2.0 => None,
            _ => Some(IDLE.into()),
        }
    }

    fn on_exit(&mut self, ctx: &mut BrainContext, _next: Option<&str>) {
        ctx.velocity = Vec2::ZERO;
    }

    fn can_transition_to(&self, ctx: &BrainContext, target: &str) -> bool {
        target == IDLE && ctx.time_in_state >= MIN_FLEE_SECS
    }
}

/// Component wrapping an enemy's state machine.
pub struct Brain {
    machine: StateMachine<BrainContext>,
}

impl Brain {
    #[must_use]
    pub fn new(speed: f32, sight: f32) -> Self {
        let mut machine = StateMachine::new(BrainContext {
            speed,
            sight,
            health_ratio: 1.0,
            ..BrainContext::default()
        });
        machine.add_state(Idle).add_state(Chase).add_state(Flee);
        machine.set_state(IDLE);
        Self { machine }
    }

    /// Feed the latest observations, advance one step, and return the
    /// desired velocity.
    pub fn think(&mut self, position: Vec2, target: Option<Vec2>, health_ratio: f32, dt: f32) -> Vec2 {
        let ctx = self.machine.context_mut();
        ctx.position = position;
        ctx.target = target;
        ctx.health_ratio = health_ratio;
        ctx.time_in_state += dt;
        self.machine.update(dt);
        self.machine.context().velocity
    }

    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.machine.current_state_name()
    }

    #[must_use]
    pub fn machine(&self) -> &StateMachine<BrainContext> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut StateMachine<BrainContext> {
        &mut self.machine
    }
}

impl Component for Brain {
    fn type_name() -> &'static str {
        "Brain"
    }

    fn on_attach(&mut self, entity: EntityId) {
        self.machine.context_mut().entity = entity;
        // Subscriptions are not tied to the handle's lifetime; the listener
        // goes away with the machine.
        let _ = self.machine.on_transition(move |from, to| {
            debug!(entity = %entity, from = ?from, to, "brain transition");
        });
    }

    fn on_destroy(&mut self) {
        self.machine.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.25;

    fn brain() -> Brain {
        Brain::new(2.0, 5.0)
    }

    #[test]
    fn test_starts_idle_and_stays_without_target() {
        let mut b = brain();
        assert_eq!(b.state(), Some(IDLE));
        assert_eq!(b.think(Vec2::ZERO, None, 1.0, DT), Vec2::ZERO);
        assert_eq!(b.state(), Some(IDLE));
    }

    #[test]
    fn test_chases_target_in_sight() {
        let mut b = brain();
        b.think(Vec2::ZERO, Some(Vec2::new(3.0, 0.0)), 1.0, DT);
        assert_eq!(b.state(), Some(CHASE));

        let v = b.think(Vec2::ZERO, Some(Vec2::new(3.0, 0.0)), 1.0, DT);
        assert_eq!(v, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_loses_target_and_idles() {
        let mut b = brain();
        b.think(Vec2::ZERO, Some(Vec2::new(3.0, 0.0)), 1.0, DT);
        b.think(Vec2::ZERO, Some(Vec2::new(20.0, 0.0)), 1.0, DT);
        assert_eq!(b.state(), Some(IDLE));
    }

    #[test]
    fn test_flees_when_hurt_and_guard_blocks_early_exit() {
        let mut b = brain();
        let target = Some(Vec2::new(1.0, 0.0));
        b.think(Vec2::ZERO, target, 1.0, DT);
        b.think(Vec2::ZERO, target, 0.2, DT);
        assert_eq!(b.state(), Some(FLEE));

        let v = b.think(Vec2::ZERO, target, 0.2, DT);
        assert!(v.x < 0.0);

        // Far away but too early to calm down.
        b.think(Vec2::ZERO, None, 0.2, DT);
        assert_eq!(b.state(), Some(FLEE));
        assert!(!b.machine_mut().set_state(CHASE));

        for _ in 0..4 {
            b.think(Vec2::ZERO, None, 0.2, DT);
        }
        assert_eq!(b.state(), Some(IDLE));
    }

    #[test]
    fn test_attach_records_entity_and_destroy_clears() {
        let mut b = brain();
        b.on_attach(EntityId(9));
        assert_eq!(b.machine().context().entity, EntityId(9));
        b.on_destroy();
        assert!(b.state().is_none());
        assert!(b.machine().state_names().is_empty());
    }
}
