//! Score events and the scoreboard listening to them.

use std::cell::Cell;
use std::rc::Rc;

use engine_ecs::EntityId;
use engine_events::{EventBus, Subscription};
use serde::Serialize;

pub const ENEMY_KILLED: &str = "enemy_killed";
pub const PLAYER_HIT: &str = "player_hit";
pub const PLAYER_DIED: &str = "player_died";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ScoreEvent {
    EnemyKilled { entity: EntityId, reward: u32 },
    PlayerHit { damage: i32, remaining: i32 },
    PlayerDied { entity: EntityId },
}

impl ScoreEvent {
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::EnemyKilled { .. } => ENEMY_KILLED,
            Self::PlayerHit { .. } => PLAYER_HIT,
            Self::PlayerDied { .. } => PLAYER_DIED,
        }
    }

    /// Emit on the channel named after this event.
    pub fn emit(self, bus: &EventBus<ScoreEvent>) -> usize {
        bus.emit(self.event_name(), &self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTotals {
    pub score: u32,
    pub kills: u32,
    pub hits_taken: u32,
    pub player_died: bool,
}

/// Tallies score events while subscribed.
pub struct Scoreboard {
    totals: Rc<Cell<ScoreTotals>>,
    subscriptions: Vec<Subscription<ScoreEvent>>,
}

impl Scoreboard {
    /// Subscribe to every score channel on `bus`.
    #[must_use]
    pub fn attach(bus: &EventBus<ScoreEvent>) -> Self {
        let totals = Rc::new(Cell::new(ScoreTotals::default()));
        let subscriptions = [ENEMY_KILLED, PLAYER_HIT, PLAYER_DIED]
            .into_iter()
            .map(|channel| {
                let totals = Rc::clone(&totals);
                bus.on(channel, move |event: &ScoreEvent| {
                    let mut t = totals.get();
                    match event {
                        ScoreEvent::EnemyKilled { reward, .. } => {
                            t.score += reward;
                            t.kills += 1;
                        }
                        ScoreEvent::PlayerHit { .. } => t.hits_taken += 1,
                        ScoreEvent::PlayerDied { .. } => t.player_died = true,
                    }
                    totals.set(t);
                })
            })
            .collect();
        Self {
            totals,
            subscriptions,
        }
    }

    #[must_use]
    pub fn totals(&self) -> ScoreTotals {
        self.totals.get()
    }

    /// Unsubscribe and return the final totals.
    pub fn detach(self) -> ScoreTotals {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
        self.totals.get()
    }
}
