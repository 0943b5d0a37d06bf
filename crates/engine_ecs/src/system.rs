//! Systems and the context they run in.
//!
//! A [`System`] is logic invoked once per [`World::update`](crate::World::update)
//! tick. Systems run in ascending [`System::priority`]; systems sharing a
//! priority keep the order they were added in.
//!
//! ```ignore
//! struct Gravity;
//!
//! impl System for Gravity {
//!     fn required_components(&self) -> Vec<ComponentTypeId> {
//!         vec![Velocity::component_type_id()]
//!     }
//!
//!     fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
//!         for id in ctx.entities() {
//!             if let Some(v) = ctx.world.get_component_mut::<Velocity>(id) {
//!                 v.y -= 9.81 * ctx.dt;
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;

use engine_component::{ComponentTypeId, EntityId, Query};
use serde::{Deserialize, Serialize};

use crate::error::EcsError;
use crate::world::World;

/// Handle returned by [`World::add_system`](crate::World::add_system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub u64);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// Per-tick logic registered with a [`World`].
pub trait System {
    /// Name used in logs and events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Lower runs earlier. Read once, when the system is added.
    fn priority(&self) -> i32 {
        0
    }

    /// Component types an entity must carry to appear in
    /// [`SystemContext::entities`]. Read once, when the system is added.
    fn required_components(&self) -> Vec<ComponentTypeId> {
        Vec::new()
    }

    /// Called synchronously from `add_system`.
    fn on_init(&mut self, _world: &mut World) {}

    /// Called once per tick while the system is enabled.
    ///
    /// # Errors
    ///
    /// Returning an error halts the current tick; see
    /// [`World::update`](crate::World::update).
    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError>;

    /// Called when the system is removed or the world is destroyed.
    fn on_destroy(&mut self, _world: &mut World) {}
}

/// What a system sees during its `update`.
pub struct SystemContext<'w> {
    /// The world being ticked. Structural changes made through it (creating
    /// or removing entities, adding or removing systems) are deferred to the
    /// end of the tick.
    pub world: &'w mut World,
    /// Seconds since the previous tick, as passed to `World::update`.
    pub dt: f32,
    /// Number of the tick in progress, starting at 1.
    pub tick: u64,
    query: &'w Query,
}

impl<'w> SystemContext<'w> {
    pub(crate) fn new(world: &'w mut World, dt: f32, tick: u64, query: &'w Query) -> Self {
        Self {
            world,
            dt,
            tick,
            query,
        }
    }

    /// Active entities carrying every component in
    /// [`System::required_components`], ascending by id.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        self.world.query(self.query)
    }

    /// The filter built from [`System::required_components`].
    #[must_use]
    pub fn query(&self) -> &Query {
        self.query
    }
}

/// A [`System`] built from a closure.
///
/// ```ignore
/// world.add_system(
///     FnSystem::new("cleanup", |ctx| Ok(())).with_priority(100),
/// );
/// ```
pub struct FnSystem<F> {
    name: String,
    priority: i32,
    required: Vec<ComponentTypeId>,
    run: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) -> Result<(), EcsError>,
{
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            required: Vec::new(),
            run,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_required(mut self, required: Vec<ComponentTypeId>) -> Self {
        self.required = required;
        self
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) -> Result<(), EcsError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn required_components(&self) -> Vec<ComponentTypeId> {
        self.required.clone()
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), EcsError> {
        (self.run)(ctx)
    }
}
