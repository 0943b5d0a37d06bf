//! # engine_fsm
//!
//! Generic finite-state machine with guarded transitions. It does not depend
//! on the ECS; an ECS system typically drives one per entity from its
//! `update`.
//!
//! - [`State`]: enter/update/exit hooks plus a transition guard.
//! - [`StateMachine`]: owns the states and the shared context.

pub mod machine;
pub mod state;

pub use machine::{StateMachine, Transition};
pub use state::State;
