//! # engine_events
//!
//! Decoupled publish/subscribe channel, independent of entity identity.
//!
//! - [`EventBus`]: event name → listener list, clone-before-dispatch.
//! - [`Subscription`]: handle that removes exactly one listener.
//!
//! Everything here is single-threaded: listeners are `Rc<dyn Fn(&P)>` and the
//! bus is a cheap `Rc` handle.

pub mod bus;

pub use bus::{EventBus, ListenerId, Subscription};
