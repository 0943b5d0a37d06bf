//! The [`State`] trait.

/// A named behaviour unit driven by a [`StateMachine`](crate::StateMachine).
///
/// Every hook receives the machine's shared context `C`. All hooks have
/// empty defaults; only [`State::name`] is required.
pub trait State<C> {
    /// The name this state is registered under.
    fn name(&self) -> &str;

    /// Called after the machine switched to this state. `previous` is `None`
    /// when this is the first state ever entered.
    fn on_enter(&mut self, _ctx: &mut C, _previous: Option<&str>) {}

    /// Called on every [`StateMachine::update`](crate::StateMachine::update)
    /// while this state is current.
    ///
    /// Returning `Some(name)` requests a transition, which goes through the
    /// same checks as [`StateMachine::set_state`](crate::StateMachine::set_state).
    fn on_update(&mut self, _ctx: &mut C, _dt: f32) -> Option<String> {
        None
    }

    /// Called before the machine leaves this state. `next` is `None` when
    /// the machine is being cleared.
    fn on_exit(&mut self, _ctx: &mut C, _next: Option<&str>) {}

    /// Guard consulted before leaving this state for `target`.
    fn can_transition_to(&self, _ctx: &C, _target: &str) -> bool {
        true
    }
}
