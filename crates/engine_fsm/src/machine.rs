//! Finite-state machine over a shared context.
//!
//! ## Transition sequence
//!
//! ```text
//! set_state(target)
//!   target unknown?                 -> warn, false
//!   current.can_transition_to(..)?  -> no: false
//!   current.on_exit(Some(target))      (skipped when there is no current)
//!   current = target
//!   target.on_enter(previous)
//!   observers(previous, target)
//! ```
//!
//! Self-transitions are not special-cased: they run exit then enter.

use std::collections::HashMap;
use std::fmt;

use engine_events::{EventBus, Subscription};
use tracing::{debug, warn};

use crate::state::State;

const TRANSITION_EVENT: &str = "transition";

/// Payload delivered to transition observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state left, or `None` for the first transition.
    pub from: Option<String>,
    /// The state entered.
    pub to: String,
}

/// A set of named states with exactly one optional current state.
pub struct StateMachine<C> {
    context: C,
    states: HashMap<String, Box<dyn State<C>>>,
    current: Option<String>,
    observers: EventBus<Transition>,
}

impl<C: 'static> StateMachine<C> {
    /// Create a machine with no states, bound to `context`.
    #[must_use]
    pub fn new(context: C) -> Self {
        Self {
            context,
            states: HashMap::new(),
            current: None,
            observers: EventBus::new(),
        }
    }

    /// Register a state under its name. An existing state with the same name
    /// is replaced, with a warning.
    pub fn add_state(&mut self, state: impl State<C> + 'static) -> &mut Self {
        self.add_boxed_state(Box::new(state))
    }

    /// Register an already boxed state.
    pub fn add_boxed_state(&mut self, state: Box<dyn State<C>>) -> &mut Self {
        let name = state.name().to_string();
        if self.states.contains_key(&name) {
            warn!(state = %name, "state registered twice, overwriting");
        }
        self.states.insert(name, state);
        self
    }

    /// Switch to the state named `name`.
    ///
    /// Returns `false`, leaving the current state untouched, if the name is
    /// unknown or the current state's guard refuses the transition.
    pub fn set_state(&mut self, name: &str) -> bool {
        if !self.states.contains_key(name) {
            warn!(state = name, "cannot transition to unknown state");
            return false;
        }

        if let Some(current) = self.current.as_deref()
            && let Some(state) = self.states.get(current)
            && !state.can_transition_to(&self.context, name)
        {
            debug!(from = current, to = name, "transition refused by guard");
            return false;
        }

        let previous = self.current.take();
        if let Some(prev) = previous.as_deref()
            && let Some(state) = self.states.get_mut(prev)
        {
            state.on_exit(&mut self.context, Some(name));
        }

        self.current = Some(name.to_string());
        if let Some(state) = self.states.get_mut(name) {
            state.on_enter(&mut self.context, previous.as_deref());
        }

        debug!(from = ?previous, to = name, "state transition");
        self.observers.emit(
            TRANSITION_EVENT,
            &Transition {
                from: previous,
                to: name.to_string(),
            },
        );
        true
    }

    /// Forward `dt` to the current state's `on_update`.
    ///
    /// If the state requests a transition it is attempted through
    /// [`StateMachine::set_state`]; the return value tells whether one
    /// happened. Without a current state this is a no-op.
    pub fn update(&mut self, dt: f32) -> bool {
        let Some(current) = self.current.as_deref() else {
            return false;
        };
        let Some(state) = self.states.get_mut(current) else {
            return false;
        };
        match state.on_update(&mut self.context, dt) {
            Some(next) => self.set_state(&next),
            None => false,
        }
    }

    /// Observe successful transitions. The callback receives the previous
    /// state name (if any) and the new one.
    pub fn on_transition(
        &self,
        callback: impl Fn(Option<&str>, &str) + 'static,
    ) -> Subscription<Transition> {
        self.observers.on(TRANSITION_EVENT, move |t: &Transition| {
            callback(t.from.as_deref(), &t.to);
        })
    }

    /// Exit the current state (with no next state) and forget every state.
    pub fn clear(&mut self) {
        if let Some(current) = self.current.take()
            && let Some(state) = self.states.get_mut(&current)
        {
            state.on_exit(&mut self.context, None);
        }
        self.states.clear();
    }

    /// Name of the current state.
    #[must_use]
    pub fn current_state_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The current state.
    #[must_use]
    pub fn current_state(&self) -> Option<&dyn State<C>> {
        self.get_state(self.current.as_deref()?)
    }

    /// Look up a state by name.
    #[must_use]
    pub fn get_state(&self, name: &str) -> Option<&dyn State<C>> {
        self.states.get(name).map(|s| s.as_ref())
    }

    /// Returns `true` if a state with this name is registered.
    #[must_use]
    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Registered state names, sorted.
    #[must_use]
    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &C {
        &self.context
    }

    /// The shared context, mutably.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }
}

impl<C: fmt::Debug> fmt::Debug for StateMachine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.states.keys().collect();
        names.sort();
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("states", &names)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Context recording every hook call.
    #[derive(Debug, Default)]
    struct Ctx {
        log: Vec<String>,
        locked: bool,
    }

    struct Named {
        name: &'static str,
        next_on_update: Option<&'static str>,
    }

    impl Named {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                next_on_update: None,
            }
        }
    }

    impl State<Ctx> for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn on_enter(&mut self, ctx: &mut Ctx, previous: Option<&str>) {
            ctx.log
                .push(format!("enter {} from {:?}", self.name, previous));
        }

        fn on_update(&mut self, ctx: &mut Ctx, dt: f32) -> Option<String> {
            ctx.log.push(format!("update {} {dt}", self.name));
            self.next_on_update.map(str::to_string)
        }

        fn on_exit(&mut self, ctx: &mut Ctx, next: Option<&str>) {
            ctx.log.push(format!("exit {} to {:?}", self.name, next));
        }

        fn can_transition_to(&self, ctx: &Ctx, _target: &str) -> bool {
            !ctx.locked
        }
    }

    fn machine() -> StateMachine<Ctx> {
        let mut fsm = StateMachine::new(Ctx::default());
        fsm.add_state(Named::new("idle")).add_state(Named::new("run"));
        fsm
    }

    #[test]
    fn test_no_current_state_initially() {
        let fsm = machine();
        assert!(fsm.current_state_name().is_none());
        assert!(fsm.current_state().is_none());
    }

    #[test]
    fn test_first_transition_skips_exit() {
        let mut fsm = machine();
        assert!(fsm.set_state("run"));
        assert_eq!(fsm.current_state_name(), Some("run"));
        assert_eq!(fsm.context().log, vec!["enter run from None"]);
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let mut fsm = machine();
        fsm.set_state("run");
        assert!(!fsm.set_state("missing"));
        assert_eq!(fsm.current_state_name(), Some("run"));
        assert_eq!(fsm.context().log.len(), 1);
    }

    #[test]
    fn test_exit_then_enter_order() {
        let mut fsm = machine();
        fsm.set_state("idle");
        fsm.set_state("run");
        assert_eq!(
            fsm.context().log,
            vec![
                "enter idle from None",
                "exit idle to Some(\"run\")",
                "enter run from Some(\"idle\")",
            ]
        );
    }

    #[test]
    fn test_guard_refusal_keeps_state() {
        let mut fsm = machine();
        fsm.set_state("idle");
        fsm.context_mut().locked = true;
        assert!(!fsm.set_state("run"));
        assert_eq!(fsm.current_state_name(), Some("idle"));
    }

    #[test]
    fn test_self_transition_runs_exit_and_enter() {
        let mut fsm = machine();
        fsm.set_state("idle");
        assert!(fsm.set_state("idle"));
        assert_eq!(
            fsm.context().log,
            vec![
                "enter idle from None",
                "exit idle to Some(\"idle\")",
                "enter idle from Some(\"idle\")",
            ]
        );
    }

    #[test]
    fn test_observers_and_unsubscribe() {
        let mut fsm = machine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let sub = fsm.on_transition(move |from, to| {
            log.borrow_mut().push((from.map(str::to_string), to.to_string()));
        });

        fsm.set_state("idle");
        fsm.set_state("run");
        assert!(sub.unsubscribe());
        fsm.set_state("idle");

        assert_eq!(
            *seen.borrow(),
            vec![
                (None, "idle".to_string()),
                (Some("idle".to_string()), "run".to_string()),
            ]
        );
    }

    #[test]
    fn test_update_forwards_and_follows_requests() {
        let mut fsm = StateMachine::new(Ctx::default());
        fsm.add_state(Named {
            name: "idle",
            next_on_update: Some("run"),
        })
        .add_state(Named::new("run"));

        assert!(!fsm.update(0.5));
        assert!(fsm.context().log.is_empty());

        fsm.set_state("idle");
        assert!(fsm.update(0.5));
        assert_eq!(fsm.current_state_name(), Some("run"));
        assert!(fsm.context().log.contains(&"update idle 0.5".to_string()));
    }

    #[test]
    fn test_clear_exits_and_wipes() {
        let mut fsm = machine();
        fsm.set_state("idle");
        fsm.clear();
        assert!(fsm.current_state_name().is_none());
        assert!(fsm.state_names().is_empty());
        assert_eq!(fsm.context().log.last().unwrap(), "exit idle to None");
    }

    #[test]
    fn test_duplicate_state_overwrites() {
        let mut fsm = machine();
        fsm.add_state(Named::new("idle"));
        assert_eq!(fsm.state_names(), vec!["idle", "run"]);
        assert!(fsm.has_state("run"));
        assert_eq!(fsm.get_state("run").unwrap().name(), "run");
    }
}
