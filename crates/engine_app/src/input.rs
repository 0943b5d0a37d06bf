//! Polled input state.
//!
//! Raw press/release/pointer events are queued as they arrive and applied in
//! [`InputState::begin_frame`]; the "just" sets are cleared in
//! [`InputState::end_frame`]. Systems therefore see a stable view for the
//! whole tick, and an event arriving mid-tick only shows up next frame.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use engine_math::Vec2;
use tracing::trace;

/// Input handle shared between the driver and the systems that read it.
pub type SharedInput = Rc<RefCell<InputState>>;

#[derive(Debug, Clone, PartialEq)]
enum RawEvent {
    Press(String),
    Release(String),
    Pointer(Vec2),
}

#[derive(Debug, Default)]
pub struct InputState {
    queued: Vec<RawEvent>,
    down: HashSet<String>,
    just_pressed: HashSet<String>,
    just_released: HashSet<String>,
    pointer: Vec2,
}

impl InputState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared() -> SharedInput {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn press(&mut self, code: &str) {
        self.queued.push(RawEvent::Press(code.to_string()));
    }

    pub fn release(&mut self, code: &str) {
        self.queued.push(RawEvent::Release(code.to_string()));
    }

    pub fn move_pointer(&mut self, position: Vec2) {
        self.queued.push(RawEvent::Pointer(position));
    }

    /// Apply queued events. A key pressed and released within the same
    /// frame is reported as both just pressed and just released.
    pub fn begin_frame(&mut self) {
        if !self.queued.is_empty() {
            trace!(events = self.queued.len(), "applying input events");
        }
        for event in std::mem::take(&mut self.queued) {
            match event {
                RawEvent::Press(code) => {
                    if self.down.insert(code.clone()) {
                        self.just_pressed.insert(code);
                    }
                }
                RawEvent::Release(code) => {
                    if self.down.remove(&code) {
                        self.just_released.insert(code);
                    }
                }
                RawEvent::Pointer(position) => self.pointer = position,
            }
        }
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }

    #[must_use]
    pub fn is_pressed(&self, code: &str) -> bool {
        self.down.contains(code)
    }

    #[must_use]
    pub fn is_just_pressed(&self, code: &str) -> bool {
        self.just_pressed.contains(code)
    }

    #[must_use]
    pub fn is_just_released(&self, code: &str) -> bool {
        self.just_released.contains(code)
    }

    #[must_use]
    pub fn pointer_position(&self) -> Vec2 {
        self.pointer
    }

    /// Unit-length direction from four held keys, or zero.
    #[must_use]
    pub fn axis(&self, left: &str, right: &str, up: &str, down: &str) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.is_pressed(left) {
            dir.x -= 1.0;
        }
        if self.is_pressed(right) {
            dir.x += 1.0;
        }
        if self.is_pressed(up) {
            dir.y += 1.0;
        }
        if self.is_pressed(down) {
            dir.y -= 1.0;
        }
        dir.normalize_or_zero()
    }
}

/// Something that feeds raw events into [`InputState`] before each frame.
pub trait InputSource {
    fn poll(&mut self, frame: u64, input: &mut InputState);
}

/// Replays key presses and releases at fixed frame numbers.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    steps: Vec<(u64, bool, String)>,
}

impl ScriptedInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `code` from frame `from` until frame `to` (released at `to`).
    #[must_use]
    pub fn hold(mut self, code: &str, from: u64, to: u64) -> Self {
        self.steps.push((from, true, code.to_string()));
        self.steps.push((to, false, code.to_string()));
        self
    }

    /// Press and release `code` on consecutive frames starting at `frame`.
    #[must_use]
    pub fn tap(self, code: &str, frame: u64) -> Self {
        self.hold(code, frame, frame + 1)
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, frame: u64, input: &mut InputState) {
        for (_, pressed, code) in self.steps.iter().filter(|(at, ..)| *at == frame) {
            if *pressed {
                input.press(code);
            } else {
                input.release(code);
            }
        }
    }
}
