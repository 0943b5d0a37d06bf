//! Fixed-timestep frame driver.
//!
//! Each frame:
//!
//! 1. Poll the input source, then `input.begin_frame()`.
//! 2. `world.update(dt)`.
//! 3. `input.end_frame()`.
//! 4. `renderer.render(&world)`.
//!
//! [`FrameDriver::run`] repeats this at the configured rate until
//! `max_frames` is reached or the stop flag is raised.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use engine_ecs::{EcsError, World};
use thiserror::Error;
use tracing::{info, warn};

use crate::input::{InputSource, SharedInput};
use crate::render::Renderer;

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Target frames per second.
    pub tick_rate: f64,
    /// Maximum number of frames to run (0 = unlimited).
    pub max_frames: u64,
}

impl DriverConfig {
    /// Wall-clock budget of one frame.
    ///
    /// # Errors
    ///
    /// [`DriverError::InvalidTickRate`] unless the rate is finite and positive.
    pub fn frame_duration(&self) -> Result<Duration, DriverError> {
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(DriverError::InvalidTickRate(self.tick_rate));
        }
        Duration::try_from_secs_f64(1.0 / self.tick_rate)
            .map_err(|_| DriverError::InvalidTickRate(self.tick_rate))
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_frames: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("tick rate must be a finite positive number, got {0}")]
    InvalidTickRate(f64),

    #[error(transparent)]
    Update(#[from] EcsError),
}

/// Raised by game code to end [`FrameDriver::run`] after the current frame.
pub type StopFlag = Rc<Cell<bool>>;

pub struct FrameDriver<R> {
    config: DriverConfig,
    world: World,
    input: SharedInput,
    source: Option<Box<dyn InputSource>>,
    renderer: R,
    stop: StopFlag,
    frame: u64,
}

impl<R: Renderer> FrameDriver<R> {
    #[must_use]
    pub fn new(config: DriverConfig, world: World, input: SharedInput, renderer: R) -> Self {
        Self {
            config,
            world,
            input,
            source: None,
            renderer,
            stop: Rc::new(Cell::new(false)),
            frame: 0,
        }
    }

    #[must_use]
    pub fn with_input_source(mut self, source: impl InputSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Share the stop flag with game code.
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        Rc::clone(&self.stop)
    }

    /// Frames completed so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run one frame.
    ///
    /// # Errors
    ///
    /// The error of a failing system; input and rendering still complete for
    /// the frame.
    pub fn step(&mut self, dt: f32) -> Result<(), EcsError> {
        self.frame += 1;
        {
            let mut input = self.input.borrow_mut();
            if let Some(source) = self.source.as_mut() {
                source.poll(self.frame, &mut input);
            }
            input.begin_frame();
        }

        let result = self.world.update(dt);

        self.input.borrow_mut().end_frame();
        self.renderer.render(&self.world);
        result
    }

    /// Run frames at the configured rate. Returns the number of frames run.
    ///
    /// # Errors
    ///
    /// [`DriverError::InvalidTickRate`] before any frame runs, or
    /// [`DriverError::Update`] at the first frame whose update fails.
    pub fn run(&mut self) -> Result<u64, DriverError> {
        let frame_duration = self.config.frame_duration()?;
        let dt = frame_duration.as_secs_f32();
        let mut frames = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_frames = self.config.max_frames,
            "starting frame loop"
        );

        loop {
            let start = Instant::now();
            self.step(dt)?;
            frames += 1;

            if self.stop.get() {
                info!(frames, "frame loop stopped");
                break;
            }
            if self.config.max_frames > 0 && frames >= self.config.max_frames {
                info!(frames, "frame loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            } else {
                warn!(
                    frame = self.frame,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = frame_duration.as_millis() as u64,
                    "frame exceeded time budget"
                );
            }
        }
        Ok(frames)
    }

    /// Hand the world back, e.g. for a final snapshot.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }
}
