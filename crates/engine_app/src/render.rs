//! Rendering seam.
//!
//! The driver calls [`Renderer::render`] once per frame after the world
//! update. [`LogRenderer`] is the headless implementation used by the binary
//! and by tests: it turns every active entity with a [`Transform2D`] and a
//! [`Sprite`] into a [`DrawCall`].

use engine_ecs::{Component, EntityId, World};
use engine_math::{Transform2D, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Visual for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub glyph: char,
    pub size: f32,
    /// Higher layers draw on top.
    pub layer: i32,
}

impl Sprite {
    #[must_use]
    pub fn new(glyph: char, size: f32) -> Self {
        Self {
            glyph,
            size,
            layer: 0,
        }
    }

    #[must_use]
    pub fn on_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }
}

impl Component for Sprite {
    fn type_name() -> &'static str {
        "Sprite"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawCall {
    pub entity: EntityId,
    pub glyph: char,
    pub position: Vec2,
    pub rotation: f32,
    pub size: f32,
    pub layer: i32,
}

pub trait Renderer {
    fn render(&mut self, world: &World);
}

/// Headless renderer keeping the draw list of the last frame.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
    last: Vec<DrawCall>,
}

impl LogRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draw calls of the last rendered frame, back to front.
    #[must_use]
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.last
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, world: &World) {
        let types = [Transform2D::component_type_id(), Sprite::component_type_id()];
        let mut calls: Vec<DrawCall> = world
            .get_entities_with_components(&types)
            .into_iter()
            .filter_map(|id| {
                let transform = world.get_component::<Transform2D>(id)?;
                let sprite = world.get_component::<Sprite>(id)?;
                Some(DrawCall {
                    entity: id,
                    glyph: sprite.glyph,
                    position: transform.position,
                    rotation: transform.rotation,
                    size: sprite.size * transform.scale.max_element(),
                    layer: sprite.layer,
                })
            })
            .collect();
        // Stable: equal layers keep entity order.
        calls.sort_by_key(|c| c.layer);

        self.frames += 1;
        trace!(frame = self.frames, draw_calls = calls.len(), "frame rendered");
        if self.frames % 60 == 0 {
            debug!(frame = self.frames, draw_calls = calls.len(), "render heartbeat");
        }
        self.last = calls;
    }
}
