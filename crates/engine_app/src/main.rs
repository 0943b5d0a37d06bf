//! # engine_app
//!
//! Runs the demo scene headless at a fixed frame rate.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging from `RUST_LOG` plus `engine_app=info`.
//! 2. Build the world: component registry, player, enemies, systems.
//! 3. Run the frame loop until `--frames` or the player dies.
//! 4. Report the score and optionally write a world snapshot.

mod driver;
mod game;
mod input;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use engine_ecs::{World, WorldSnapshot};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use driver::{DriverConfig, FrameDriver};
use game::scene::{self, SceneConfig};
use game::score;
use input::InputState;
use render::LogRenderer;

#[derive(Parser)]
#[command(name = "engine_app", about = "Frame-driven ECS demo")]
struct Args {
    /// Target frames per second
    #[arg(long, default_value_t = 60.0, value_parser = parse_tick_rate)]
    tick_rate: f64,

    /// Frames to run (0 = until the player dies)
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Number of enemies kept alive
    #[arg(long, default_value_t = 5)]
    enemies: usize,

    /// Write a world snapshot here on exit (`.msgpack` for MessagePack,
    /// anything else for JSON)
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    info!(
        tick_rate = args.tick_rate,
        frames = args.frames,
        enemies = args.enemies,
        "engine_app starting"
    );

    let config = DriverConfig {
        tick_rate: args.tick_rate,
        max_frames: args.frames,
    };
    let input = InputState::shared();
    let world = World::with_registry(scene::registry());
    let mut driver = FrameDriver::new(config, world, input.clone(), LogRenderer::new())
        .with_input_source(scene::demo_script(args.frames));

    let stop = driver.stop_flag();
    let scene_config = SceneConfig {
        enemies: args.enemies,
        ..SceneConfig::default()
    };
    let game = scene::build(driver.world_mut(), &scene_config, input, stop);
    let _ = game.score.once(score::PLAYER_DIED, |_| warn!("player died, stopping"));

    if let Err(e) = driver.run() {
        error!(%e, frame = driver.frame(), "frame loop aborted");
    }

    let stats = driver.world().stats();
    let totals = game.scoreboard.detach();
    info!(
        frames = driver.frame(),
        score = totals.score,
        kills = totals.kills,
        hits_taken = totals.hits_taken,
        player_alive = driver.world().has_entity(game.player),
        entities = stats.entities,
        draw_calls = driver.renderer().draw_calls().len(),
        "run finished"
    );
    println!("{}", serde_json::to_string(&totals)?);

    if let Some(path) = &args.snapshot {
        let snapshot = driver.world().snapshot()?;
        write_snapshot(&snapshot, path)?;
        info!(path = %path.display(), entities = snapshot.entities.len(), "snapshot written");
    }

    driver.into_world().destroy();
    Ok(())
}

fn parse_tick_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("expected a positive frame rate, got {rate}"))
    }
}

fn write_snapshot(snapshot: &WorldSnapshot, path: &Path) -> Result<()> {
    let bytes = if path.extension().is_some_and(|ext| ext == "msgpack") {
        snapshot.to_msgpack()?
    } else {
        snapshot.to_json()?.into_bytes()
    };
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
