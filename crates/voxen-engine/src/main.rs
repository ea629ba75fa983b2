//! # Voxen Engine
//!
//! Headless driver for the Voxen voxel world.
//!
//! Streams chunks around a viewer that moves along +X, logging pipeline
//! statistics as it goes. Usage: `voxen [config.toml]`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;

use anyhow::{Context, Result};
use glam::Vec3;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use voxen_world::{ChunkManager, CpuModelFactory, GameObjectMap};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("voxen=info".parse()?))
        .init();

    info!("Voxen starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    let mut config = EngineConfig::load_from(&config_path)
        .with_context(|| format!("loading {config_path}"))?;
    let seed = config.resolve_seed();
    info!("World seed: {seed}");

    run(&config)?;

    info!("Voxen shutdown complete");
    Ok(())
}

fn run(config: &EngineConfig) -> Result<()> {
    let mut manager = ChunkManager::new(&config.world, Box::new(CpuModelFactory))?;

    if let Some(path) = &config.load_path {
        let count = manager
            .load_from_file(path)
            .with_context(|| format!("loading world {}", path.display()))?;
        info!("Restored {count} chunks from {}", path.display());
        manager.set_generate_chunks(config.generate_after_load);
    }

    let mut live = GameObjectMap::default();
    let mut viewer = Vec3::from(config.viewer_start);
    let interval = Duration::from_millis(config.tick_interval_ms);
    let started = Instant::now();

    for tick in 0..config.ticks {
        manager.update(viewer, config.world.render_distance, &mut live);
        viewer.x += config.viewer_speed;

        if config.stats_interval > 0 && tick % config.stats_interval == 0 {
            let stats = manager.stats();
            info!(
                "tick {tick}: {} loaded, {} active, {} triangles, pending {}/{}/{}",
                stats.loaded_chunks,
                stats.active_chunks,
                stats.triangles(),
                stats.pending_creation,
                stats.pending_terrain,
                stats.pending_mesh
            );
        }

        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    let stats = manager.stats();
    info!(
        "Ran {} ticks in {:.2?}: {} chunks loaded, {} live objects, {} vertices",
        config.ticks,
        started.elapsed(),
        stats.loaded_chunks,
        live.len(),
        stats.vertices
    );

    if let Some(path) = &config.save_path {
        manager
            .save_to_file(path)
            .with_context(|| format!("saving world {}", path.display()))?;
        let config_path = config
            .save_beside(path)
            .with_context(|| format!("saving config beside {}", path.display()))?;
        info!("World config written to {}", config_path.display());
    }

    manager.shutdown();
    Ok(())
}
