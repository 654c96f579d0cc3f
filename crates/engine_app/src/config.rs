//! Demo configuration: JSON file plus command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use engine_system::TickConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(name = "engine_app", about = "ECS demo: moving boxes with bounds and collisions")]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop after this many ticks (0 runs until Ctrl-C)
    #[arg(short, long)]
    pub ticks: Option<u64>,

    /// Number of entities to generate
    #[arg(short, long)]
    pub entities: Option<usize>,

    /// Seed for the world generator
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Generated world parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub entities: usize,
    pub seed: u64,
    /// Half-size of the cube entities bounce around in.
    pub extent: f32,
    pub max_speed: f32,
    /// Base half extent of each box.
    pub half_size: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entities: 64,
            seed: 1,
            extent: 20.0,
            max_speed: 4.0,
            half_size: 0.5,
        }
    }
}

/// Collision aggregation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub window_ms: u64,
    /// Shallower overlaps are not reported.
    pub min_depth: f32,
    /// Extra half extent used in overlap tests.
    pub margin: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            window_ms: 500,
            min_depth: 0.05,
            margin: 0.0,
        }
    }
}

/// Top-level demo configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tick: TickConfig,
    pub world: WorldConfig,
    pub collisions: CollisionConfig,
}

impl AppConfig {
    /// Read a JSON config file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Defaults or the file named by `--config`, then CLI overrides.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or invalid configuration.
    pub fn load(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(ticks) = args.ticks {
            config.tick.max_ticks = ticks;
        }
        if let Some(entities) = args.entities {
            config.world.entities = entities;
        }
        if let Some(seed) = args.seed {
            config.world.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Fails if any section is out of range.
    pub fn validate(&self) -> Result<()> {
        self.tick.validate()?;
        ensure!(self.world.extent > 0.0, "world.extent must be positive");
        ensure!(self.world.half_size > 0.0, "world.half_size must be positive");
        ensure!(self.collisions.window_ms > 0, "collisions.window_ms must be non-zero");
        Ok(())
    }
}
