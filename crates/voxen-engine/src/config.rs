//! Engine configuration (`voxen.toml`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use voxen_common::ConfigError;
use voxen_world::WorldConfig;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "voxen.toml";

/// Settings for the headless driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World and pipeline settings
    pub world: WorldConfig,
    /// Replace the terrain seed with a random one at startup
    pub random_seed: bool,
    /// Number of ticks to run
    pub ticks: u64,
    /// Sleep between ticks
    pub tick_interval_ms: u64,
    /// Viewer start position in world units
    pub viewer_start: [f32; 3],
    /// Viewer movement along +X per tick, in world units
    pub viewer_speed: f32,
    /// Log pipeline statistics every this many ticks (0 disables)
    pub stats_interval: u64,
    /// World file read before the first tick
    pub load_path: Option<PathBuf>,
    /// Keep creating new chunks after a world file was loaded
    pub generate_after_load: bool,
    /// World file written after the last tick, with its config beside it
    pub save_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            random_seed: false,
            ticks: 600,
            tick_interval_ms: 16,
            viewer_start: [8.0, 24.0, 8.0],
            viewer_speed: 0.5,
            stats_interval: 60,
            load_path: None,
            generate_after_load: false,
            save_path: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// an error, as is a configuration that fails validation.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.world.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Writes this config beside a world file, pinned to its current seed.
    ///
    /// `saves/world.dat` gets `saves/world.config.toml`. Returns the path written.
    pub fn save_beside<P: AsRef<Path>>(&self, world_path: P) -> io::Result<PathBuf> {
        let path = world_path.as_ref().with_extension("config.toml");
        let pinned = Self {
            random_seed: false,
            ..self.clone()
        };
        pinned.save_to(&path)?;
        Ok(path)
    }

    /// Applies `random_seed`, returning the seed the world will use.
    pub fn resolve_seed(&mut self) -> u32 {
        if self.random_seed {
            self.world.terrain.seed = fastrand::u32(..);
        }
        self.world.terrain.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use voxen_world::MeshingTechnique;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let config = EngineConfig::load_from(dir.path().join(CONFIG_FILE)).expect("load");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = EngineConfig::default();
        config.ticks = 42;
        config.world.render_distance = 3;
        config.world.meshing_technique = MeshingTechnique::Simple;
        config.save_path = Some(PathBuf::from("saves/world.dat"));
        config.save_to(&path).expect("save");

        let loaded = EngineConfig::load_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "ticks = \"many\"").expect("write");
        assert!(matches!(EngineConfig::load_from(&path), Err(ConfigError::Parse(_))));

        fs::write(&path, "[world]\nrender_distance = 0\n").expect("write");
        assert!(matches!(
            EngineConfig::load_from(&path),
            Err(ConfigError::ZeroRenderDistance)
        ));
    }

    #[test]
    fn test_save_beside_pins_random_seed() {
        let dir = TempDir::new().expect("temp dir");
        let world = dir.path().join("saves").join("world.dat");

        let mut config = EngineConfig {
            random_seed: true,
            ..EngineConfig::default()
        };
        let seed = config.resolve_seed();
        let path = config.save_beside(&world).expect("save");
        assert_eq!(path, dir.path().join("saves").join("world.config.toml"));

        let mut reloaded = EngineConfig::load_from(&path).expect("load");
        assert!(!reloaded.random_seed);
        assert_eq!(reloaded.resolve_seed(), seed);
    }

    #[test]
    fn test_resolve_seed() {
        let mut config = EngineConfig::default();
        config.world.terrain.seed = 7;
        assert_eq!(config.resolve_seed(), 7);

        config.random_seed = true;
        let seed = config.resolve_seed();
        assert_eq!(config.world.terrain.seed, seed);
    }
}
