//! Procedural terrain generation.

use serde::{Deserialize, Serialize};
use voxen_common::{ChunkCoord, ConfigError, CHUNK_SIZE, CHUNK_SIZE_I32, CHUNK_VOLUME};

use crate::block::{Block, BlockType};
use crate::chunk::block_index;
use crate::world_noise::{NoiseChannel, Octaves, WorldNoise};

/// Largest absolute height, scale or depth accepted in a [`TerrainConfig`].
pub const MAX_TERRAIN_HEIGHT: f64 = 1_000_000.0;

/// Terrain generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World seed
    pub seed: u32,
    /// Elevation octaves
    pub elevation: Octaves,
    /// Surface swing above and below `base_height`
    pub height_scale: f64,
    /// Mean surface height in voxels
    pub base_height: f64,
    /// Normalized mountain noise above which peaks rise
    pub mountain_threshold: f64,
    /// Extra height per unit of mountain noise over the threshold
    pub mountain_scale: f64,
    /// Depth of the dirt layer under the surface block
    pub soil_depth: u32,
    /// Water fills air at or below this height
    pub sea_level: i32,
    /// Frequency of the temperature/humidity fields
    pub climate_frequency: f64,
    /// Half-width of river bands in normalized noise units
    pub river_width: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            elevation: Octaves::default(),
            height_scale: 6.0,
            base_height: (CHUNK_SIZE / 2) as f64,
            mountain_threshold: 0.6,
            mountain_scale: 24.0,
            soil_depth: 3,
            sea_level: 4,
            climate_frequency: 0.004,
            river_width: 0.015,
        }
    }
}

impl TerrainConfig {
    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.elevation;
        if e.count == 0 || e.count > 16 {
            return Err(ConfigError::InvalidTerrain(format!(
                "octave count {} outside 1..=16",
                e.count
            )));
        }
        for (name, value) in [
            ("frequency", e.frequency),
            ("lacunarity", e.lacunarity),
            ("climate_frequency", self.climate_frequency),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTerrain(format!(
                    "{name} {value} must be positive"
                )));
            }
        }
        if !(e.persistence > 0.0 && e.persistence <= 1.0) {
            return Err(ConfigError::InvalidTerrain(format!(
                "persistence {} outside (0, 1]",
                e.persistence
            )));
        }
        if !(0.0..1.0).contains(&self.mountain_threshold) {
            return Err(ConfigError::InvalidTerrain(format!(
                "mountain threshold {} outside [0, 1)",
                self.mountain_threshold
            )));
        }
        for (name, value) in [
            ("height_scale", self.height_scale),
            ("mountain_scale", self.mountain_scale),
            ("river_width", self.river_width),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidTerrain(format!(
                    "{name} {value} must be non-negative"
                )));
            }
        }
        // Surface heights are computed in f64 and stored as i32.
        let heights = [
            ("base_height", self.base_height),
            ("height_scale", self.height_scale),
            ("mountain_scale", self.mountain_scale),
            ("sea_level", f64::from(self.sea_level)),
            ("soil_depth", f64::from(self.soil_depth)),
        ];
        for (name, value) in heights {
            if !(value.is_finite() && value.abs() <= MAX_TERRAIN_HEIGHT) {
                return Err(ConfigError::InvalidTerrain(format!(
                    "{name} {value} outside +/-{MAX_TERRAIN_HEIGHT}"
                )));
            }
        }
        Ok(())
    }
}

/// Deterministic terrain generator.
///
/// Output depends only on the chunk coordinate and the configuration, so two
/// generators with equal configs fill identical block arrays.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    config: TerrainConfig,
    noise: WorldNoise,
    /// Lowest possible surface height
    min_surface: i32,
    /// Highest possible surface height
    max_surface: i32,
}

impl TerrainGenerator {
    /// Creates a generator with the given config.
    #[must_use]
    pub fn new(config: TerrainConfig) -> Self {
        let low = (config.base_height - config.height_scale).min(f64::from(config.sea_level) - 1.0);
        let high = config.base_height
            + config.height_scale
            + (1.0 - config.mountain_threshold) * config.mountain_scale;
        Self {
            noise: WorldNoise::new(config.seed),
            min_surface: low.floor() as i32,
            max_surface: high.ceil() as i32,
            config,
        }
    }

    /// Creates a generator with default config.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self::new(TerrainConfig {
            seed,
            ..Default::default()
        })
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Returns the noise source.
    #[must_use]
    pub const fn noise(&self) -> &WorldNoise {
        &self.noise
    }

    /// Surface height of the column at world voxel `(x, z)`.
    #[must_use]
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let c = &self.config;
        let (fx, fz) = (f64::from(x), f64::from(z));
        let elevation = self.noise.octave_2d(NoiseChannel::Elevation, fx, fz, c.elevation);
        let mut height = c.base_height + (elevation * 2.0 - 1.0) * c.height_scale;

        let mountains = Octaves {
            frequency: c.elevation.frequency * 0.5,
            ..c.elevation
        };
        let m = self.noise.octave_2d(NoiseChannel::Elevation, fx, fz, mountains);
        if m > c.mountain_threshold {
            height += (m - c.mountain_threshold) * c.mountain_scale;
        }

        let river = self
            .noise
            .octave_2d(NoiseChannel::Rivers, fx, fz, Octaves::single(c.elevation.frequency * 0.5));
        if (river - 0.5).abs() < c.river_width {
            height = height.min(f64::from(c.sea_level) - 1.0);
        }

        (height.floor() as i32).clamp(self.min_surface, self.max_surface)
    }

    /// Block type exposed at the top of a column.
    fn surface_block(&self, height: i32, x: i32, z: i32) -> BlockType {
        if height <= self.config.sea_level + 1 {
            return BlockType::Sand;
        }
        let climate = Octaves::single(self.config.climate_frequency);
        let (fx, fz) = (f64::from(x), f64::from(z));
        let temperature = self.noise.octave_2d(NoiseChannel::Temperature, fx, fz, climate);
        let humidity = self.noise.octave_2d(NoiseChannel::Humidity, fx, fz, climate);
        if temperature > 0.65 && humidity < 0.35 {
            BlockType::Sand
        } else {
            BlockType::Grass
        }
    }

    /// Block at world height `y` in a column whose surface is at `height`.
    fn column_block(&self, y: i32, height: i32, surface: BlockType) -> BlockType {
        let soil = self.config.soil_depth as i32;
        if y < height - soil {
            BlockType::Stone
        } else if y < height {
            BlockType::Dirt
        } else if y == height {
            surface
        } else if y <= self.config.sea_level {
            BlockType::Water
        } else {
            BlockType::Air
        }
    }

    /// Returns the fill of a chunk lying entirely above or below the terrain band.
    #[must_use]
    pub fn uniform_fill(&self, coord: ChunkCoord) -> Option<BlockType> {
        let [_, bottom, _] = coord.world_origin();
        let top = bottom + CHUNK_SIZE_I32 - 1;
        if bottom > self.max_surface.max(self.config.sea_level) {
            Some(BlockType::Air)
        } else if top < self.min_surface - self.config.soil_depth as i32 {
            Some(BlockType::Stone)
        } else {
            None
        }
    }

    /// Fills `blocks` with the terrain of the chunk at `coord`.
    pub fn generate(&self, coord: ChunkCoord, blocks: &mut [Block; CHUNK_VOLUME]) {
        if let Some(fill) = self.uniform_fill(coord) {
            blocks.fill(Block::new(fill));
            return;
        }

        let [ox, oy, oz] = coord.world_origin();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let (wx, wz) = (ox + x as i32, oz + z as i32);
                let height = self.surface_height(wx, wz);
                let surface = if (oy..oy + CHUNK_SIZE_I32).contains(&height) {
                    self.surface_block(height, wx, wz)
                } else {
                    BlockType::Grass
                };
                for y in 0..CHUNK_SIZE {
                    let block_type = self.column_block(oy + y as i32, height, surface);
                    blocks[block_index(x, y, z)] = Block::new(block_type);
                }
            }
        }
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new(TerrainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(generator: &TerrainGenerator, coord: ChunkCoord) -> Box<[Block; CHUNK_VOLUME]> {
        let mut blocks = Box::new([Block::AIR; CHUNK_VOLUME]);
        generator.generate(coord, &mut blocks);
        blocks
    }

    #[test]
    fn test_generation_deterministic() {
        let gen1 = TerrainGenerator::with_seed(42);
        let gen2 = TerrainGenerator::with_seed(42);
        for coord in [ChunkCoord::new(0, 0, 0), ChunkCoord::new(-3, 0, 7)] {
            assert_eq!(generate(&gen1, coord), generate(&gen2, coord));
        }
    }

    #[test]
    fn test_different_seeds_different_terrain() {
        let gen1 = TerrainGenerator::with_seed(42);
        let gen2 = TerrainGenerator::with_seed(999);
        let differs = (0..4).any(|i| {
            let coord = ChunkCoord::new(i, 0, -i);
            generate(&gen1, coord) != generate(&gen2, coord)
        });
        assert!(differs);
    }

    #[test]
    fn test_fast_paths() {
        let generator = TerrainGenerator::default();
        assert_eq!(generator.uniform_fill(ChunkCoord::new(0, 10, 0)), Some(BlockType::Air));
        assert_eq!(generator.uniform_fill(ChunkCoord::new(5, -4, 2)), Some(BlockType::Stone));
        assert_eq!(generator.uniform_fill(ChunkCoord::new(0, 0, 0)), None);

        let sky = generate(&generator, ChunkCoord::new(3, 10, 3));
        assert!(sky.iter().all(|b| b.is_air()));
        let deep = generate(&generator, ChunkCoord::new(3, -4, 3));
        assert!(deep.iter().all(|b| b.block_type == BlockType::Stone));
    }

    #[test]
    fn test_columns_are_layered() {
        let generator = TerrainGenerator::default();
        let blocks = generate(&generator, ChunkCoord::new(1, 0, 1));
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let mut seen_air = false;
                for y in 0..CHUNK_SIZE {
                    let block = blocks[block_index(x, y, z)].block_type;
                    if seen_air {
                        assert_eq!(block, BlockType::Air, "solid above air at ({x}, {y}, {z})");
                    }
                    seen_air |= block.is_air();
                }
            }
        }
    }

    #[test]
    fn test_surface_within_band() {
        let generator = TerrainGenerator::default();
        for i in -20..20 {
            let h = generator.surface_height(i * 7, i * -13);
            assert!(h >= generator.min_surface && h <= generator.max_surface);
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(TerrainConfig::default().validate().is_ok());
        let mut config = TerrainConfig::default();
        config.elevation.count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTerrain(_))));
        let mut config = TerrainConfig::default();
        config.mountain_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let setters: [(&str, fn(&mut TerrainConfig, f64)); 8] = [
            ("base_height", |c, v| c.base_height = v),
            ("height_scale", |c, v| c.height_scale = v),
            ("mountain_scale", |c, v| c.mountain_scale = v),
            ("climate_frequency", |c, v| c.climate_frequency = v),
            ("river_width", |c, v| c.river_width = v),
            ("frequency", |c, v| c.elevation.frequency = v),
            ("lacunarity", |c, v| c.elevation.lacunarity = v),
            ("persistence", |c, v| c.elevation.persistence = v),
        ];
        for (name, set) in setters {
            for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                let mut config = TerrainConfig::default();
                set(&mut config, value);
                assert!(
                    matches!(config.validate(), Err(ConfigError::InvalidTerrain(_))),
                    "{name} = {value} accepted"
                );
            }
        }
    }

    #[test]
    fn test_nan_base_height_from_toml_is_rejected() {
        let config: TerrainConfig = toml::from_str("base_height = nan").expect("parse");
        assert!(config.base_height.is_nan());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_heights_are_rejected() {
        let mut config = TerrainConfig::default();
        config.base_height = -1e12;
        assert!(config.validate().is_err());

        let mut config = TerrainConfig::default();
        config.sea_level = i32::MAX;
        assert!(config.validate().is_err());

        let mut config = TerrainConfig::default();
        config.soil_depth = u32::MAX;
        assert!(config.validate().is_err());

        let mut config = TerrainConfig::default();
        config.base_height = -40.0;
        config.sea_level = -50;
        assert!(config.validate().is_ok());
    }
}
