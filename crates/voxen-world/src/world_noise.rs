//! Seeded multi-channel octave noise.

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Independent noise fields sampled by world generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseChannel {
    /// Surface elevation
    Elevation,
    /// Climate temperature
    Temperature,
    /// Climate humidity
    Humidity,
    /// River courses
    Rivers,
    /// Cave carving density
    Caves,
    /// Ore distribution
    Ore,
}

impl NoiseChannel {
    /// All channels, in index order.
    pub const ALL: [Self; 6] = [
        Self::Elevation,
        Self::Temperature,
        Self::Humidity,
        Self::Rivers,
        Self::Caves,
        Self::Ore,
    ];

    /// Stable index in `0..6`, also the seed offset of the channel.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Fractal octave parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Octaves {
    /// Base frequency (cycles per voxel)
    pub frequency: f64,
    /// Number of layered octaves
    pub count: u32,
    /// Amplitude multiplier per octave
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
}

impl Octaves {
    /// A single octave at the given frequency.
    #[must_use]
    pub const fn single(frequency: f64) -> Self {
        Self {
            frequency,
            count: 1,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl Default for Octaves {
    fn default() -> Self {
        Self {
            frequency: 0.02,
            count: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Seeded noise source with one Perlin field per [`NoiseChannel`].
#[derive(Clone)]
pub struct WorldNoise {
    seed: u32,
    channels: [Perlin; 6],
}

impl std::fmt::Debug for WorldNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldNoise")
            .field("seed", &self.seed)
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl WorldNoise {
    /// Creates the channels; channel `i` is seeded with `seed + i`.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            channels: std::array::from_fn(|i| Perlin::new(seed.wrapping_add(i as u32))),
        }
    }

    /// Returns the base seed.
    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.seed
    }

    /// Octave noise at a horizontal position, normalized to `[0, 1]`.
    #[must_use]
    pub fn octave_2d(&self, channel: NoiseChannel, x: f64, z: f64, octaves: Octaves) -> f64 {
        let field = &self.channels[channel.index()];
        Self::accumulate(octaves, |f| field.get([x * f, z * f]))
    }

    /// Octave noise at a 3D position, normalized to `[0, 1]`.
    #[must_use]
    pub fn octave_3d(&self, channel: NoiseChannel, pos: [f64; 3], octaves: Octaves) -> f64 {
        let field = &self.channels[channel.index()];
        Self::accumulate(octaves, |f| field.get([pos[0] * f, pos[1] * f, pos[2] * f]))
    }

    fn accumulate(octaves: Octaves, sample: impl Fn(f64) -> f64) -> f64 {
        let mut total = 0.0;
        let mut norm = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = octaves.frequency;
        for _ in 0..octaves.count.max(1) {
            total += sample(frequency) * amplitude;
            norm += amplitude;
            amplitude *= octaves.persistence;
            frequency *= octaves.lacunarity;
        }
        ((total / norm + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octave_noise_is_normalized() {
        let noise = WorldNoise::new(7);
        for channel in NoiseChannel::ALL {
            for i in 0..200 {
                let x = f64::from(i) * 3.7;
                let v2 = noise.octave_2d(channel, x, -x * 0.5, Octaves::default());
                let v3 = noise.octave_3d(channel, [x, 1.5 * x, -x], Octaves::default());
                assert!((0.0..=1.0).contains(&v2));
                assert!((0.0..=1.0).contains(&v3));
            }
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let noise = WorldNoise::new(7);
        let differs = (0..50).any(|i| {
            let x = f64::from(i) * 5.3 + 0.25;
            let a = noise.octave_2d(NoiseChannel::Temperature, x, x, Octaves::default());
            let b = noise.octave_2d(NoiseChannel::Humidity, x, x, Octaves::default());
            (a - b).abs() > 1e-6
        });
        assert!(differs);
    }

    #[test]
    fn test_same_seed_same_values() {
        let a = WorldNoise::new(42);
        let b = WorldNoise::new(42);
        let v = |n: &WorldNoise| {
            n.octave_2d(NoiseChannel::Elevation, 12.3, 45.6, Octaves::default())
        };
        assert_eq!(v(&a).to_bits(), v(&b).to_bits());
        assert_eq!(a.seed(), 42);
    }
}
