//! Seed patterns for initializing a Life universe.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Predefined patterns for initialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Seed {
    /// Alive where the cell index is even or a multiple of seven.
    #[default]
    Classic,
    /// Every cell dead.
    Empty,
    /// Uniform random population.
    Random {
        /// Probability that a cell starts alive (0.0-1.0).
        density: f32,
        /// Random seed.
        seed: u64,
    },
    /// Explicit list of live cells.
    Cells {
        /// List of (row, col) entries.
        cells: Vec<(u32, u32)>,
    },
}

impl Seed {
    /// Check the pattern against the grid it will be applied to.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), ConfigError> {
        match self {
            Seed::Classic | Seed::Empty => Ok(()),
            Seed::Random { density, .. } => {
                if (0.0..=1.0).contains(density) {
                    Ok(())
                } else {
                    Err(ConfigError::InvalidDensity(*density))
                }
            }
            Seed::Cells { cells } => {
                match cells.iter().find(|&&(row, col)| row >= height || col >= width) {
                    Some(&(row, col)) => Err(ConfigError::SeedOutOfRange {
                        row,
                        col,
                        width,
                        height,
                    }),
                    None => Ok(()),
                }
            }
        }
    }

    /// Generate the row-major initial state, one byte per cell (0 dead, 1 alive).
    ///
    /// Out-of-range entries of `Cells` are skipped; call [`Seed::validate`]
    /// first to reject them instead.
    pub fn generate(&self, width: u32, height: u32) -> Vec<u8> {
        let size = width as usize * height as usize;

        match self {
            Seed::Classic => (0..size)
                .map(|i| u8::from(i % 2 == 0 || i % 7 == 0))
                .collect(),
            Seed::Empty => vec![0; size],
            Seed::Random { density, seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                let p = f64::from(density.clamp(0.0, 1.0));
                (0..size).map(|_| u8::from(rng.gen_bool(p))).collect()
            }
            Seed::Cells { cells } => {
                let mut grid = vec![0; size];
                for &(row, col) in cells {
                    if row < height && col < width {
                        grid[row as usize * width as usize + col as usize] = 1;
                    }
                }
                grid
            }
        }
    }
}
