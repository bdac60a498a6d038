//! Configuration types for a Life session.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Color, Seed};

/// Tick interval for a 30 Hz simulation, in milliseconds.
pub const TICK_INTERVAL_30HZ: f64 = 1000.0 / 30.0;

/// Tick interval for a 60 Hz simulation, in milliseconds.
pub const TICK_INTERVAL_60HZ: f64 = 1000.0 / 60.0;

fn default_dead_color() -> Color {
    Color::WHITE
}

fn default_alive_color() -> Color {
    Color::BLACK
}

fn default_tick_interval() -> f64 {
    TICK_INTERVAL_30HZ
}

/// Top-level session configuration.
///
/// `width` and `height` are grid extents in cells, not pixels. Each cell is
/// drawn as a `cell_size` square separated from its neighbours by a 1px
/// grid line, so the drawable is `(cell_size + 1) * extent + 1` pixels wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Pixel edge of one cell, excluding the grid line.
    pub cell_size: u32,
    /// Background and dead-cell color.
    #[serde(default = "default_dead_color")]
    pub dead_color: Color,
    /// Live-cell color.
    #[serde(default = "default_alive_color")]
    pub alive_color: Color,
    /// Wall-clock interval between simulation ticks, in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: f64,
    /// Initial population.
    #[serde(default)]
    pub seed: Seed,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            cell_size: 2,
            dead_color: default_dead_color(),
            alive_color: default_alive_color(),
            tick_interval_ms: default_tick_interval(),
            seed: Seed::default(),
        }
    }
}

impl SessionConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Get total grid size (width * height).
    #[inline]
    pub fn grid_size(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Pitch between the top-left corners of neighbouring cells, in pixels.
    #[inline]
    pub fn cell_pitch(&self) -> u32 {
        self.cell_size + 1
    }

    /// Drawable size in pixels, or `None` if it does not fit in `u32`.
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        let pitch = self.cell_size.checked_add(1)?;
        let extent = |cells: u32| pitch.checked_mul(cells)?.checked_add(1);
        Some((extent(self.width)?, extent(self.height)?))
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.cell_size == 0 {
            return Err(ConfigError::InvalidCellSize);
        }
        if !(self.tick_interval_ms.is_finite() && self.tick_interval_ms > 0.0) {
            return Err(ConfigError::InvalidTickInterval(self.tick_interval_ms));
        }
        if self.surface_size().is_none() {
            return Err(ConfigError::SurfaceTooLarge {
                width: self.width,
                height: self.height,
                cell_size: self.cell_size,
            });
        }
        self.seed.validate(self.width, self.height)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions (width, height) must be non-zero")]
    InvalidDimensions,
    #[error("Cell size must be non-zero")]
    InvalidCellSize,
    #[error("Tick interval must be a positive number of milliseconds, got {0}")]
    InvalidTickInterval(f64),
    #[error("Drawable for {width}x{height} cells of size {cell_size} does not fit in u32")]
    SurfaceTooLarge {
        width: u32,
        height: u32,
        cell_size: u32,
    },
    #[error("Invalid color {0:?}, expected #RRGGBB or #RGB")]
    InvalidColor(String),
    #[error("Seed density must be within [0, 1], got {0}")]
    InvalidDensity(f32),
    #[error("Seed cell ({row}, {col}) lies outside the {width}x{height} grid")]
    SeedOutOfRange {
        row: u32,
        col: u32,
        width: u32,
        height: u32,
    },
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}
