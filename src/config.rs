//! Simulation configuration.
//!
//! Everything that sizes or paces a simulation lives in [`SimulationConfig`]:
//! pool capacity, the fixed timestep, the accumulator ceiling, the physics
//! environment and the window the reference renderer opens. Configs load
//! from TOML; missing keys keep their defaults.
//!
//! ```toml
//! capacity = 2000
//! timestep = 0.006944444444444444
//! max_accumulator = 0.2
//! gravity = [0.0, -9.81]
//!
//! [window]
//! title = "Particle Engine"
//! width = 1280
//! height = 720
//! ```

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::particle::{Bounds, Environment};
use crate::time::{DEFAULT_MAX_ACCUMULATOR, DEFAULT_TIMESTEP};

/// Window and camera settings for the reference renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Screen pixels per world unit. 100 maps a 1280x720 window to
    /// x in [-6.4, 6.4], y in [-3.6, 3.6].
    pub pixels_per_unit: f32,
    /// Edge length of each particle quad in world units.
    pub particle_size: f32,
    /// Background color, linear RGB.
    pub clear_color: [f64; 3],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Particle Engine".to_string(),
            width: 1280,
            height: 720,
            pixels_per_unit: 100.0,
            particle_size: 0.1,
            clear_color: [0.02, 0.02, 0.05],
        }
    }
}

impl WindowConfig {
    /// Half width and half height of the visible world.
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32) / (2.0 * self.pixels_per_unit)
    }
}

/// Top-level simulation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of particle slots. Fixes the instance buffer sizes.
    pub capacity: usize,
    /// Fixed step size in seconds.
    pub timestep: f64,
    /// Most frame time carried into a single frame, in seconds.
    pub max_accumulator: f64,
    /// Acceleration per unit of particle density.
    pub gravity: Vec2,
    /// Reflect particles off the world edges.
    pub bounce_walls: bool,
    /// World rectangle for wall bounces. Defaults to the visible window area.
    pub bounds: Option<Bounds>,
    pub window: WindowConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            timestep: DEFAULT_TIMESTEP,
            max_accumulator: DEFAULT_MAX_ACCUMULATOR,
            gravity: Vec2::new(0.0, -9.81),
            bounce_walls: true,
            bounds: None,
            window: WindowConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Read and validate a TOML config file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values no simulation can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if u32::try_from(self.capacity).is_err() {
            return Err(ConfigError::Invalid(format!(
                "capacity {} does not fit an instance count",
                self.capacity
            )));
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timestep must be positive, got {}",
                self.timestep
            )));
        }
        if !(self.max_accumulator.is_finite() && self.max_accumulator >= self.timestep) {
            return Err(ConfigError::Invalid(format!(
                "max_accumulator ({}) must be at least the timestep ({})",
                self.max_accumulator, self.timestep
            )));
        }
        if self.window.width == 0 || self.window.height == 0 || self.window.pixels_per_unit <= 0.0 {
            return Err(ConfigError::Invalid("window size must be non-zero".into()));
        }
        Ok(())
    }

    /// Wall rectangle in effect, if walls are enabled.
    pub fn world_bounds(&self) -> Option<Bounds> {
        self.bounce_walls.then(|| {
            self.bounds
                .unwrap_or_else(|| Bounds::centered(self.window.half_extents()))
        })
    }

    /// Physics environment handed to the particle pool.
    pub fn environment(&self) -> Environment {
        Environment {
            gravity: self.gravity,
            bounds: self.world_bounds(),
        }
    }
}
