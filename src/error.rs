//! Error types for the particle engine.
//!
//! Errors are split by the layer that raises them: the particle pool,
//! the component tree, configuration loading, GPU setup, and the windowed
//! runner that ties everything together.

use crate::component::ComponentId;
use crate::manager::ParticleHandle;

/// Errors raised by the [`ParticleManager`](crate::ParticleManager).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Every slot is live. Raise the capacity or let particles expire.
    #[error("particle pool exhausted: all {capacity} slots are live")]
    Exhausted {
        /// Fixed capacity of the pool.
        capacity: usize,
    },
    /// An output array cannot hold the live set.
    #[error(
        "instance output too small: {live} live particles but positions holds {positions} and colors holds {colors}"
    )]
    OutputTooSmall {
        /// Number of live particles that may be written.
        live: usize,
        /// Length of the positions array supplied.
        positions: usize,
        /// Length of the colors array supplied.
        colors: usize,
    },
}

/// Errors raised when attaching particles to a [`Component`](crate::Component).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// The particle is already propagated by another component.
    #[error("particle {handle:?} is already owned by component {owner:?}")]
    AlreadyOwned {
        /// Handle that was being attached.
        handle: ParticleHandle,
        /// Component currently holding it.
        owner: ComponentId,
    },
    /// The handle points at a slot that has been recycled or was never live.
    #[error("particle handle {0:?} is stale")]
    StaleHandle(ParticleHandle),
}

/// Configuration loading and validation errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed into a configuration.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize a configuration.
    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed fine but makes no sense for a simulation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during GPU initialization.
#[derive(thiserror::Error, Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reported no usable texture format.
    #[error("GPU surface has no supported formats")]
    NoSurfaceFormat,
}

/// Errors that can occur when running a simulation.
#[derive(thiserror::Error, Debug)]
pub enum SimulationError {
    /// Failed to create or run the event loop.
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The particle pool rejected an operation.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
