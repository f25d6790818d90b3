//! Simulation configuration: validated parameters, JSON overlay and schema.
//!
//! A [`FlowConfig`] captures everything needed to reproduce a run: the
//! simulation area, grid resolution, particle count, noise settings, seed and
//! palette. Two identical configs produce bit-identical simulations.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::FlowError;
use crate::grid::VectorGrid;
use crate::palette::Palette;
use crate::particle::Bounds;
use crate::perlin::{LibraryPerlin, NoiseField, ScalarNoise};

const DEFAULT_WIDTH: usize = 800;
const DEFAULT_HEIGHT: usize = 600;
/// Default grid resolution in pixels.
const DEFAULT_CELL_SIZE: f64 = 10.0;
const DEFAULT_PARTICLE_COUNT: usize = 500;
/// Default per-cell increment into noise space.
const DEFAULT_NOISE_STEP: f64 = 0.1;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_PALETTE: &str = "mono";
/// Upper bound on the particle count accepted by [`FlowConfig::validate`].
pub const MAX_PARTICLES: usize = 1_000_000;
/// Upper bound on either side of the simulation area.
pub const MAX_DIMENSION: usize = 16_384;
/// Upper bound on the number of grid cells a configuration may produce.
pub const MAX_GRID_CELLS: usize = 4_000_000;
/// Accepted grid resolutions, in pixels.
pub const CELL_SIZE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=100.0;
/// Accepted noise-space increments per cell.
pub const NOISE_STEP_RANGE: std::ops::RangeInclusive<f64> = 0.001..=1.0;

/// Which generator the vector grid is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseBackend {
    /// Gradient-lattice Perlin noise ([`NoiseField`]).
    #[default]
    Lattice,
    /// The `noise` crate's Perlin generator ([`LibraryPerlin`]).
    Library,
}

impl NoiseBackend {
    const NAMES: &'static [&'static str] = &["lattice", "library"];

    /// Returns `FlowError::UnknownNoiseBackend` for unrecognized names.
    pub fn from_name(name: &str) -> Result<Self, FlowError> {
        match name {
            "lattice" => Ok(NoiseBackend::Lattice),
            "library" => Ok(NoiseBackend::Library),
            other => Err(FlowError::UnknownNoiseBackend(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NoiseBackend::Lattice => "lattice",
            NoiseBackend::Library => "library",
        }
    }

    pub fn list_names() -> &'static [&'static str] {
        Self::NAMES
    }

    /// Creates a generator. The lattice backend pre-generates gradients over
    /// `[0, lattice_width) x [0, lattice_height)` and grows lazily past it.
    pub fn create(self, lattice_width: usize, lattice_height: usize, seed: u64) -> Box<dyn ScalarNoise> {
        match self {
            NoiseBackend::Lattice => Box::new(NoiseField::new(lattice_width, lattice_height, seed)),
            NoiseBackend::Library => Box::new(LibraryPerlin::new(seed)),
        }
    }
}

/// Parameters of a flow-field simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Width of the particle area in pixels.
    pub width: usize,
    /// Height of the particle area in pixels.
    pub height: usize,
    /// Grid resolution: side of one cell in pixels.
    pub cell_size: f64,
    /// Number of particles.
    pub particle_count: usize,
    /// Noise-space increment between adjacent cells. Small values give a
    /// smooth field, large values a turbulent one.
    pub noise_step: f64,
    /// Seed for gradients, spawn positions and particle attributes.
    pub seed: u64,
    /// Noise generator used to build the grid.
    pub noise: NoiseBackend,
    /// Name of the trail palette.
    pub palette: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            cell_size: DEFAULT_CELL_SIZE,
            particle_count: DEFAULT_PARTICLE_COUNT,
            noise_step: DEFAULT_NOISE_STEP,
            seed: DEFAULT_SEED,
            noise: NoiseBackend::default(),
            palette: DEFAULT_PALETTE.to_string(),
        }
    }
}

impl FlowConfig {
    /// Default config for a `width x height` area.
    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Overlays the keys present in `params` on the defaults.
    ///
    /// Keys that are missing or of the wrong JSON type keep their default.
    /// An unknown `noise` name is an error; the result is validated.
    pub fn from_json(params: &Value) -> Result<Self, FlowError> {
        let d = Self::default();
        let noise = match params.get("noise").and_then(Value::as_str) {
            Some(name) => NoiseBackend::from_name(name)?,
            None => d.noise,
        };
        let config = Self {
            width: param_usize(params, "width", d.width),
            height: param_usize(params, "height", d.height),
            cell_size: param_f64(params, "cell_size", d.cell_size),
            particle_count: param_usize(params, "particle_count", d.particle_count),
            noise_step: param_f64(params, "noise_step", d.noise_step),
            seed: params.get("seed").and_then(Value::as_u64).unwrap_or(d.seed),
            noise,
            palette: param_string(params, "palette", &d.palette),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects nonsensical settings: empty or oversized areas, and cell
    /// sizes, noise steps or particle counts outside their schema ranges.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.width == 0 || self.height == 0 {
            return Err(FlowError::InvalidDimensions);
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(FlowError::InvalidConfiguration(format!(
                "area {}x{} exceeds the maximum side of {MAX_DIMENSION}",
                self.width, self.height
            )));
        }
        if !CELL_SIZE_RANGE.contains(&self.cell_size) {
            return Err(FlowError::InvalidConfiguration(format!(
                "cell_size must be in {}..={}, got {}",
                CELL_SIZE_RANGE.start(),
                CELL_SIZE_RANGE.end(),
                self.cell_size
            )));
        }
        if !NOISE_STEP_RANGE.contains(&self.noise_step) {
            return Err(FlowError::InvalidConfiguration(format!(
                "noise_step must be in {}..={}, got {}",
                NOISE_STEP_RANGE.start(),
                NOISE_STEP_RANGE.end(),
                self.noise_step
            )));
        }
        if self.particle_count > MAX_PARTICLES {
            return Err(FlowError::InvalidConfiguration(format!(
                "particle_count {} exceeds the maximum of {MAX_PARTICLES}",
                self.particle_count
            )));
        }
        let (rows, cols) = self.grid_dimensions();
        if rows.saturating_mul(cols) > MAX_GRID_CELLS {
            return Err(FlowError::InvalidConfiguration(format!(
                "grid of {cols}x{rows} cells exceeds the maximum of {MAX_GRID_CELLS}"
            )));
        }
        Palette::from_name(&self.palette)?;
        Ok(())
    }

    /// Spawn area for particles.
    pub fn bounds(&self) -> Result<Bounds, FlowError> {
        Bounds::new(self.width as f64, self.height as f64)
    }

    /// Grid extent `(rows, cols)` for the configured area and cell size.
    pub fn grid_dimensions(&self) -> (usize, usize) {
        VectorGrid::dimensions_for(self.width, self.height, self.cell_size)
    }

    /// Current values as a JSON object.
    pub fn params(&self) -> Value {
        json!({
            "width": self.width,
            "height": self.height,
            "cell_size": self.cell_size,
            "particle_count": self.particle_count,
            "noise_step": self.noise_step,
            "seed": self.seed,
            "noise": self.noise.name(),
            "palette": self.palette,
        })
    }

    /// Types, ranges, defaults and descriptions of every parameter.
    pub fn param_schema() -> Value {
        json!({
            "width": {
                "type": "integer",
                "default": DEFAULT_WIDTH,
                "min": 1,
                "max": MAX_DIMENSION,
                "description": "Width of the particle area in pixels"
            },
            "height": {
                "type": "integer",
                "default": DEFAULT_HEIGHT,
                "min": 1,
                "max": MAX_DIMENSION,
                "description": "Height of the particle area in pixels"
            },
            "cell_size": {
                "type": "number",
                "default": DEFAULT_CELL_SIZE,
                "min": CELL_SIZE_RANGE.start(),
                "max": CELL_SIZE_RANGE.end(),
                "description": "Grid resolution: side of one cell in pixels"
            },
            "particle_count": {
                "type": "integer",
                "default": DEFAULT_PARTICLE_COUNT,
                "min": 0,
                "max": MAX_PARTICLES,
                "description": "Number of particles drifting over the field"
            },
            "noise_step": {
                "type": "number",
                "default": DEFAULT_NOISE_STEP,
                "min": NOISE_STEP_RANGE.start(),
                "max": NOISE_STEP_RANGE.end(),
                "description": "Noise-space increment per cell; larger is more turbulent"
            },
            "seed": {
                "type": "integer",
                "default": DEFAULT_SEED,
                "description": "Seed for gradients and particle spawns"
            },
            "noise": {
                "type": "string",
                "default": NoiseBackend::default().name(),
                "enum": NoiseBackend::list_names(),
                "description": "Noise generator used to build the grid"
            },
            "palette": {
                "type": "string",
                "default": DEFAULT_PALETTE,
                "enum": Palette::list_names(),
                "description": "Trail color palette"
            }
        })
    }
}

fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default.to_owned())
}
