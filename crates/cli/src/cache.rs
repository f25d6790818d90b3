//! On-disk cache of built vector grids.
//!
//! The cache is a JSON [`CachedGrid`]: the grid plus the seed and noise
//! backend it was sampled from. It is only reused when all of those, the cell
//! size, the noise step and the extent match the requested configuration;
//! anything else (missing file, unreadable JSON, invalid or mismatched grid)
//! rebuilds from noise and rewrites the file.

use flow_field_core::{FlowConfig, NoiseBackend, ParticleField, VectorGrid};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CliError;

/// A vector grid tagged with the noise settings that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedGrid {
    pub seed: u64,
    pub noise: NoiseBackend,
    pub grid: VectorGrid,
}

impl CachedGrid {
    pub fn from_field(field: &ParticleField) -> Self {
        Self {
            seed: field.config().seed,
            noise: field.config().noise,
            grid: field.grid().clone(),
        }
    }
}

/// Creates a simulation for `config`, reusing the grid cached at `path` when
/// it fits and refreshing the cache otherwise.
pub fn load_or_build(config: FlowConfig, path: &Path) -> Result<ParticleField, CliError> {
    if let Some(cached) = read_grid(path) {
        if cached.seed != config.seed || cached.noise != config.noise {
            log::warn!(
                "cached grid at {} was sampled with seed {} ({}), need seed {} ({})",
                path.display(),
                cached.seed,
                cached.noise.name(),
                config.seed,
                config.noise.name()
            );
        } else {
            match ParticleField::with_grid(config.clone(), cached.grid) {
                Ok(field) => {
                    log::info!("reusing cached grid from {}", path.display());
                    return Ok(field);
                }
                // A bad config fails again below with the same error.
                Err(reason) => {
                    log::warn!("cached grid at {} not usable: {reason}", path.display());
                }
            }
        }
    }
    let field = ParticleField::new(config)?;
    write_grid(&CachedGrid::from_field(&field), path)?;
    Ok(field)
}

/// Writes `cached` as JSON to `path`.
pub fn write_grid(cached: &CachedGrid, path: &Path) -> Result<(), CliError> {
    let json = serde_json::to_string(cached)?;
    fs::write(path, json).map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    log::debug!("cached grid at {}", path.display());
    Ok(())
}

fn read_grid(path: &Path) -> Option<CachedGrid> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(cached) => Some(cached),
        Err(e) => {
            log::warn!("ignoring unreadable grid cache {}: {e}", path.display());
            None
        }
    }
}
