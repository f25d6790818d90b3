//! The simulation context: one vector grid plus the particles drifting over it.
//!
//! [`ParticleField`] owns everything a frame needs. A rendering host calls
//! [`ParticleField::tick`] once per frame and reads [`ParticleField::particles`]
//! to draw trails; a UI layer calls the configuration methods between ticks.
//! All of them take `&mut self`, so the grid can never change while a tick is
//! reading it.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde_json::Value;

use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::grid::VectorGrid;
use crate::palette::Palette;
use crate::particle::{Bounds, Particle, StepOutcome};
use crate::perlin::ScalarNoise;

/// Separates the particle random stream from the gradient stream of the same seed.
const PARTICLE_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Per-tick counts of what the particles did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub moved: usize,
    pub paused: usize,
    pub retracted: usize,
    pub respawned: usize,
}

impl TickStats {
    fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Moved => self.moved += 1,
            StepOutcome::Paused => self.paused += 1,
            StepOutcome::Retracted => self.retracted += 1,
            StepOutcome::Respawned => self.respawned += 1,
        }
    }

    /// Number of particles stepped.
    pub fn total(&self) -> usize {
        self.moved + self.paused + self.retracted + self.respawned
    }
}

/// Flow-field simulation state.
pub struct ParticleField {
    config: FlowConfig,
    bounds: Bounds,
    palette: Palette,
    noise: Box<dyn ScalarNoise>,
    grid: VectorGrid,
    particles: Vec<Particle>,
    rng: Pcg64,
    ticks: u64,
}

impl ParticleField {
    /// Builds the grid and spawns `config.particle_count` particles.
    pub fn new(config: FlowConfig) -> Result<Self, FlowError> {
        config.validate()?;
        let mut noise = create_noise(&config, config.seed);
        let (rows, cols) = config.grid_dimensions();
        let grid = VectorGrid::build(noise.as_mut(), rows, cols, config.cell_size, config.noise_step)?;
        Self::assemble(config, noise, grid)
    }

    /// Uses a previously built grid instead of sampling noise.
    ///
    /// Returns `FlowError::InvalidConfiguration` if the grid's cell size or
    /// extent does not match `config`.
    pub fn with_grid(config: FlowConfig, grid: VectorGrid) -> Result<Self, FlowError> {
        config.validate()?;
        grid.validate()?;
        check_grid_matches(&config, &grid)?;
        let noise = create_noise(&config, config.seed);
        Self::assemble(config, noise, grid)
    }

    fn assemble(
        config: FlowConfig,
        noise: Box<dyn ScalarNoise>,
        grid: VectorGrid,
    ) -> Result<Self, FlowError> {
        let bounds = config.bounds()?;
        let palette = Palette::from_name(&config.palette)?;
        let mut rng = Pcg64::seed_from_u64(config.seed ^ PARTICLE_STREAM);
        let particles = spawn_particles(config.particle_count, &bounds, &palette, &mut rng);
        log::debug!(
            "particle field ready: {}x{}, {} particles, grid {}x{}",
            config.width,
            config.height,
            particles.len(),
            grid.cols(),
            grid.rows()
        );
        Ok(Self {
            config,
            bounds,
            palette,
            noise,
            grid,
            particles,
            rng,
            ticks: 0,
        })
    }

    /// Steps every particle exactly once.
    pub fn tick(&mut self) -> TickStats {
        let mut stats = TickStats::default();
        for particle in &mut self.particles {
            stats.record(particle.step(&self.grid, &self.bounds, &mut self.rng));
        }
        self.ticks += 1;
        if stats.respawned > 0 {
            log::trace!("tick {}: {} particles respawned", self.ticks, stats.respawned);
        }
        stats
    }

    /// Changes the simulation area, rebuilding the grid from the current
    /// noise generator and respawning every particle.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), FlowError> {
        let config = FlowConfig {
            width,
            height,
            ..self.config.clone()
        };
        config.validate()?;
        let bounds = config.bounds()?;
        let grid = self.build_grid(&config)?;
        log::debug!("resized to {width}x{height}");
        self.config = config;
        self.bounds = bounds;
        self.grid = grid;
        self.respawn_all();
        Ok(())
    }

    /// Rebuilds the grid with a new noise-space step. Particles keep going.
    pub fn rebuild_field(&mut self, noise_step: f64) -> Result<(), FlowError> {
        let config = FlowConfig {
            noise_step,
            ..self.config.clone()
        };
        config.validate()?;
        let grid = self.build_grid(&config)?;
        log::debug!("rebuilt field with noise step {noise_step}");
        self.config = config;
        self.grid = grid;
        Ok(())
    }

    /// Replaces the particle set with `count` freshly spawned particles.
    pub fn set_particle_count(&mut self, count: usize) -> Result<(), FlowError> {
        let config = FlowConfig {
            particle_count: count,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        self.respawn_all();
        Ok(())
    }

    /// Swaps the trail palette and respawns every particle with new colors.
    pub fn set_palette(&mut self, name: &str) -> Result<(), FlowError> {
        let palette = Palette::from_name(name)?;
        self.config.palette = name.to_string();
        self.palette = palette;
        self.respawn_all();
        Ok(())
    }

    /// Draws a new noise generator, rebuilds the grid and respawns every
    /// particle. The new field is uncorrelated with the previous one.
    pub fn reset(&mut self) -> Result<(), FlowError> {
        let seed = self.rng.gen::<u64>();
        let mut noise = create_noise(&self.config, seed);
        let (rows, cols) = self.config.grid_dimensions();
        let grid = VectorGrid::build(
            noise.as_mut(),
            rows,
            cols,
            self.config.cell_size,
            self.config.noise_step,
        )?;
        log::debug!("reset field with noise seed {seed}");
        self.noise = noise;
        self.grid = grid;
        self.respawn_all();
        Ok(())
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn grid(&self) -> &VectorGrid {
        &self.grid
    }

    /// Particles in draw order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Number of ticks run since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current configuration as a JSON object.
    pub fn params(&self) -> Value {
        self.config.params()
    }

    /// Schema describing every configuration parameter.
    pub fn param_schema(&self) -> Value {
        FlowConfig::param_schema()
    }

    fn build_grid(&mut self, config: &FlowConfig) -> Result<VectorGrid, FlowError> {
        let (rows, cols) = config.grid_dimensions();
        VectorGrid::build(self.noise.as_mut(), rows, cols, config.cell_size, config.noise_step)
    }

    fn respawn_all(&mut self) {
        self.particles = spawn_particles(
            self.config.particle_count,
            &self.bounds,
            &self.palette,
            &mut self.rng,
        );
    }
}

/// Noise generator for `config` whose pre-generated lattice covers every
/// point the grid will query.
fn create_noise(config: &FlowConfig, seed: u64) -> Box<dyn ScalarNoise> {
    let (rows, cols) = config.grid_dimensions();
    let lattice_w = ((cols as f64 * config.noise_step).ceil() as usize).saturating_add(2);
    let lattice_h = ((rows as f64 * config.noise_step).ceil() as usize).saturating_add(2);
    config.noise.create(lattice_w, lattice_h, seed)
}

fn spawn_particles(count: usize, bounds: &Bounds, palette: &Palette, rng: &mut Pcg64) -> Vec<Particle> {
    (0..count)
        .map(|_| {
            let color = palette.pick(rng);
            Particle::new(bounds, color, rng)
        })
        .collect()
}

fn check_grid_matches(config: &FlowConfig, grid: &VectorGrid) -> Result<(), FlowError> {
    let (rows, cols) = config.grid_dimensions();
    if grid.rows() != rows
        || grid.cols() != cols
        || !nearly_equal(grid.cell_size(), config.cell_size)
        || !nearly_equal(grid.step(), config.noise_step)
    {
        return Err(FlowError::InvalidConfiguration(format!(
            "grid is {}x{} with cell size {} and noise step {}, configuration needs \
             {cols}x{rows} with cell size {} and noise step {}",
            grid.cols(),
            grid.rows(),
            grid.cell_size(),
            grid.step(),
            config.cell_size,
            config.noise_step
        )));
    }
    Ok(())
}

/// Equality up to the last few bits, enough to survive a JSON round trip.
fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoiseBackend;
    use crate::particle::ParticleState;

    fn small_config() -> FlowConfig {
        FlowConfig {
            width: 200,
            height: 120,
            cell_size: 10.0,
            particle_count: 50,
            noise_step: 0.1,
            seed: 42,
            ..FlowConfig::default()
        }
    }

    fn field() -> ParticleField {
        ParticleField::new(small_config()).unwrap()
    }

    // -- Construction --

    #[test]
    fn new_builds_grid_and_particles() {
        let f = field();
        assert_eq!((f.grid().rows(), f.grid().cols()), (13, 21));
        assert_eq!(f.particles().len(), 50);
        assert!(f.particles().iter().all(|p| f.bounds().contains(p.position())));
        assert_eq!(f.ticks(), 0);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = FlowConfig {
            cell_size: 0.0,
            ..small_config()
        };
        assert!(matches!(
            ParticleField::new(config),
            Err(FlowError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn new_with_library_backend_succeeds() {
        let config = FlowConfig {
            noise: NoiseBackend::Library,
            ..small_config()
        };
        let mut f = ParticleField::new(config).unwrap();
        assert_eq!(f.tick().total(), 50);
    }

    #[test]
    fn new_rejects_huge_noise_step_before_allocating() {
        for noise_step in [1000.0, 1e300] {
            let config = FlowConfig {
                noise_step,
                ..small_config()
            };
            assert!(matches!(
                ParticleField::new(config),
                Err(FlowError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn new_rejects_tiny_cell_size_before_allocating() {
        let config = FlowConfig {
            width: 800,
            height: 600,
            cell_size: 0.01,
            ..small_config()
        };
        assert!(ParticleField::new(config).is_err());
    }

    #[test]
    fn zero_particles_is_allowed() {
        let config = FlowConfig {
            particle_count: 0,
            ..small_config()
        };
        let mut f = ParticleField::new(config).unwrap();
        assert_eq!(f.tick(), TickStats::default());
    }

    // -- Ticking --

    #[test]
    fn tick_steps_every_particle_once() {
        let mut f = field();
        let before: Vec<i64> = f.particles().iter().map(|p| p.timer()).collect();
        let stats = f.tick();
        assert_eq!(stats.total(), 50);
        for (p, t) in f.particles().iter().zip(before) {
            assert_eq!(p.timer(), t - 1);
        }
        assert_eq!(f.ticks(), 1);
    }

    #[test]
    fn tick_does_not_change_the_grid() {
        let mut f = field();
        let grid = f.grid().clone();
        for _ in 0..20 {
            f.tick();
        }
        assert_eq!(f.grid(), &grid);
    }

    #[test]
    fn same_config_gives_identical_runs() {
        let mut a = field();
        let mut b = field();
        for _ in 0..100 {
            assert_eq!(a.tick(), b.tick());
        }
        for (pa, pb) in a.particles().iter().zip(b.particles()) {
            assert_eq!(pa.trail(), pb.trail());
            assert_eq!(pa.color(), pb.color());
        }
    }

    #[test]
    fn different_seeds_give_different_grids() {
        let a = field();
        let b = ParticleField::new(FlowConfig {
            seed: 43,
            ..small_config()
        })
        .unwrap();
        assert_ne!(a.grid(), b.grid());
    }

    #[test]
    fn long_run_keeps_trails_bounded_and_cycles_particles() {
        let mut f = field();
        let mut respawned = 0;
        for _ in 0..1000 {
            respawned += f.tick().respawned;
            for p in f.particles() {
                assert!(p.trail().len() <= p.max_history_length());
            }
        }
        assert!(respawned > 0, "particles should expire and respawn within 1000 ticks");
        assert!(f
            .particles()
            .iter()
            .any(|p| p.state() == ParticleState::Active));
    }

    // -- Reconfiguration --

    #[test]
    fn resize_rebuilds_grid_and_respawns_inside_new_bounds() {
        let mut f = field();
        f.tick();
        f.resize(50, 40).unwrap();
        assert_eq!((f.grid().rows(), f.grid().cols()), (5, 6));
        assert_eq!(f.config().width, 50);
        assert_eq!(f.particles().len(), 50);
        for p in f.particles() {
            assert!(f.bounds().contains(p.position()));
            assert_eq!(p.trail().len(), 1);
        }
    }

    #[test]
    fn failed_resize_keeps_previous_state() {
        let mut f = field();
        let grid = f.grid().clone();
        assert!(f.resize(0, 40).is_err());
        assert_eq!(f.config().width, 200);
        assert_eq!(f.grid(), &grid);
    }

    #[test]
    fn rebuild_field_changes_step_but_keeps_particles() {
        let mut f = field();
        for _ in 0..5 {
            f.tick();
        }
        let positions: Vec<_> = f.particles().iter().map(|p| p.position()).collect();
        let old = f.grid().clone();
        f.rebuild_field(0.37).unwrap();
        assert!((f.grid().step() - 0.37).abs() < f64::EPSILON);
        assert_ne!(f.grid(), &old);
        let after: Vec<_> = f.particles().iter().map(|p| p.position()).collect();
        assert_eq!(positions, after);
    }

    #[test]
    fn rebuild_field_rejects_bad_step() {
        let mut f = field();
        assert!(f.rebuild_field(f64::NAN).is_err());
        assert!((f.config().noise_step - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn set_particle_count_replaces_particle_set() {
        let mut f = field();
        f.set_particle_count(7).unwrap();
        assert_eq!(f.particles().len(), 7);
        assert_eq!(f.config().particle_count, 7);
        assert_eq!(f.tick().total(), 7);
    }

    #[test]
    fn set_palette_recolors_particles() {
        let mut f = field();
        f.set_palette("neon").unwrap();
        let neon = Palette::neon();
        assert!(f.particles().iter().all(|p| neon.colors().contains(&p.color())));
        assert!(f.set_palette("sepia").is_err());
        assert_eq!(f.config().palette, "neon");
    }

    #[test]
    fn reset_draws_a_new_field() {
        let mut f = field();
        let old = f.grid().clone();
        f.reset().unwrap();
        assert_ne!(f.grid(), &old);
        assert_eq!((f.grid().rows(), f.grid().cols()), (old.rows(), old.cols()));
        assert!(f.particles().iter().all(|p| p.trail().len() == 1));
    }

    // -- Preloaded grids --

    #[test]
    fn with_grid_reuses_a_matching_grid() {
        let grid = field().grid().clone();
        let f = ParticleField::with_grid(small_config(), grid.clone()).unwrap();
        assert_eq!(f.grid(), &grid);
    }

    #[test]
    fn with_grid_rejects_mismatched_extent() {
        let grid = field().grid().clone();
        let config = FlowConfig {
            width: 400,
            ..small_config()
        };
        assert!(matches!(
            ParticleField::with_grid(config, grid),
            Err(FlowError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn with_grid_rejects_mismatched_noise_step() {
        let grid = field().grid().clone();
        let config = FlowConfig {
            noise_step: 0.5,
            ..small_config()
        };
        assert!(matches!(
            ParticleField::with_grid(config, grid),
            Err(FlowError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn with_grid_rejects_degenerate_anchors() {
        let mut json = serde_json::to_value(field().grid()).unwrap();
        for cell in json["cells"].as_array_mut().unwrap() {
            cell["anchor"] = serde_json::json!([0.0, 0.0]);
        }
        let grid: VectorGrid = serde_json::from_value(json).unwrap();
        assert!(matches!(
            ParticleField::with_grid(small_config(), grid),
            Err(FlowError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn params_reflect_reconfiguration() {
        let mut f = field();
        f.set_particle_count(3).unwrap();
        assert_eq!(f.params()["particle_count"], 3);
        assert!(f.param_schema().get("noise_step").is_some());
    }
}
