//! Two-dimensional Perlin noise over a lazily grown gradient lattice.
//!
//! [`NoiseField`] assigns a unit gradient to every integer lattice point it
//! touches and memoizes every exact query. The lattice is pre-generated over
//! the range passed to [`NoiseField::init`]; any coordinate outside that range
//! is generated on first access and kept, so queries can never address an
//! uninitialized lattice point.
//!
//! [`LibraryPerlin`] exposes the `noise` crate's Perlin generator through the
//! same [`ScalarNoise`] seam so the vector grid can be built from either.

use std::collections::HashMap;
use std::f64::consts::TAU;

use glam::DVec2;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// A source of smoothly varying scalar values in roughly [-1, 1].
///
/// Takes `&mut self` because implementations may memoize or grow state on
/// query. Object-safe, so the simulation can hold a `Box<dyn ScalarNoise>`.
pub trait ScalarNoise: Send {
    /// Samples the noise at continuous coordinates `(x, y)`.
    fn noise(&mut self, x: f64, y: f64) -> f64;
}

/// How gradient vectors are produced for new lattice points.
enum GradientSource {
    /// Uniformly random angle in [0, 2π) drawn from a seeded generator.
    Random(Pcg64),
    /// Caller-supplied gradient per lattice coordinate.
    Fixed(Box<dyn Fn(i64, i64) -> DVec2 + Send + Sync>),
}

impl GradientSource {
    fn next(&mut self, ix: i64, iy: i64) -> DVec2 {
        match self {
            GradientSource::Random(rng) => DVec2::from_angle(rng.gen::<f64>() * TAU),
            GradientSource::Fixed(f) => f(ix, iy),
        }
    }
}

/// Perlin noise generator with a memoized gradient lattice and result cache.
pub struct NoiseField {
    gradients: HashMap<(i64, i64), DVec2>,
    cache: HashMap<(u64, u64), f64>,
    source: GradientSource,
}

impl NoiseField {
    /// Creates a noise field with random gradients, pre-generating the lattice
    /// over `[0, width) x [0, height)`.
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        let mut field = Self {
            gradients: HashMap::new(),
            cache: HashMap::new(),
            source: GradientSource::Random(Pcg64::seed_from_u64(seed)),
        };
        field.init(width, height);
        field
    }

    /// Creates a noise field whose gradients come from `gradient(ix, iy)`.
    ///
    /// The closure should return unit vectors; nothing normalizes them.
    pub fn with_gradients<F>(width: usize, height: usize, gradient: F) -> Self
    where
        F: Fn(i64, i64) -> DVec2 + Send + Sync + 'static,
    {
        let mut field = Self {
            gradients: HashMap::new(),
            cache: HashMap::new(),
            source: GradientSource::Fixed(Box::new(gradient)),
        };
        field.init(width, height);
        field
    }

    /// Discards the lattice and the cache, then pre-generates gradients over
    /// `[0, width) x [0, height)`.
    ///
    /// The random stream continues from where it was, so values before and
    /// after a re-init are uncorrelated.
    pub fn init(&mut self, width: usize, height: usize) {
        self.gradients.clear();
        self.cache.clear();
        self.gradients.reserve(width.saturating_mul(height));
        for x in 0..width as i64 {
            for y in 0..height as i64 {
                let g = self.source.next(x, y);
                self.gradients.insert((x, y), g);
            }
        }
    }

    /// Gradient at lattice point `(ix, iy)`, generating it on first access.
    pub fn gradient(&mut self, ix: i64, iy: i64) -> DVec2 {
        if let Some(g) = self.gradients.get(&(ix, iy)) {
            return *g;
        }
        let g = self.source.next(ix, iy);
        self.gradients.insert((ix, iy), g);
        g
    }

    /// Number of lattice points generated so far.
    pub fn lattice_len(&self) -> usize {
        self.gradients.len()
    }

    /// Number of memoized noise values.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Samples Perlin noise at `(x, y)`, memoized by the exact coordinate pair.
    pub fn noise(&mut self, x: f64, y: f64) -> f64 {
        let key = (x.to_bits(), y.to_bits());
        if let Some(v) = self.cache.get(&key) {
            return *v;
        }
        let value = self.interpolate_cell(x.floor() as i64, y.floor() as i64, x, y);
        self.cache.insert(key, value);
        value
    }

    /// Dot product of the gradient at `(ix, iy)` with the offset from that
    /// lattice point to `(x, y)`.
    fn dot_grid_gradient(&mut self, ix: i64, iy: i64, x: f64, y: f64) -> f64 {
        let offset = DVec2::new(x - ix as f64, y - iy as f64);
        self.gradient(ix, iy).dot(offset)
    }

    /// Uncached noise of `(x, y)` evaluated against the cell whose top-left
    /// lattice point is `(x0, y0)`.
    fn interpolate_cell(&mut self, x0: i64, y0: i64, x: f64, y: f64) -> f64 {
        let (x1, y1) = (x0 + 1, y0 + 1);
        let sx = x - x0 as f64;
        let sy = y - y0 as f64;

        let n0 = self.dot_grid_gradient(x0, y0, x, y);
        let n1 = self.dot_grid_gradient(x1, y0, x, y);
        let ix0 = interpolate(n0, n1, sx);

        let n0 = self.dot_grid_gradient(x0, y1, x, y);
        let n1 = self.dot_grid_gradient(x1, y1, x, y);
        let ix1 = interpolate(n0, n1, sx);

        interpolate(ix0, ix1, sy)
    }
}

impl ScalarNoise for NoiseField {
    fn noise(&mut self, x: f64, y: f64) -> f64 {
        NoiseField::noise(self, x, y)
    }
}

/// Adapter exposing the `noise` crate's Perlin generator as [`ScalarNoise`].
pub struct LibraryPerlin {
    perlin: Perlin,
}

impl LibraryPerlin {
    /// Seeds the generator from the low 32 bits of `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            perlin: Perlin::new(seed as u32),
        }
    }
}

impl ScalarNoise for LibraryPerlin {
    fn noise(&mut self, x: f64, y: f64) -> f64 {
        self.perlin.get([x, y])
    }
}

/// Smoothstep easing `w^2 (3 - 2w)`, clamped to 0 below 0 and 1 above 1.
pub fn smoothstep(w: f64) -> f64 {
    if w <= 0.0 {
        0.0
    } else if w >= 1.0 {
        1.0
    } else {
        w * w * (3.0 - 2.0 * w)
    }
}

/// Blends `a0` toward `a1` with smoothstep weight `w`.
pub fn interpolate(a0: f64, a1: f64, w: f64) -> f64 {
    a0 + (a1 - a0) * smoothstep(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn unit_x_field() -> NoiseField {
        NoiseField::with_gradients(100, 100, |_, _| DVec2::X)
    }

    // -- smoothstep / interpolate --

    #[test]
    fn smoothstep_clamps_outside_unit_interval() {
        assert_eq!(smoothstep(-0.5), 0.0);
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(3.0), 1.0);
    }

    #[test]
    fn smoothstep_is_half_at_midpoint() {
        assert!((smoothstep(0.5) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn interpolate_hits_endpoints() {
        assert!((interpolate(2.0, 5.0, 0.0) - 2.0).abs() < EPSILON);
        assert!((interpolate(2.0, 5.0, 1.0) - 5.0).abs() < EPSILON);
    }

    // -- Lattice --

    #[test]
    fn init_pregenerates_requested_range() {
        let field = NoiseField::new(8, 5, 1);
        assert_eq!(field.lattice_len(), 40);
        assert_eq!(field.cached_len(), 0);
    }

    #[test]
    fn random_gradients_are_unit_length() {
        let mut field = NoiseField::new(16, 16, 7);
        for ix in 0..16 {
            for iy in 0..16 {
                let g = field.gradient(ix, iy);
                assert!((g.length() - 1.0).abs() < 1e-9, "gradient {g} not unit");
            }
        }
    }

    #[test]
    fn lattice_extends_lazily_outside_initial_range() {
        let mut field = NoiseField::new(2, 2, 3);
        assert_eq!(field.lattice_len(), 4);
        let v = field.noise(-5.5, 40.25);
        assert!(v.is_finite());
        assert_eq!(field.lattice_len(), 8);
        let g = field.gradient(-5, 40);
        assert_eq!(g, field.gradient(-5, 40), "lazy gradients must be memoized");
    }

    #[test]
    fn init_discards_lattice_and_cache() {
        let mut field = NoiseField::new(4, 4, 11);
        let before = field.gradient(1, 1);
        field.noise(1.5, 1.5);
        assert_eq!(field.cached_len(), 1);
        field.init(4, 4);
        assert_eq!(field.cached_len(), 0);
        assert_ne!(before, field.gradient(1, 1));
    }

    // -- Determinism and cache --

    #[test]
    fn repeated_query_returns_identical_value() {
        let mut field = NoiseField::new(10, 10, 42);
        let a = field.noise(3.7, 2.2);
        let b = field.noise(3.7, 2.2);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(field.cached_len(), 1);
    }

    #[test]
    fn cached_and_uncached_paths_agree() {
        let mut field = NoiseField::new(10, 10, 42);
        let cached = field.noise(4.125, 6.5);
        let uncached = field.interpolate_cell(4, 6, 4.125, 6.5);
        assert_eq!(cached.to_bits(), uncached.to_bits());
    }

    #[test]
    fn same_seed_same_values() {
        let mut a = NoiseField::new(10, 10, 99);
        let mut b = NoiseField::new(10, 10, 99);
        for i in 0..50 {
            let x = i as f64 * 0.173;
            let y = i as f64 * 0.091;
            assert_eq!(a.noise(x, y).to_bits(), b.noise(x, y).to_bits());
        }
    }

    #[test]
    fn distinct_coordinates_get_distinct_cache_entries() {
        let mut field = NoiseField::new(4, 4, 5);
        field.noise(0.1, 0.2);
        field.noise(0.2, 0.1);
        field.noise(0.1, 0.2 + f64::EPSILON);
        assert_eq!(field.cached_len(), 3);
    }

    // -- Corners and continuity --

    #[test]
    fn noise_is_zero_at_lattice_points() {
        let mut field = NoiseField::new(10, 10, 17);
        for ix in 0..9 {
            for iy in 0..9 {
                let v = field.noise(ix as f64, iy as f64);
                assert!(v.abs() < EPSILON, "noise({ix}, {iy}) = {v}");
            }
        }
    }

    #[test]
    fn cell_corners_match_plain_dot_products() {
        let mut field = NoiseField::new(10, 10, 23);
        // Evaluating the right edge of cell (2, 3) at x = 3 must equal the
        // un-interpolated blend of the x1 corners.
        let y = 3.4;
        let from_left = field.interpolate_cell(2, 3, 3.0, y);
        let n_top = field.dot_grid_gradient(3, 3, 3.0, y);
        let n_bottom = field.dot_grid_gradient(3, 4, 3.0, y);
        let expected = interpolate(n_top, n_bottom, y - 3.0);
        assert!((from_left - expected).abs() < EPSILON);
    }

    #[test]
    fn shared_edge_is_continuous_between_neighboring_cells() {
        let mut field = NoiseField::new(10, 10, 29);
        for &y in &[0.0, 0.25, 0.5, 0.99] {
            let left = field.interpolate_cell(4, 0, 5.0, y);
            let right = field.interpolate_cell(5, 0, 5.0, y);
            assert!((left - right).abs() < EPSILON, "discontinuity at y={y}");
        }
        for &x in &[0.1, 0.6] {
            let above = field.interpolate_cell(0, 6, x, 7.0);
            let below = field.interpolate_cell(0, 7, x, 7.0);
            assert!((above - below).abs() < EPSILON, "discontinuity at x={x}");
        }
    }

    #[test]
    fn noise_approaches_boundary_value_smoothly() {
        let mut field = NoiseField::new(10, 10, 31);
        let at = field.noise(6.0, 2.3);
        let near = field.noise(6.0 - 1e-9, 2.3);
        assert!((at - near).abs() < 1e-6);
    }

    // -- Constant gradient scenario --

    #[test]
    fn constant_gradient_field_is_zero_at_corners() {
        let mut field = unit_x_field();
        for &(x, y) in &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
            assert!(field.noise(x, y).abs() < EPSILON);
        }
    }

    #[test]
    fn constant_gradient_field_matches_closed_form() {
        // With every gradient equal to (1, 0) both x-blends reduce to
        // sx - smoothstep(sx), so the value is independent of y.
        let mut field = unit_x_field();
        for i in 1..10 {
            let sx = i as f64 / 10.0;
            let expected = sx - smoothstep(sx);
            for &y in &[0.0, 0.3, 0.8] {
                let v = field.noise(sx, y);
                assert!((v - expected).abs() < EPSILON, "noise({sx}, {y}) = {v}");
            }
        }
    }

    #[test]
    fn constant_gradient_field_is_non_negative_on_first_half_of_cell() {
        let mut field = unit_x_field();
        for i in 0..=50 {
            let sx = i as f64 / 100.0;
            assert!(field.noise(sx, 0.5) >= 0.0);
        }
        assert!(field.noise(0.5, 0.5).abs() < EPSILON);
    }

    // -- Backends --

    #[test]
    fn scalar_noise_is_object_safe() {
        let mut sources: Vec<Box<dyn ScalarNoise>> = vec![
            Box::new(NoiseField::new(4, 4, 1)),
            Box::new(LibraryPerlin::new(1)),
        ];
        for s in &mut sources {
            assert!(s.noise(0.37, 1.21).is_finite());
        }
    }

    #[test]
    fn library_perlin_is_deterministic_per_seed() {
        let mut a = LibraryPerlin::new(8);
        let mut b = LibraryPerlin::new(8);
        assert_eq!(a.noise(1.3, 2.7).to_bits(), b.noise(1.3, 2.7).to_bits());
    }

    // -- Property-based tests --

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn noise_stays_within_unit_range(
                seed: u64,
                x in -50.0_f64..50.0,
                y in -50.0_f64..50.0,
            ) {
                let mut field = NoiseField::new(8, 8, seed);
                let v = field.noise(x, y);
                prop_assert!((-1.0..=1.0).contains(&v), "noise({x}, {y}) = {v}");
            }

            #[test]
            fn cache_hit_equals_first_evaluation(
                seed: u64,
                x in 0.0_f64..20.0,
                y in 0.0_f64..20.0,
            ) {
                let mut field = NoiseField::new(20, 20, seed);
                let first = field.noise(x, y);
                let second = field.noise(x, y);
                prop_assert_eq!(first.to_bits(), second.to_bits());
            }
        }
    }
}
