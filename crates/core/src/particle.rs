//! A single drifting particle with a bounded trail and a lifetime countdown.
//!
//! Every [`Particle::step`] decrements the timer and then takes one of four
//! branches:
//!
//! | timer | trail | grid cell   | effect                                  |
//! |-------|-------|-------------|-----------------------------------------|
//! | >= 1  | any   | sampleable  | move along the field, push to trail     |
//! | >= 1  | any   | outside     | pause in place                          |
//! | < 1   | > 1   | n/a         | drop the oldest trail point             |
//! | < 1   | <= 1  | n/a         | respawn at a random point in the bounds |
//!
//! There is no terminal state: respawning puts the particle back into the
//! active phase with a fresh timer.

use std::collections::VecDeque;
use std::ops::Range;

use glam::DVec2;
use rand::Rng;

use crate::color::Srgb;
use crate::error::FlowError;
use crate::grid::VectorGrid;

/// Range of the per-particle speed multiplier (inclusive).
pub const SPEED_MODIFIER_RANGE: std::ops::RangeInclusive<u32> = 1..=3;
/// Range of the per-particle trail length bound.
pub const HISTORY_LENGTH_RANGE: Range<usize> = 10..210;

/// Rectangular area particles spawn in, `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    width: f64,
    height: f64,
}

impl Bounds {
    /// Returns `FlowError::InvalidDimensions` unless both sides are positive and finite.
    pub fn new(width: f64, height: f64) -> Result<Self, FlowError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(FlowError::InvalidDimensions);
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn contains(&self, p: DVec2) -> bool {
        (0.0..self.width).contains(&p.x) && (0.0..self.height).contains(&p.y)
    }

    /// A uniformly random point inside the bounds.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec2 {
        DVec2::new(rng.gen_range(0.0..self.width), rng.gen_range(0.0..self.height))
    }
}

/// Lifecycle phase derived from the timer and trail length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleState {
    /// Timer still running; the particle follows the field.
    Active,
    /// Timer ran out; the trail is shrinking from its tail.
    Retracting,
    /// Timer ran out and the trail is down to one point; the next step respawns.
    Expired,
}

/// What a single [`Particle::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Paused,
    Retracted,
    Respawned,
}

#[derive(Debug, Clone)]
pub struct Particle {
    position: DVec2,
    velocity: DVec2,
    speed_modifier: u32,
    trail: VecDeque<DVec2>,
    max_history_length: usize,
    timer: i64,
    color: Srgb,
}

impl Particle {
    /// Spawns a particle at a random point in `bounds` with a random speed
    /// multiplier and trail bound, tinted `color`.
    pub fn new<R: Rng + ?Sized>(bounds: &Bounds, color: Srgb, rng: &mut R) -> Self {
        let position = bounds.random_point(rng);
        let max_history_length = rng.gen_range(HISTORY_LENGTH_RANGE);
        let mut trail = VecDeque::with_capacity(max_history_length + 1);
        trail.push_back(position);
        Self {
            position,
            velocity: DVec2::ZERO,
            speed_modifier: rng.gen_range(SPEED_MODIFIER_RANGE),
            trail,
            max_history_length,
            timer: lifetime(max_history_length),
            color,
        }
    }

    /// Advances the particle by one tick over `grid`.
    ///
    /// Respawns inside `bounds` once the timer has run out and the trail has
    /// fully retracted. The speed multiplier, trail bound and color survive
    /// a respawn.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        grid: &VectorGrid,
        bounds: &Bounds,
        rng: &mut R,
    ) -> StepOutcome {
        self.timer -= 1;
        if self.timer >= 1 {
            let Ok(direction) = grid.sample(self.position.x, self.position.y) else {
                return StepOutcome::Paused;
            };
            self.velocity = direction * f64::from(self.speed_modifier);
            self.position += self.velocity;
            self.trail.push_back(self.position);
            if self.trail.len() > self.max_history_length {
                self.trail.pop_front();
            }
            StepOutcome::Moved
        } else if self.trail.len() > 1 {
            self.trail.pop_front();
            StepOutcome::Retracted
        } else {
            self.respawn(bounds, rng);
            StepOutcome::Respawned
        }
    }

    /// Moves to a fresh random point with a one-point trail and a full timer.
    pub fn respawn<R: Rng + ?Sized>(&mut self, bounds: &Bounds, rng: &mut R) {
        self.position = bounds.random_point(rng);
        self.velocity = DVec2::ZERO;
        self.trail.clear();
        self.trail.push_back(self.position);
        self.timer = lifetime(self.max_history_length);
    }

    pub fn state(&self) -> ParticleState {
        if self.timer >= 1 {
            ParticleState::Active
        } else if self.trail.len() > 1 {
            ParticleState::Retracting
        } else {
            ParticleState::Expired
        }
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Velocity applied on the most recent move.
    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    pub fn speed_modifier(&self) -> u32 {
        self.speed_modifier
    }

    /// Past positions, oldest first; the last entry is the newest.
    pub fn trail(&self) -> &VecDeque<DVec2> {
        &self.trail
    }

    pub fn max_history_length(&self) -> usize {
        self.max_history_length
    }

    pub fn timer(&self) -> i64 {
        self.timer
    }

    pub fn color(&self) -> Srgb {
        self.color
    }
}

fn lifetime(max_history_length: usize) -> i64 {
    2 * max_history_length as i64
}
