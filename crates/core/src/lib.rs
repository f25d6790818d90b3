#![deny(unsafe_code)]
//! Core simulation for the flow-field generative piece.
//!
//! Provides Perlin noise over a lazily grown gradient lattice (`NoiseField`),
//! the `VectorGrid` of direction vectors sampled from it, drifting `Particle`s
//! with bounded trails, and the `ParticleField` simulation context that ticks
//! them. Rendering is left to the caller.

pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod palette;
pub mod particle;
pub mod perlin;
pub mod simulation;

pub use color::Srgb;
pub use config::{FlowConfig, NoiseBackend};
pub use error::FlowError;
pub use grid::{Cell, VectorGrid};
pub use palette::Palette;
pub use particle::{Bounds, Particle, ParticleState, StepOutcome};
pub use perlin::{LibraryPerlin, NoiseField, ScalarNoise};
pub use simulation::{ParticleField, TickStats};
