#![deny(unsafe_code)]
//! CPU-side rendering for the flow-field: trail rasterization and PNG snapshots.
//!
//! The simulation core never draws; this crate plays the rendering host,
//! turning a [`ParticleField`](flow_field_core::ParticleField) frame into
//! pixels.

pub mod raster;

#[cfg(feature = "png")]
pub mod snapshot;

pub use raster::{field_to_rgba, trails_to_rgba};
