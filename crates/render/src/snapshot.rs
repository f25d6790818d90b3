//! PNG snapshots of a [`ParticleField`].
//!
//! Feature-gated behind `png` (default on) so in-memory consumers can use
//! [`crate::raster`] without pulling in the `image` crate.

use flow_field_core::{FlowError, ParticleField, Srgb};
use std::path::Path;

use crate::raster::field_to_rgba;

/// Rasterizes the field's trails over `background` and writes a PNG.
///
/// Returns `FlowError::InvalidDimensions` if the area overflows `u32`, or
/// `FlowError::Io` on write failure.
pub fn write_png(field: &ParticleField, background: Srgb, path: &Path) -> Result<(), FlowError> {
    let rgba = field_to_rgba(field, background);
    let w = u32::try_from(field.config().width).map_err(|_| FlowError::InvalidDimensions)?;
    let h = u32::try_from(field.config().height).map_err(|_| FlowError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| FlowError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| FlowError::Io(e.to_string()))?;
    log::info!("wrote {w}x{h} snapshot to {}", path.display());
    Ok(())
}
