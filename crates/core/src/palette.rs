//! Named sets of trail colors.
//!
//! Each particle draws one color from the palette when it is created and
//! keeps it for its whole life, including respawns.

use rand::Rng;
use serde::Serialize;

use crate::color::Srgb;
use crate::error::FlowError;

const PALETTE_NAMES: &[&str] = &["mono", "ocean", "neon", "fire", "vapor"];

/// A non-empty list of colors that particles are tinted from.
///
/// Serializes as `{"colors": ["#rrggbb", ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Palette {
    colors: Vec<Srgb>,
}

impl Palette {
    /// Returns `FlowError::InvalidPalette` if `colors` is empty.
    pub fn new(colors: Vec<Srgb>) -> Result<Self, FlowError> {
        if colors.is_empty() {
            return Err(FlowError::InvalidPalette(
                "palette must contain at least one color".into(),
            ));
        }
        Ok(Self { colors })
    }

    /// Builds a palette from hex strings.
    pub fn from_hex(hexes: &[&str]) -> Result<Self, FlowError> {
        let colors = hexes
            .iter()
            .map(|h| Srgb::from_hex(h))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }

    /// Looks up a built-in palette by name.
    pub fn from_name(name: &str) -> Result<Self, FlowError> {
        match name {
            "mono" => Ok(Self::mono()),
            "ocean" => Ok(Self::ocean()),
            "neon" => Ok(Self::neon()),
            "fire" => Ok(Self::fire()),
            "vapor" => Ok(Self::vapor()),
            other => Err(FlowError::InvalidPalette(format!(
                "unknown palette '{other}', expected one of: {}",
                PALETTE_NAMES.join(", ")
            ))),
        }
    }

    /// Names accepted by [`Palette::from_name`].
    pub fn list_names() -> &'static [&'static str] {
        PALETTE_NAMES
    }

    pub fn colors(&self) -> &[Srgb] {
        &self.colors
    }

    /// A uniformly chosen color.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Srgb {
        self.colors[rng.gen_range(0..self.colors.len())]
    }

    // -- Built-in palettes --

    /// Plain white strokes.
    pub fn mono() -> Self {
        Self {
            colors: vec![Srgb::WHITE],
        }
    }

    /// Deep blues to cyan.
    pub fn ocean() -> Self {
        Self::from_hex(&["#005f73", "#0a9396", "#94d2bd", "#e9d8a6", "#48cae4"])
            .expect("ocean palette hex values are valid")
    }

    /// Vibrant pinks, greens, yellows.
    pub fn neon() -> Self {
        Self::from_hex(&["#ff00ff", "#00ff41", "#ffff00", "#ff0080", "#00ffff"])
            .expect("neon palette hex values are valid")
    }

    /// Reds, oranges, yellows.
    pub fn fire() -> Self {
        Self::from_hex(&["#cc0000", "#ff4500", "#ff8c00", "#ffd700"])
            .expect("fire palette hex values are valid")
    }

    /// Pastel purples, pinks, teals.
    pub fn vapor() -> Self {
        Self::from_hex(&["#c77dff", "#ff9ebb", "#80ced6", "#a0e7e5"])
            .expect("vapor palette hex values are valid")
    }
}
