//! Pure-computation trail rasterization into an RGBA8 buffer.
//!
//! Always available (no feature gate) so both the PNG snapshot path and any
//! in-memory consumer share the same drawing code.

use flow_field_core::{Particle, ParticleField, Srgb};
use glam::DVec2;

/// Opacity of the oldest segment of a trail; the newest is fully opaque.
const TAIL_ALPHA: f64 = 0.15;

/// Draws every particle's trail over `background` and returns a
/// `width * height * 4` RGBA8 buffer sized to the field's configured area.
pub fn field_to_rgba(field: &ParticleField, background: Srgb) -> Vec<u8> {
    let config = field.config();
    trails_to_rgba(field.particles(), config.width, config.height, background)
}

/// Draws `particles` in order onto a `width x height` canvas.
///
/// Each trail is a polyline from its oldest to its newest point; segment
/// opacity ramps from [`TAIL_ALPHA`] at the tail to 1 at the head. Points
/// outside the canvas are clipped.
pub fn trails_to_rgba(particles: &[Particle], width: usize, height: usize, background: Srgb) -> Vec<u8> {
    let mut canvas = Canvas {
        width,
        height,
        pixels: vec![background; width * height],
    };
    for particle in particles {
        canvas.draw_trail(particle);
    }
    canvas
        .pixels
        .iter()
        .flat_map(|c| {
            let [r, g, b] = c.to_rgb8();
            [r, g, b, 255u8]
        })
        .collect()
}

struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Srgb>,
}

impl Canvas {
    fn draw_trail(&mut self, particle: &Particle) {
        let trail = particle.trail();
        let color = particle.color();
        if trail.len() == 1 {
            self.plot(trail[0], color, 1.0);
            return;
        }
        let segments = trail.len() - 1;
        for (i, (a, b)) in trail.iter().zip(trail.iter().skip(1)).enumerate() {
            let alpha = segment_alpha(i, segments);
            self.draw_segment(*a, *b, color, alpha);
        }
    }

    /// Samples the segment at one-pixel intervals, endpoints included.
    fn draw_segment(&mut self, a: DVec2, b: DVec2, color: Srgb, alpha: f64) {
        let delta = b - a;
        let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as usize;
        for s in 0..=steps {
            let t = s as f64 / steps as f64;
            self.plot(a.lerp(b, t), color, alpha);
        }
    }

    fn plot(&mut self, p: DVec2, color: Srgb, alpha: f64) {
        if !(p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f64 && p.y < self.height as f64) {
            return;
        }
        let idx = p.y as usize * self.width + p.x as usize;
        self.pixels[idx] = self.pixels[idx].mix(color, alpha);
    }
}

/// Opacity of segment `index` out of `segments`, oldest first.
fn segment_alpha(index: usize, segments: usize) -> f64 {
    if segments <= 1 {
        return 1.0;
    }
    let t = index as f64 / (segments - 1) as f64;
    TAIL_ALPHA + (1.0 - TAIL_ALPHA) * t
}
