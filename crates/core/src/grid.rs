//! Rectangular lattice of unit direction vectors with bilinear sampling.
//!
//! A [`VectorGrid`] is built once from a [`ScalarNoise`] source by mapping
//! each noise sample to an angle, then stays immutable until the simulation
//! rebuilds it. Cells are stored row-major; cell `(row, col)` is anchored at
//! pixel position `(col * cell_size, row * cell_size)`.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::error::FlowError;
use crate::perlin::ScalarNoise;

/// Allowed anchor drift, as a fraction of the cell size.
const ANCHOR_TOLERANCE: f64 = 1e-9;
const DIRECTION_TOLERANCE: f64 = 1e-6;

/// One grid corner: a unit direction and its pixel-space anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub direction: DVec2,
    pub anchor: DVec2,
}

/// Row-major grid of [`Cell`]s covering the simulation area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorGrid {
    rows: usize,
    cols: usize,
    cell_size: f64,
    step: f64,
    cells: Vec<Cell>,
}

impl VectorGrid {
    /// Grid extent `(rows, cols)` covering a `width x height` area:
    /// `floor(height / cell_size) + 1` rows and `floor(width / cell_size) + 1` cols.
    pub fn dimensions_for(width: usize, height: usize, cell_size: f64) -> (usize, usize) {
        let rows = ((height as f64 / cell_size).floor() as usize).saturating_add(1);
        let cols = ((width as f64 / cell_size).floor() as usize).saturating_add(1);
        (rows, cols)
    }

    /// Builds a grid by sampling `noise` at `(col * step, row * step)` for
    /// every cell and turning the sample into the angle `sample * 2π`.
    ///
    /// Returns `FlowError::InvalidConfiguration` for a zero extent, a
    /// non-positive or non-finite `cell_size` (adjacent anchors would
    /// coincide), or a non-finite `step`.
    pub fn build(
        noise: &mut dyn ScalarNoise,
        rows: usize,
        cols: usize,
        cell_size: f64,
        step: f64,
    ) -> Result<Self, FlowError> {
        check_shape(rows, cols, cell_size)?;
        if !step.is_finite() {
            return Err(FlowError::InvalidConfiguration(format!(
                "noise step must be finite, got {step}"
            )));
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let angle = noise.noise(col as f64 * step, row as f64 * step) * TAU;
                cells.push(Cell {
                    direction: DVec2::from_angle(angle),
                    anchor: DVec2::new(col as f64 * cell_size, row as f64 * cell_size),
                });
            }
        }
        log::debug!("built vector grid {cols}x{rows} (cell size {cell_size}, step {step})");

        Ok(Self {
            rows,
            cols,
            cell_size,
            step,
            cells,
        })
    }

    /// Checks a grid obtained from outside (e.g. deserialized from a cache)
    /// for a consistent shape, anchors on their `(col, row) * cell_size`
    /// positions and finite unit directions.
    pub fn validate(&self) -> Result<(), FlowError> {
        check_shape(self.rows, self.cols, self.cell_size)?;
        if !self.step.is_finite() {
            return Err(FlowError::InvalidConfiguration(format!(
                "noise step must be finite, got {}",
                self.step
            )));
        }
        if self.cells.len() != self.rows * self.cols {
            return Err(FlowError::InvalidConfiguration(format!(
                "grid holds {} cells, expected {} x {}",
                self.cells.len(),
                self.cols,
                self.rows
            )));
        }
        for (i, cell) in self.cells.iter().enumerate() {
            let (row, col) = (i / self.cols, i % self.cols);
            let expected = DVec2::new(col as f64 * self.cell_size, row as f64 * self.cell_size);
            if !cell.anchor.is_finite()
                || !cell
                    .anchor
                    .abs_diff_eq(expected, ANCHOR_TOLERANCE * self.cell_size)
            {
                return Err(FlowError::InvalidConfiguration(format!(
                    "cell ({row}, {col}) anchored at {}, expected {expected}",
                    cell.anchor
                )));
            }
            if !cell.direction.is_finite()
                || (cell.direction.length() - 1.0).abs() > DIRECTION_TOLERANCE
            {
                return Err(FlowError::InvalidConfiguration(format!(
                    "cell ({row}, {col}) direction {} is not a unit vector",
                    cell.direction
                )));
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Noise-space increment used between adjacent cells.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at `(row, col)`, or `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Column and row of the cell containing pixel position `(px, py)`.
    /// May be negative or past the grid extent.
    pub fn cell_index(&self, px: f64, py: f64) -> (isize, isize) {
        (
            (px / self.cell_size).floor() as isize,
            (py / self.cell_size).floor() as isize,
        )
    }

    /// Whether [`sample`](Self::sample) succeeds at `(px, py)`: the containing
    /// cell and its right, bottom and diagonal neighbors all exist.
    pub fn can_sample(&self, px: f64, py: f64) -> bool {
        let (col, row) = self.cell_index(px, py);
        col >= 0 && row >= 0 && (col as usize) + 1 < self.cols && (row as usize) + 1 < self.rows
    }

    /// Bilinearly interpolated direction at pixel position `(px, py)`.
    ///
    /// Blends the top pair and bottom pair of surrounding directions along x,
    /// then blends those along y. At an anchor the result is exactly that
    /// cell's direction. Returns `FlowError::OutOfBoundsSample` when the
    /// surrounding cells are not all inside the grid.
    pub fn sample(&self, px: f64, py: f64) -> Result<DVec2, FlowError> {
        if !self.can_sample(px, py) {
            let (x, y) = self.cell_index(px, py);
            return Err(FlowError::OutOfBoundsSample {
                x,
                y,
                cols: self.cols,
                rows: self.rows,
            });
        }
        let (col, row) = self.cell_index(px, py);
        let (col, row) = (col as usize, row as usize);

        let a = self.cells[row * self.cols + col];
        let b = self.cells[row * self.cols + col + 1];
        let c = self.cells[(row + 1) * self.cols + col];
        let d = self.cells[(row + 1) * self.cols + col + 1];

        let tx = (px - a.anchor.x) / (b.anchor.x - a.anchor.x);
        let ty = (py - a.anchor.y) / (c.anchor.y - a.anchor.y);

        let top = a.direction.lerp(b.direction, tx);
        let bottom = c.direction.lerp(d.direction, tx);
        Ok(top.lerp(bottom, ty))
    }
}

fn check_shape(rows: usize, cols: usize, cell_size: f64) -> Result<(), FlowError> {
    if rows == 0 || cols == 0 {
        return Err(FlowError::InvalidDimensions);
    }
    rows.checked_mul(cols).ok_or(FlowError::InvalidDimensions)?;
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(FlowError::InvalidConfiguration(format!(
            "cell size must be a positive finite number, got {cell_size}"
        )));
    }
    Ok(())
}
