//! Affine geotransforms and the coordinate scales derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Spatial axis of a dimension scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Axis implied by a CF projection coordinate standard name.
    pub fn from_standard_name(standard_name: &str) -> Option<Self> {
        match standard_name {
            "projection_x_coordinate" => Some(Self::X),
            "projection_y_coordinate" => Some(Self::Y),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::Y => f.write_str("Y"),
        }
    }
}

/// GDAL-ordered 6-coefficient affine transform from pixel indices to
/// projected coordinates, anchored at the outer corner of pixel (0, 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geotransform {
    /// x of the upper-left corner.
    pub x0: f64,
    /// x step per column.
    pub dx: f64,
    /// x step per row (row rotation).
    pub rx: f64,
    /// y of the upper-left corner.
    pub y0: f64,
    /// y step per column (column rotation).
    pub ry: f64,
    /// y step per row; negative for north-up grids.
    pub dy: f64,
}

impl Geotransform {
    pub fn from_coefficients(coefficients: &[f64]) -> Option<Self> {
        let [x0, dx, rx, y0, ry, dy] = <[f64; 6]>::try_from(coefficients).ok()?;
        Some(Self {
            x0,
            dx,
            rx,
            y0,
            ry,
            dy,
        })
    }

    /// Projected coordinates of the centre of the cell at (`column`, `row`).
    pub fn cell_center(&self, column: usize, row: usize) -> (f64, f64) {
        let column = column as f64 + 0.5;
        let row = row as f64 + 0.5;
        let x = self.x0 + column * self.dx + row * self.rx;
        let y = self.y0 + column * self.ry + row * self.dy;
        (x, y)
    }

    /// Cell-centre coordinates along one axis of a window starting at `start_index`.
    ///
    /// X scales walk the first row, Y scales walk the first column, so skew
    /// terms contribute their half-cell offset.
    pub fn dimension_scale(&self, axis: Axis, start_index: usize, length: usize) -> Vec<f64> {
        (start_index..start_index + length)
            .map(|index| match axis {
                Axis::X => self.cell_center(index, 0).0,
                Axis::Y => self.cell_center(0, index).1,
            })
            .collect()
    }
}
