//! 2-D grids and color normalization
//!
//! `colormap` and `contour` consume a dense row-major grid plus an optional
//! pair of coordinate meshes. Validation reduces the meshes to axis vectors
//! and resolves the color range once, in the abstract layer, so every
//! backend agrees on it. Under a logarithmic norm, non-positive values are
//! masked to NaN ("undefined"), excluded from the range, and reported with
//! a single warning - the only degrade-and-continue path in the crate.

use std::fmt;
use std::str::FromStr;

use crate::{AnyplotError, Result};

/// A dense row-major `f64` grid. Row index maps to the y axis, column
/// index to the x axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Grid {
    /// Build a grid from equal-length rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.is_empty() || rows[0].is_empty() {
            return Err(AnyplotError::invalid("<z> must be a non-empty 2-D grid"));
        }
        let cols = rows[0].len();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(AnyplotError::invalid(
                "<z> rows must all have the same length",
            ));
        }
        let n_rows = rows.len();
        let values = rows.into_iter().flatten().collect();
        Ok(Grid {
            rows: n_rows,
            cols,
            values,
        })
    }

    /// Build a grid by evaluating `f(row, col)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(AnyplotError::invalid("<z> must be a non-empty 2-D grid"));
        }
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                values.push(f(r, c));
            }
        }
        Ok(Grid { rows, cols, values })
    }

    /// Coordinate meshes for axis vectors, numpy-meshgrid style: the first
    /// grid repeats `xs` along every row, the second repeats `ys` down
    /// every column.
    pub fn meshgrid(xs: &[f64], ys: &[f64]) -> Result<(Grid, Grid)> {
        let xx = Grid::from_fn(ys.len(), xs.len(), |_, c| xs[c])?;
        let yy = Grid::from_fn(ys.len(), xs.len(), |r, _| ys[r])?;
        Ok((xx, yy))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    /// Row-major cell values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    /// Rows as owned vectors (the shape interactive heatmaps want).
    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    fn same_shape(&self, other: &Grid) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }
}

/// Color normalization scale, `"lin"` or `"log"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormScale {
    #[default]
    Linear,
    Log,
}

impl FromStr for NormScale {
    type Err = AnyplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lin" => Ok(NormScale::Linear),
            "log" => Ok(NormScale::Log),
            other => Err(AnyplotError::invalid(format!(
                "<norm> must be one of [\"lin\", \"log\"], got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for NormScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormScale::Linear => write!(f, "lin"),
            NormScale::Log => write!(f, "log"),
        }
    }
}

/// A color range resolved against the data, shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNorm {
    pub scale: NormScale,
    pub vmin: f64,
    pub vmax: f64,
}

impl ResolvedNorm {
    /// Map a value into `[0, 1]` along the scale. NaN maps to NaN.
    pub fn unit(&self, value: f64) -> f64 {
        match self.scale {
            NormScale::Linear => {
                if self.vmax == self.vmin {
                    0.5
                } else {
                    (value - self.vmin) / (self.vmax - self.vmin)
                }
            }
            NormScale::Log => {
                let span = (self.vmax / self.vmin).ln();
                if span == 0.0 {
                    0.5
                } else {
                    (value / self.vmin).ln() / span
                }
            }
        }
    }
}

/// Reduce coordinate meshes to axis vectors, checking shapes against `z`.
///
/// The x mesh varies along columns and the y mesh along rows, so the first
/// row and the first column carry the full coordinate information.
pub(crate) fn reduce_mesh(z: &Grid, x: &Grid, y: &Grid) -> Result<(Vec<f64>, Vec<f64>)> {
    if !z.same_shape(x) || !z.same_shape(y) {
        return Err(AnyplotError::invalid(format!(
            "<x> and <y> must have the same shape as <z> ({}x{}), got {}x{} and {}x{}",
            z.rows(),
            z.cols(),
            x.rows(),
            x.cols(),
            y.rows(),
            y.cols()
        )));
    }
    let xs = x.row(0).to_vec();
    let ys = (0..y.rows()).map(|r| y.get(r, 0)).collect();
    Ok((xs, ys))
}

/// Resolve the color range, masking non-positive cells under a log scale.
///
/// Returns the (possibly masked) grid together with the resolved range.
pub(crate) fn resolve_norm(z: &Grid, scale: NormScale) -> Result<(Grid, ResolvedNorm)> {
    match scale {
        NormScale::Linear => {
            let (vmin, vmax) = finite_min_max(z.values()).ok_or_else(|| {
                AnyplotError::invalid("<z> must contain at least one finite value")
            })?;
            Ok((
                z.clone(),
                ResolvedNorm {
                    scale,
                    vmin,
                    vmax,
                },
            ))
        }
        NormScale::Log => {
            let mut masked = z.clone();
            let mut dropped = 0_usize;
            for r in 0..masked.rows() {
                for c in 0..masked.cols() {
                    let v = masked.get(r, c);
                    if v.is_finite() && v <= 0.0 {
                        masked.set(r, c, f64::NAN);
                        dropped += 1;
                    }
                }
            }
            if dropped > 0 {
                tracing::warn!(
                    dropped,
                    "log color scale selected with non-positive <z> values; \
                     they are treated as undefined and will not appear in the plot"
                );
            }
            let (vmin, vmax) = finite_min_max(masked.values()).ok_or_else(|| {
                AnyplotError::invalid(
                    "log color scale requires at least one positive <z> value",
                )
            })?;
            Ok((
                masked,
                ResolvedNorm {
                    scale,
                    vmin,
                    vmax,
                },
            ))
        }
    }
}

fn finite_min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    (min <= max).then_some((min, max))
}
