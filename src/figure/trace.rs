//! Validated trace records and their style vocabulary
//!
//! A trace record is the backend-neutral product of validating one plotting
//! call. It lives exactly as long as the call that produced it: the figure
//! builds it, the adapter consumes it, nothing persists it.

use std::fmt;
use std::str::FromStr;

use crate::figure::grid::{Grid, ResolvedNorm};
use crate::{AnyplotError, Result};

/// An RGB color with each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    r: f64,
    g: f64,
    b: f64,
}

impl Rgb {
    /// Build a color, rejecting channels outside `[0, 1]`.
    pub fn new(r: f64, g: f64, b: f64) -> Result<Self> {
        for (name, value) in [("r", r), ("g", g), ("b", b)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnyplotError::invalid(format!(
                    "color channel <{name}> must be in [0, 1], got {value}"
                )));
            }
        }
        Ok(Rgb { r, g, b })
    }

    /// Palette constructor for channel values known to be in range.
    pub(crate) const fn new_unchecked(r: f64, g: f64, b: f64) -> Self {
        Rgb { r, g, b }
    }

    /// Channels as unit floats.
    pub fn channels(&self) -> (f64, f64, f64) {
        (self.r, self.g, self.b)
    }

    /// Channels quantized to 8 bits.
    pub fn to_u8(&self) -> (u8, u8, u8) {
        let q = |v: f64| (v * 255.0).round() as u8;
        (q(self.r), q(self.g), q(self.b))
    }

    /// Two-hex-digit-per-channel encoding, `#rrggbb`.
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_u8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Parse a `#rrggbb` string back into a color.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AnyplotError::invalid(format!(
                "expected a #rrggbb color string, got {hex:?}"
            )));
        }
        let channel = |s: &str| -> f64 {
            // Validated as hex digits above.
            u8::from_str_radix(s, 16).unwrap_or(0) as f64 / 255.0
        };
        Ok(Rgb {
            r: channel(&digits[0..2]),
            g: channel(&digits[2..4]),
            b: channel(&digits[4..6]),
        })
    }
}

/// Marker vocabulary shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `.` - small filled dot
    Point,
    /// `+` - plus sign
    Plus,
    /// `x` - diagonal cross
    Cross,
    /// `o` - open circle
    Circle,
}

impl FromStr for Marker {
    type Err = AnyplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "." => Ok(Marker::Point),
            "+" => Ok(Marker::Plus),
            "x" => Ok(Marker::Cross),
            "o" => Ok(Marker::Circle),
            other => Err(AnyplotError::invalid(format!(
                "<marker> must be one of [\".\", \"+\", \"x\", \"o\"], got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Marker::Point => ".",
            Marker::Plus => "+",
            Marker::Cross => "x",
            Marker::Circle => "o",
        };
        write!(f, "{s}")
    }
}

/// Line style vocabulary shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    /// No line at all - markers only.
    None,
    Dashed,
    Dotted,
}

impl FromStr for LineStyle {
    type Err = AnyplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "solid" | "-" => Ok(LineStyle::Solid),
            "none" | "" => Ok(LineStyle::None),
            "dashed" | "--" => Ok(LineStyle::Dashed),
            "dotted" | ":" => Ok(LineStyle::Dotted),
            other => Err(AnyplotError::invalid(format!(
                "<linestyle> must be one of [\"solid\", \"none\", \"dashed\", \"dotted\"], got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LineStyle::Solid => "solid",
            LineStyle::None => "none",
            LineStyle::Dashed => "dashed",
            LineStyle::Dotted => "dotted",
        };
        write!(f, "{s}")
    }
}

/// Caller-facing style options accepted by the plotting verbs.
///
/// The typed fields are the whole keyword surface; there is no way to pass
/// an unrecognized option.
#[derive(Debug, Clone, Default)]
pub struct PlotOptions {
    pub label: Option<String>,
    pub marker: Option<Marker>,
    pub color: Option<Rgb>,
    pub alpha: Option<f64>,
    pub linestyle: Option<LineStyle>,
    pub linewidth: Option<f64>,
}

impl PlotOptions {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_linestyle(mut self, linestyle: LineStyle) -> Self {
        self.linestyle = Some(linestyle);
        self
    }

    pub fn with_linewidth(mut self, linewidth: f64) -> Self {
        self.linewidth = Some(linewidth);
        self
    }

    /// Validate the numeric options.
    ///
    /// The color is left unresolved here; the figure fills it from its
    /// palette when the caller gave none.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(alpha) = self.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(AnyplotError::invalid(format!(
                    "<alpha> must be in [0, 1], got {alpha}"
                )));
            }
        }
        if let Some(width) = self.linewidth {
            if !width.is_finite() || width <= 0.0 {
                return Err(AnyplotError::invalid(format!(
                    "<linewidth> must be a positive number, got {width}"
                )));
            }
        }
        Ok(())
    }
}

/// Fully resolved style attached to a trace record.
#[derive(Debug, Clone)]
pub struct Style {
    pub label: Option<String>,
    pub color: Rgb,
    pub alpha: Option<f64>,
    pub linewidth: Option<f64>,
    pub marker: Option<Marker>,
    pub linestyle: LineStyle,
}

/// One x/y line or marker series.
#[derive(Debug, Clone)]
pub struct SeriesTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub style: Style,
}

/// A padded step-outline histogram: `counts[0]` and `counts[n-1]` are zero,
/// and `centers` has one point per padded bin.
#[derive(Debug, Clone)]
pub struct HistTrace {
    pub centers: Vec<f64>,
    pub counts: Vec<f64>,
    pub style: Style,
}

/// Validated arguments of the (deliberately unrendered) `hist2d` verb.
#[derive(Debug, Clone)]
pub struct Hist2dTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub bins: usize,
}

/// A region between two curves.
#[derive(Debug, Clone)]
pub struct FillTrace {
    pub x: Vec<f64>,
    pub y1: Vec<f64>,
    pub y2: Vec<f64>,
    pub style: Style,
}

/// A center line with an enclosing uncertainty band.
#[derive(Debug, Clone)]
pub struct BandTrace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub ytop: Vec<f64>,
    pub ylow: Vec<f64>,
    pub style: Style,
}

/// A 2-D grid ready for color mapping.
///
/// Under a logarithmic norm the grid is already masked: non-positive cells
/// are NaN ("undefined") and the resolved range excludes them. Axis
/// coordinates, when present, have been reduced from mesh grids to vectors.
#[derive(Debug, Clone)]
pub struct GridTrace {
    pub z: Grid,
    pub x: Option<Vec<f64>>,
    pub y: Option<Vec<f64>>,
    pub norm: ResolvedNorm,
    pub label: Option<String>,
}
