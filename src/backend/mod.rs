//! Backend adapters
//!
//! Each rendering engine gets one adapter implementing the [`Backend`]
//! trait. The trait carries a default, failing body for every drawing verb,
//! so an adapter advertises a capability simply by overriding the method -
//! anything left untouched surfaces the standard not-implemented error
//! naming the verb and the backend. Capability negotiation is therefore a
//! compile-time property of each adapter, not a runtime string dispatch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::figure::layout::Layout;
use crate::figure::trace::{BandTrace, FillTrace, GridTrace, Hist2dTrace, HistTrace, SeriesTrace};
use crate::{AnyplotError, Result};

#[cfg(feature = "ds9")]
pub mod ds9;
#[cfg(feature = "plotly")]
pub mod plotly;
#[cfg(feature = "plotters")]
pub mod plotters;

/// The engines a figure can be constructed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Desktop raster charts rendered with the `plotters` crate.
    Plotters,
    /// Interactive HTML charts rendered with the `plotly` crate.
    Plotly,
    /// FITS images viewed in an external SAOImage DS9 process.
    Ds9,
}

/// Accepted backend names, in the order they are reported.
pub const BACKEND_NAMES: [&str; 3] = ["plotters", "plotly", "ds9"];

impl FromStr for BackendKind {
    type Err = AnyplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plotters" => Ok(BackendKind::Plotters),
            "plotly" => Ok(BackendKind::Plotly),
            "ds9" => Ok(BackendKind::Ds9),
            other => Err(AnyplotError::invalid(format!(
                "<package> must be one of {BACKEND_NAMES:?}, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendKind::Plotters => "plotters",
            BackendKind::Plotly => "plotly",
            BackendKind::Ds9 => "ds9",
        };
        write!(f, "{s}")
    }
}

/// One rendering engine, driving its native API from validated trace
/// records.
///
/// Adapters receive already-sanitized input: sizes match, colors are in
/// range, color norms are resolved. They are responsible only for the
/// translation into native call shapes and for their own resources
/// (windows, temp files, in-memory charts).
pub trait Backend {
    /// The engine this adapter drives, used in error messages.
    fn kind(&self) -> BackendKind;

    /// Re-apply the full set of display properties.
    fn apply_layout(&mut self, layout: &Layout) -> Result<()>;

    fn draw_series(&mut self, _trace: &SeriesTrace) -> Result<()> {
        Err(AnyplotError::unsupported("plot", self.kind()))
    }

    fn draw_hist(&mut self, _trace: &HistTrace) -> Result<()> {
        Err(AnyplotError::unsupported("hist", self.kind()))
    }

    fn draw_hist2d(&mut self, _trace: &Hist2dTrace) -> Result<()> {
        Err(AnyplotError::unsupported("hist2d", self.kind()))
    }

    fn draw_colormap(&mut self, _trace: &GridTrace) -> Result<()> {
        Err(AnyplotError::unsupported("colormap", self.kind()))
    }

    fn draw_contour(&mut self, _trace: &GridTrace, _levels: Option<usize>) -> Result<()> {
        Err(AnyplotError::unsupported("contour", self.kind()))
    }

    fn draw_fill(&mut self, _trace: &FillTrace) -> Result<()> {
        Err(AnyplotError::unsupported("fill_between", self.kind()))
    }

    fn draw_error_band(&mut self, _trace: &BandTrace) -> Result<()> {
        Err(AnyplotError::unsupported("error_band", self.kind()))
    }

    /// Present the figure in the engine's native viewer.
    fn show(&mut self) -> Result<()>;

    /// Persist the figure, normalizing the extension to the engine's
    /// format; returns the path actually written.
    fn save(&mut self, name: &Path) -> Result<PathBuf>;

    /// Release engine resources. Must be idempotent.
    fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names_parse() {
        for name in BACKEND_NAMES {
            let kind: BackendKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
    }

    #[test]
    fn test_unknown_backend_lists_options() {
        let err = "matplotlib".parse::<BackendKind>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("matplotlib"));
        for name in BACKEND_NAMES {
            assert!(message.contains(name));
        }
    }

    #[test]
    fn test_unsupported_error_names_verb_and_backend() {
        let err = AnyplotError::unsupported("hist2d", BackendKind::Plotly);
        let message = err.to_string();
        assert!(message.contains("hist2d"));
        assert!(message.contains("plotly"));
    }
}
