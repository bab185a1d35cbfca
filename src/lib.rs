//! anyplot - one plotting vocabulary, three rendering engines
//!
//! anyplot lets client code call a single set of plotting verbs (`plot`,
//! `hist`, `colormap`, `contour`, `fill_between`, `error_band`, `set`,
//! `show`, `save`, `close`) without committing to one charting engine.
//! Every call is validated once, normalized into a backend-neutral trace
//! record, and handed to whichever adapter the figure was constructed
//! against.
//!
//! # Architecture
//!
//! - [`figure`] - the abstract figure: display properties, argument
//!   validation, and the default color cycle. Produces trace records.
//! - [`backend`] - one adapter per engine behind the [`Backend`] trait:
//!   `plotters` (desktop raster), `plotly` (interactive HTML) and `ds9`
//!   (FITS files viewed in an external SAOImage DS9 process). Adapters are
//!   selected at figure construction, never per call.
//! - [`manager`] - an ordered registry of open figures with bulk
//!   `show_all`/`save_all` operations.
//!
//! # Example
//!
//! ```rust,ignore
//! use anyplot::{FigureManager, NewFigureOptions, LayoutUpdate, PlotOptions};
//!
//! let mut manager = FigureManager::new();
//! let fig = manager.new_figure(
//!     NewFigureOptions::default()
//!         .with_layout(LayoutUpdate::default().with_title("demo").with_xlabel("x")),
//! )?;
//! fig.plot(&x, &y, PlotOptions::default().with_label("signal"))?;
//! manager.save_all(&Default::default())?;
//! ```

pub mod backend;
pub mod figure;
pub mod manager;

pub use backend::{Backend, BackendKind};
pub use figure::grid::{Grid, NormScale, ResolvedNorm};
pub use figure::hist::{BinRule, Bins, HistOptions};
pub use figure::layout::{Aspect, AxisScale, Layout, LayoutUpdate};
pub use figure::trace::{LineStyle, Marker, PlotOptions, Rgb};
pub use figure::{ColormapOptions, ContourOptions, Figure, FigureId, Hist2dOptions};
pub use manager::{FigureManager, NewFigureOptions, SaveAllOptions, SaveDir};

use thiserror::Error;

/// Crate version, exposed for the CLI `--version` flag.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for all anyplot operations.
///
/// Every failure is synchronous and local to the offending call; nothing is
/// retried or queued. Validation errors fire before any engine call is
/// issued, so a failed call leaves the figure unchanged.
#[derive(Error, Debug)]
pub enum AnyplotError {
    /// Caller-supplied arguments failed validation (wrong domain, mismatched
    /// lengths, inconsistent band ordering, unknown property name).
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The selected backend does not implement the requested verb or keyword.
    #[error("unsupported operation: {0}")]
    UnsupportedError(String),

    /// The engine failed while rendering or launching.
    #[error("backend error: {0}")]
    BackendError(String),

    /// Filesystem failure while saving or cleaning up.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnyplotError {
    /// Standard not-implemented error, naming the verb and the backend.
    pub fn unsupported(verb: &str, backend: BackendKind) -> Self {
        AnyplotError::UnsupportedError(format!(
            "<{verb}> is not implemented for the {backend} backend"
        ))
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AnyplotError::ValidationError(message.into())
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AnyplotError>;
