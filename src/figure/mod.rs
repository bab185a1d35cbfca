//! The abstract figure
//!
//! A figure validates and normalizes the full plotting vocabulary once, so
//! every backend adapter receives already-sanitized input. The backend is
//! fixed at construction and never changes; display properties may be set
//! any number of times, each `set` re-applying the whole layout.
//!
//! Validation failures are synchronous and local: a failed call returns
//! before any engine call is issued and leaves both the figure and the
//! backend untouched.

pub mod grid;
pub mod hist;
pub mod layout;
pub mod palette;
pub mod trace;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{Backend, BackendKind};
use crate::figure::grid::{Grid, NormScale};
use crate::figure::hist::HistOptions;
use crate::figure::layout::{Layout, LayoutUpdate};
use crate::figure::palette::ColorCycle;
use crate::figure::trace::{
    BandTrace, FillTrace, GridTrace, Hist2dTrace, HistTrace, PlotOptions, SeriesTrace, Style,
};
use crate::{AnyplotError, Result};

/// Process-unique figure identity, assigned at construction.
pub type FigureId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Options accepted by `colormap`.
#[derive(Debug, Clone, Default)]
pub struct ColormapOptions {
    pub norm: NormScale,
    pub colorscale_label: Option<String>,
}

impl ColormapOptions {
    pub fn with_norm(mut self, norm: NormScale) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_colorscale_label(mut self, label: impl Into<String>) -> Self {
        self.colorscale_label = Some(label.into());
        self
    }
}

/// Options accepted by `contour`: the colormap surface plus a level count.
#[derive(Debug, Clone, Default)]
pub struct ContourOptions {
    pub norm: NormScale,
    pub levels: Option<usize>,
    pub colorscale_label: Option<String>,
}

impl ContourOptions {
    pub fn with_norm(mut self, norm: NormScale) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn with_colorscale_label(mut self, label: impl Into<String>) -> Self {
        self.colorscale_label = Some(label.into());
        self
    }
}

/// Options accepted by `hist2d`.
#[derive(Debug, Clone)]
pub struct Hist2dOptions {
    pub bins: usize,
}

impl Default for Hist2dOptions {
    fn default() -> Self {
        Hist2dOptions { bins: 10 }
    }
}

/// One chart, bound to the backend it was constructed against.
pub struct Figure {
    id: FigureId,
    layout: Layout,
    colors: ColorCycle,
    kind: BackendKind,
    backend: Box<dyn Backend>,
}

impl Figure {
    /// Open a figure on the given backend.
    pub fn new(kind: BackendKind) -> Result<Self> {
        let backend: Box<dyn Backend> = match kind {
            #[cfg(feature = "plotters")]
            BackendKind::Plotters => Box::new(crate::backend::plotters::PlottersBackend::new()),
            #[cfg(feature = "plotly")]
            BackendKind::Plotly => Box::new(crate::backend::plotly::PlotlyBackend::new()),
            #[cfg(feature = "ds9")]
            BackendKind::Ds9 => Box::new(crate::backend::ds9::Ds9Backend::new()),
            #[allow(unreachable_patterns)]
            other => {
                return Err(AnyplotError::invalid(format!(
                    "the {other} backend is not enabled in this build"
                )))
            }
        };
        Ok(Self::with_backend(kind, backend))
    }

    /// Wrap an adapter directly; tests use this to record dispatched traces.
    pub(crate) fn with_backend(kind: BackendKind, backend: Box<dyn Backend>) -> Self {
        Figure {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            layout: Layout::default(),
            colors: ColorCycle::new(),
            kind,
            backend,
        }
    }

    pub fn id(&self) -> FigureId {
        self.id
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn title(&self) -> Option<&str> {
        self.layout.title.as_deref()
    }

    /// Merge display properties and re-apply the full layout immediately.
    pub fn set(&mut self, update: LayoutUpdate) -> Result<()> {
        self.layout.apply(&update);
        self.backend.apply_layout(&self.layout)
    }

    /// Resolve style options, pulling the next palette color when none was
    /// given. The palette cursor only advances on an explicit assignment.
    fn resolve_style(&mut self, opts: PlotOptions) -> Result<Style> {
        opts.validate()?;
        let color = match opts.color {
            Some(color) => color,
            None => self.colors.next_color(),
        };
        Ok(Style {
            label: opts.label,
            color,
            alpha: opts.alpha,
            linewidth: opts.linewidth,
            marker: opts.marker,
            linestyle: opts.linestyle.unwrap_or_default(),
        })
    }

    /// Draw a line/marker series.
    pub fn plot(&mut self, x: &[f64], y: &[f64], opts: PlotOptions) -> Result<()> {
        if x.len() != y.len() {
            return Err(AnyplotError::invalid(format!(
                "<x> and <y> must have the same length, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        let style = self.resolve_style(opts)?;
        tracing::debug!(backend = %self.kind, points = x.len(), "plot");
        self.backend.draw_series(&SeriesTrace {
            x: x.to_vec(),
            y: y.to_vec(),
            style,
        })
    }

    /// Draw values against their indices: `plot_y(v)` is `plot(0..n, v)`.
    pub fn plot_y(&mut self, y: &[f64], opts: PlotOptions) -> Result<()> {
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
        self.plot(&x, y, opts)
    }

    /// Draw a step-outline histogram of the samples.
    pub fn hist(&mut self, samples: &[f64], opts: HistOptions) -> Result<()> {
        let (edges, counts) = hist::histogram(samples, &opts.bins, opts.density)?;
        let (centers, padded) = hist::step_outline(&edges, &counts);
        let style = self.resolve_style(opts.style)?;
        tracing::debug!(backend = %self.kind, bins = counts.len(), "hist");
        self.backend.draw_hist(&HistTrace {
            centers,
            counts: padded,
            style,
        })
    }

    /// 2-D histogram. Validated, but rendered by no backend: the call
    /// always surfaces the adapter's not-implemented error.
    pub fn hist2d(&mut self, x: &[f64], y: &[f64], opts: Hist2dOptions) -> Result<()> {
        if x.len() != y.len() {
            return Err(AnyplotError::invalid(format!(
                "<x> and <y> must have the same length, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        if opts.bins == 0 {
            return Err(AnyplotError::invalid(
                "<bins> must be a positive number of bins",
            ));
        }
        self.backend.draw_hist2d(&Hist2dTrace {
            x: x.to_vec(),
            y: y.to_vec(),
            bins: opts.bins,
        })
    }

    /// Draw a color-mapped grid. `coords`, when given, are a pair of
    /// meshes of exactly the grid's shape.
    pub fn colormap(
        &mut self,
        z: &Grid,
        coords: Option<(&Grid, &Grid)>,
        opts: ColormapOptions,
    ) -> Result<()> {
        let trace = self.grid_trace(z, coords, opts.norm, opts.colorscale_label)?;
        tracing::debug!(backend = %self.kind, rows = z.rows(), cols = z.cols(), "colormap");
        self.backend.draw_colormap(&trace)
    }

    /// Draw iso-level contours of a grid.
    pub fn contour(
        &mut self,
        z: &Grid,
        coords: Option<(&Grid, &Grid)>,
        opts: ContourOptions,
    ) -> Result<()> {
        if let Some(levels) = opts.levels {
            if levels == 0 {
                return Err(AnyplotError::invalid(
                    "<levels> must be a positive number of contour levels",
                ));
            }
        }
        let trace = self.grid_trace(z, coords, opts.norm, opts.colorscale_label)?;
        self.backend.draw_contour(&trace, opts.levels)
    }

    fn grid_trace(
        &mut self,
        z: &Grid,
        coords: Option<(&Grid, &Grid)>,
        norm: NormScale,
        label: Option<String>,
    ) -> Result<GridTrace> {
        let (x, y) = match coords {
            Some((xg, yg)) => {
                let (xs, ys) = grid::reduce_mesh(z, xg, yg)?;
                (Some(xs), Some(ys))
            }
            None => (None, None),
        };
        let (masked, resolved) = grid::resolve_norm(z, norm)?;
        Ok(GridTrace {
            z: masked,
            x,
            y,
            norm: resolved,
            label,
        })
    }

    /// Fill the region between two curves; `y2` defaults to zeros.
    pub fn fill_between(
        &mut self,
        x: &[f64],
        y1: &[f64],
        y2: Option<&[f64]>,
        opts: PlotOptions,
    ) -> Result<()> {
        let y2: Vec<f64> = match y2 {
            Some(y2) => {
                if y2.len() != x.len() {
                    return Err(AnyplotError::invalid(format!(
                        "<x> and <y2> must have the same length, got {} and {}",
                        x.len(),
                        y2.len()
                    )));
                }
                y2.to_vec()
            }
            None => vec![0.0; x.len()],
        };
        if y1.len() != x.len() {
            return Err(AnyplotError::invalid(format!(
                "<x> and <y1> must have the same length, got {} and {}",
                x.len(),
                y1.len()
            )));
        }
        let style = self.resolve_style(opts)?;
        self.backend.draw_fill(&FillTrace {
            x: x.to_vec(),
            y1: y1.to_vec(),
            y2,
            style,
        })
    }

    /// Draw a center line with an uncertainty band. The band must contain
    /// the line: `ylow[i] <= y[i] <= ytop[i]` for every index.
    pub fn error_band(
        &mut self,
        x: &[f64],
        y: &[f64],
        ytop: &[f64],
        ylow: &[f64],
        opts: PlotOptions,
    ) -> Result<()> {
        for (name, seq) in [("y", y), ("ytop", ytop), ("ylow", ylow)] {
            if seq.len() != x.len() {
                return Err(AnyplotError::invalid(format!(
                    "<x> and <{name}> must have the same length, got {} and {}",
                    x.len(),
                    seq.len()
                )));
            }
        }
        for i in 0..x.len() {
            if ylow[i] > y[i] || y[i] > ytop[i] {
                return Err(AnyplotError::invalid(format!(
                    "error band must contain the curve: at index {i}, \
                     ylow={}, y={}, ytop={}",
                    ylow[i], y[i], ytop[i]
                )));
            }
        }
        let style = self.resolve_style(opts)?;
        self.backend.draw_error_band(&BandTrace {
            x: x.to_vec(),
            y: y.to_vec(),
            ytop: ytop.to_vec(),
            ylow: ylow.to_vec(),
            style,
        })
    }

    /// Present the figure in the backend's native viewer.
    pub fn show(&mut self) -> Result<()> {
        self.backend.show()
    }

    /// Persist the figure. With no name, the title is the file name; a
    /// figure with neither fails.
    pub fn save(&mut self, name: Option<&Path>) -> Result<PathBuf> {
        let name = match name {
            Some(name) => name.to_path_buf(),
            None => PathBuf::from(self.layout.title.as_deref().ok_or_else(|| {
                AnyplotError::invalid(
                    "no file name given and the figure has no title to derive one from",
                )
            })?),
        };
        self.backend.save(&name)
    }

    /// Release backend resources.
    pub fn close(&mut self) -> Result<()> {
        self.backend.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::hist::Bins;
    use crate::figure::palette::DEFAULT_PALETTE;
    use crate::figure::trace::{LineStyle, Rgb};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every dispatched trace so tests can inspect what the
    /// abstract layer produced.
    #[derive(Default)]
    struct Recorded {
        series: Vec<SeriesTrace>,
        hists: Vec<HistTrace>,
        fills: Vec<FillTrace>,
        bands: Vec<BandTrace>,
        grids: Vec<GridTrace>,
        layouts: usize,
        closed: bool,
    }

    struct RecordingBackend {
        recorded: Rc<RefCell<Recorded>>,
    }

    impl Backend for RecordingBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Plotters
        }

        fn apply_layout(&mut self, _layout: &Layout) -> Result<()> {
            self.recorded.borrow_mut().layouts += 1;
            Ok(())
        }

        fn draw_series(&mut self, trace: &SeriesTrace) -> Result<()> {
            self.recorded.borrow_mut().series.push(trace.clone());
            Ok(())
        }

        fn draw_hist(&mut self, trace: &HistTrace) -> Result<()> {
            self.recorded.borrow_mut().hists.push(trace.clone());
            Ok(())
        }

        fn draw_fill(&mut self, trace: &FillTrace) -> Result<()> {
            self.recorded.borrow_mut().fills.push(trace.clone());
            Ok(())
        }

        fn draw_error_band(&mut self, trace: &BandTrace) -> Result<()> {
            self.recorded.borrow_mut().bands.push(trace.clone());
            Ok(())
        }

        fn draw_colormap(&mut self, trace: &GridTrace) -> Result<()> {
            self.recorded.borrow_mut().grids.push(trace.clone());
            Ok(())
        }

        fn show(&mut self) -> Result<()> {
            Ok(())
        }

        fn save(&mut self, name: &Path) -> Result<PathBuf> {
            Ok(name.to_path_buf())
        }

        fn close(&mut self) -> Result<()> {
            self.recorded.borrow_mut().closed = true;
            Ok(())
        }
    }

    fn recording_figure() -> (Figure, Rc<RefCell<Recorded>>) {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let figure = Figure::with_backend(
            BackendKind::Plotters,
            Box::new(RecordingBackend {
                recorded: Rc::clone(&recorded),
            }),
        );
        (figure, recorded)
    }

    #[test]
    fn test_plot_rejects_length_mismatch() {
        let (mut fig, _) = recording_figure();
        let err = fig
            .plot(&[1.0, 2.0], &[1.0], PlotOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("same length"));
    }

    #[test]
    fn test_plot_y_matches_indexed_plot() {
        let (mut fig, recorded) = recording_figure();
        let y = [5.0, 7.0, 6.0, 9.0];
        fig.plot_y(&y, PlotOptions::default()).unwrap();
        fig.plot(&[0.0, 1.0, 2.0, 3.0], &y, PlotOptions::default())
            .unwrap();
        let recorded = recorded.borrow();
        assert_eq!(recorded.series[0].x, recorded.series[1].x);
        assert_eq!(recorded.series[0].y, recorded.series[1].y);
    }

    #[test]
    fn test_palette_assignment_round_robin() {
        let (mut fig, recorded) = recording_figure();
        for _ in 0..10 {
            fig.plot(&[0.0, 1.0], &[0.0, 1.0], PlotOptions::default())
                .unwrap();
        }
        let recorded = recorded.borrow();
        assert_eq!(recorded.series[0].style.color, DEFAULT_PALETTE[0]);
        assert_eq!(recorded.series[8].style.color, DEFAULT_PALETTE[8]);
        // Tenth trace wraps around to the first color.
        assert_eq!(recorded.series[9].style.color, DEFAULT_PALETTE[0]);
    }

    #[test]
    fn test_explicit_color_does_not_advance_palette() {
        let (mut fig, recorded) = recording_figure();
        let red = Rgb::new(1.0, 0.0, 0.0).unwrap();
        fig.plot(&[0.0], &[0.0], PlotOptions::default().with_color(red))
            .unwrap();
        fig.plot(&[0.0], &[0.0], PlotOptions::default()).unwrap();
        let recorded = recorded.borrow();
        assert_eq!(recorded.series[0].style.color, red);
        assert_eq!(recorded.series[1].style.color, DEFAULT_PALETTE[0]);
    }

    #[test]
    fn test_hist_dispatches_padded_outline() {
        let (mut fig, recorded) = recording_figure();
        let samples: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin() * 3.0).collect();
        fig.hist(
            &samples,
            HistOptions::default().with_bins(Bins::Count(7)),
        )
        .unwrap();
        let recorded = recorded.borrow();
        let hist = &recorded.hists[0];
        assert_eq!(hist.counts.first(), Some(&0.0));
        assert_eq!(hist.counts.last(), Some(&0.0));
        // 7 bins -> 8 edges -> 9 padded points.
        assert_eq!(hist.centers.len(), 9);
    }

    #[test]
    fn test_fill_between_defaults_y2_to_zeros() {
        let (mut fig, recorded) = recording_figure();
        let x = [0.0, 1.0, 2.0];
        let y1 = [1.0, 2.0, 3.0];
        fig.fill_between(&x, &y1, None, PlotOptions::default())
            .unwrap();
        fig.fill_between(&x, &y1, Some(&[0.0, 0.0, 0.0]), PlotOptions::default())
            .unwrap();
        let recorded = recorded.borrow();
        assert_eq!(recorded.fills[0].y2, recorded.fills[1].y2);
    }

    #[test]
    fn test_error_band_enforces_containment() {
        let (mut fig, _) = recording_figure();
        let x = [0.0, 1.0];
        // y pokes above the top bound at index 1.
        let err = fig
            .error_band(&x, &[0.0, 2.0], &[1.0, 1.0], &[-1.0, -1.0], PlotOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("index 1"));

        fig.error_band(&x, &[0.0, 0.5], &[1.0, 1.0], &[-1.0, -1.0], PlotOptions::default())
            .unwrap();
    }

    #[test]
    fn test_set_reapplies_layout_each_time() {
        let (mut fig, recorded) = recording_figure();
        fig.set(LayoutUpdate::default().with_title("t")).unwrap();
        fig.set(LayoutUpdate::default().with_xlabel("x")).unwrap();
        assert_eq!(recorded.borrow().layouts, 2);
        assert_eq!(fig.title(), Some("t"));
        assert_eq!(fig.layout().xlabel.as_deref(), Some("x"));
    }

    #[test]
    fn test_save_requires_name_or_title() {
        let (mut fig, _) = recording_figure();
        assert!(fig.save(None).is_err());
        fig.set(LayoutUpdate::default().with_title("named")).unwrap();
        let path = fig.save(None).unwrap();
        assert_eq!(path, PathBuf::from("named"));
    }

    #[test]
    fn test_colormap_mesh_reduction() {
        let (mut fig, recorded) = recording_figure();
        let z = Grid::from_fn(2, 3, |r, c| (r * 3 + c) as f64 + 1.0).unwrap();
        let (xx, yy) = Grid::meshgrid(&[0.0, 0.5, 1.0], &[10.0, 20.0]).unwrap();
        fig.colormap(&z, Some((&xx, &yy)), ColormapOptions::default())
            .unwrap();
        let recorded = recorded.borrow();
        let grid = &recorded.grids[0];
        assert_eq!(grid.x.as_deref(), Some([0.0, 0.5, 1.0].as_slice()));
        assert_eq!(grid.y.as_deref(), Some([10.0, 20.0].as_slice()));
    }

    #[test]
    fn test_contour_rejects_zero_levels() {
        let (mut fig, _) = recording_figure();
        let z = Grid::from_fn(2, 2, |_, _| 1.0).unwrap();
        let err = fig
            .contour(&z, None, ContourOptions::default().with_levels(0))
            .unwrap_err();
        assert!(err.to_string().contains("levels"));
    }

    #[test]
    fn test_hist2d_is_validated_but_unsupported_everywhere() {
        #[cfg(feature = "plotly")]
        {
            let mut fig = Figure::new(BackendKind::Plotly).unwrap();
            let err = fig
                .hist2d(&[0.0, 1.0], &[0.0, 1.0], Hist2dOptions::default())
                .unwrap_err();
            let message = err.to_string();
            assert!(message.contains("hist2d"));
            assert!(message.contains("plotly"));

            // Validation still runs first.
            let err = fig
                .hist2d(&[0.0], &[0.0, 1.0], Hist2dOptions::default())
                .unwrap_err();
            assert!(err.to_string().contains("same length"));
        }
        #[cfg(feature = "plotters")]
        {
            let mut fig = Figure::new(BackendKind::Plotters).unwrap();
            let err = fig
                .hist2d(&[0.0], &[0.0], Hist2dOptions::default())
                .unwrap_err();
            assert!(err.to_string().contains("plotters"));
        }
    }

    #[test]
    fn test_series_verbs_unsupported_on_image_backend() {
        #[cfg(feature = "ds9")]
        {
            let mut fig = Figure::new(BackendKind::Ds9).unwrap();
            let err = fig
                .plot(&[0.0, 1.0], &[0.0, 1.0], PlotOptions::default())
                .unwrap_err();
            let message = err.to_string();
            assert!(message.contains("plot"));
            assert!(message.contains("ds9"));

            let err = fig
                .hist(&[0.0, 1.0, 2.0], HistOptions::default())
                .unwrap_err();
            assert!(err.to_string().contains("hist"));
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let (fig_a, _) = recording_figure();
        let (fig_b, _) = recording_figure();
        assert_ne!(fig_a.id(), fig_b.id());
    }

    #[test]
    fn test_linestyle_default_is_solid() {
        let (mut fig, recorded) = recording_figure();
        fig.plot(&[0.0], &[0.0], PlotOptions::default()).unwrap();
        assert_eq!(
            recorded.borrow().series[0].style.linestyle,
            LineStyle::Solid
        );
    }
}
