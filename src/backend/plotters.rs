//! Plotters adapter
//!
//! Desktop raster charts. Unlike the interactive engine, plotters draws
//! straight onto an output surface, so this adapter is a retained scene:
//! every validated trace is buffered and the whole figure is replayed onto
//! a fresh surface at `save`/`show` time. Layout changes therefore apply to
//! the next replay, which keeps `set` re-application trivial.
//!
//! # Mapping strategy
//!
//! - series become line and/or marker series, with a legend box iff any
//!   trace carried a label
//! - histograms become an unfilled horizontal-then-vertical step path over
//!   the padded centers/counts
//! - colormaps become per-cell rectangles through the viridis colormap,
//!   with a gradient colorbar beside the axes; masked (NaN) cells are
//!   simply not drawn
//! - contours are marching-squares level lines colored against the same
//!   colorbar
//! - bands and fills are closed polygons traced forward along the upper
//!   bound and backward along the lower one

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use plotters::chart::{ChartBuilder, ChartContext, SeriesLabelPosition};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};

use crate::backend::{Backend, BackendKind};
use crate::figure::grid::{NormScale, ResolvedNorm};
use crate::figure::layout::{Aspect, AxisScale, Layout};
use crate::figure::trace::{
    BandTrace, FillTrace, GridTrace, HistTrace, LineStyle, Marker, Rgb, SeriesTrace, Style,
};
use crate::{AnyplotError, Result};

const CANVAS: (u32, u32) = (960, 720);
const COLORBAR_WIDTH: u32 = 110;
const COLORBAR_STRIPS: usize = 64;
const DEFAULT_CONTOUR_LEVELS: usize = 10;
/// Fill opacity for bands and fills that carry no explicit alpha.
const BAND_ALPHA: f64 = 0.5;

static PREVIEW_SEQ: AtomicU64 = AtomicU64::new(0);

enum SceneTrace {
    Series(SeriesTrace),
    Hist(HistTrace),
    Fill(FillTrace),
    Band(BandTrace),
    Colormap(GridTrace),
    Contour { grid: GridTrace, levels: usize },
}

enum OutputFormat {
    Png,
    Svg,
}

pub struct PlottersBackend {
    layout: Layout,
    traces: Vec<SceneTrace>,
    preview: Option<PathBuf>,
}

impl PlottersBackend {
    pub fn new() -> Self {
        PlottersBackend {
            layout: Layout::default(),
            traces: Vec::new(),
            preview: None,
        }
    }

    fn render_to(&self, path: &Path, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Png => {
                let root = BitMapBackend::new(path, CANVAS).into_drawing_area();
                self.render(&root)?;
                root.present().map_err(render_err)?;
            }
            OutputFormat::Svg => {
                let root = SVGBackend::new(path, CANVAS).into_drawing_area();
                self.render(&root)?;
                root.present().map_err(render_err)?;
            }
        }
        Ok(())
    }

    fn render<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).map_err(render_err)?;

        let mut region = root.clone();
        if self.layout.show_title {
            if let Some(title) = &self.layout.title {
                region = region
                    .titled(title, ("sans-serif", 26))
                    .map_err(render_err)?;
            }
        }
        if let Some(subtitle) = &self.layout.subtitle {
            let style = ("sans-serif", 16).into_font().color(&BLACK.mix(0.6));
            region = region.titled(subtitle, style).map_err(render_err)?;
        }

        // One colorbar per figure, fed by the first grid trace.
        let colorbar = self.traces.iter().find_map(|t| match t {
            SceneTrace::Colormap(g) => Some((g.norm, g.label.clone())),
            SceneTrace::Contour { grid, .. } => Some((grid.norm, grid.label.clone())),
            _ => None,
        });

        let (plot_area, bar_area) = if colorbar.is_some() {
            let (width, _) = region.dim_in_pixel();
            let (plot, bar) =
                region.split_horizontally(width.saturating_sub(COLORBAR_WIDTH) as i32);
            (plot, Some(bar))
        } else {
            (region, None)
        };

        let mut bounds = self.data_bounds();
        if self.layout.aspect == Some(Aspect::Equal)
            && self.layout.xscale == AxisScale::Linear
            && self.layout.yscale == AxisScale::Linear
        {
            let (width, height) = plot_area.dim_in_pixel();
            bounds = equalize(bounds, width as f64, height as f64);
        }
        let ((xlo, xhi), (ylo, yhi)) = bounds;

        let mut builder = ChartBuilder::on(&plot_area);
        builder
            .margin(12)
            .x_label_area_size(42)
            .y_label_area_size(56);

        match (self.layout.xscale, self.layout.yscale) {
            (AxisScale::Linear, AxisScale::Linear) => {
                let mut chart = builder
                    .build_cartesian_2d(xlo..xhi, ylo..yhi)
                    .map_err(render_err)?;
                self.populate(&mut chart)?;
            }
            (AxisScale::Log, AxisScale::Linear) => {
                let (xlo, xhi) = log_extent(xlo, xhi)?;
                let mut chart = builder
                    .build_cartesian_2d((xlo..xhi).log_scale(), ylo..yhi)
                    .map_err(render_err)?;
                self.populate(&mut chart)?;
            }
            (AxisScale::Linear, AxisScale::Log) => {
                let (ylo, yhi) = log_extent(ylo, yhi)?;
                let mut chart = builder
                    .build_cartesian_2d(xlo..xhi, (ylo..yhi).log_scale())
                    .map_err(render_err)?;
                self.populate(&mut chart)?;
            }
            (AxisScale::Log, AxisScale::Log) => {
                let (xlo, xhi) = log_extent(xlo, xhi)?;
                let (ylo, yhi) = log_extent(ylo, yhi)?;
                let mut chart = builder
                    .build_cartesian_2d((xlo..xhi).log_scale(), (ylo..yhi).log_scale())
                    .map_err(render_err)?;
                self.populate(&mut chart)?;
            }
        }

        if let (Some(bar), Some((norm, label))) = (bar_area, colorbar) {
            self.draw_colorbar(&bar, &norm, label.as_deref())?;
        }
        Ok(())
    }

    fn populate<'a, DB, X, Y>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
    ) -> Result<()>
    where
        DB: DrawingBackend + 'a,
        DB::ErrorType: 'static,
        X: Ranged<ValueType = f64> + ValueFormatter<f64>,
        Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        chart
            .configure_mesh()
            .x_desc(self.layout.xlabel.clone().unwrap_or_default())
            .y_desc(self.layout.ylabel.clone().unwrap_or_default())
            .light_line_style(BLACK.mix(0.08))
            .draw()
            .map_err(render_err)?;

        let mut any_label = false;
        for trace in &self.traces {
            match trace {
                SceneTrace::Series(t) => {
                    any_label |= t.style.label.is_some();
                    self.draw_line_and_markers(chart, &t.x, &t.y, &t.style, false)?;
                }
                SceneTrace::Hist(t) => {
                    any_label |= t.style.label.is_some();
                    self.draw_line_and_markers(chart, &t.centers, &t.counts, &t.style, true)?;
                }
                SceneTrace::Fill(t) => {
                    any_label |= t.style.label.is_some();
                    self.draw_polygon(chart, &t.x, &t.y1, &t.y2, &t.style, t.style.label.as_deref())?;
                }
                SceneTrace::Band(t) => {
                    any_label |= t.style.label.is_some();
                    self.draw_polygon(chart, &t.x, &t.ytop, &t.ylow, &t.style, None)?;
                    self.draw_line_and_markers(chart, &t.x, &t.y, &t.style, false)?;
                }
                SceneTrace::Colormap(g) => self.draw_cells(chart, g)?,
                SceneTrace::Contour { grid, levels } => {
                    self.draw_contour_lines(chart, grid, *levels)?
                }
            }
        }

        if any_label {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .map_err(render_err)?;
        }
        Ok(())
    }

    fn draw_line_and_markers<'a, DB, X, Y>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
        xs: &[f64],
        ys: &[f64],
        style: &Style,
        step: bool,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
        X: Ranged<ValueType = f64> + ValueFormatter<f64>,
        Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        let points: Vec<(f64, f64)> = if step {
            step_path(xs, ys)
        } else {
            xs.iter().copied().zip(ys.iter().copied()).collect()
        };
        let stroke = to_rgba(style.color, style.alpha)
            .stroke_width(style.linewidth.map(|w| (w.round() as u32).max(1)).unwrap_or(1));
        let mut label_pending = style.label.as_deref();

        if style.linestyle != LineStyle::None {
            let anno = match style.linestyle {
                LineStyle::Solid => chart
                    .draw_series(LineSeries::new(points.clone(), stroke))
                    .map_err(render_err)?,
                LineStyle::Dashed => chart
                    .draw_series(DashedLineSeries::new(points.clone(), 8, 5, stroke))
                    .map_err(render_err)?,
                LineStyle::Dotted => chart
                    .draw_series(DashedLineSeries::new(points.clone(), 2, 4, stroke))
                    .map_err(render_err)?,
                LineStyle::None => unreachable!(),
            };
            if let Some(label) = label_pending.take() {
                anno.label(label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], stroke));
            }
        }

        if let Some(marker) = style.marker {
            let markers: Vec<(f64, f64)> =
                xs.iter().copied().zip(ys.iter().copied()).collect();
            let fill = to_rgba(style.color, style.alpha).filled();
            let anno = match marker {
                Marker::Point => chart
                    .draw_series(markers.iter().map(|&p| Circle::new(p, 2, fill)))
                    .map_err(render_err)?,
                Marker::Circle => chart
                    .draw_series(markers.iter().map(|&p| Circle::new(p, 4, stroke)))
                    .map_err(render_err)?,
                Marker::Cross => chart
                    .draw_series(markers.iter().map(|&p| Cross::new(p, 4, stroke)))
                    .map_err(render_err)?,
                Marker::Plus => chart
                    .draw_series(markers.iter().map(|&p| {
                        EmptyElement::at(p)
                            + PathElement::new(vec![(-4, 0), (4, 0)], stroke)
                            + PathElement::new(vec![(0, -4), (0, 4)], stroke)
                    }))
                    .map_err(render_err)?,
            };
            if let Some(label) = label_pending.take() {
                anno.label(label)
                    .legend(move |(x, y)| Circle::new((x + 9, y), 3, fill));
            }
        }
        Ok(())
    }

    /// Closed polygon forward along `upper`, backward along `lower`.
    fn draw_polygon<'a, DB, X, Y>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
        xs: &[f64],
        upper: &[f64],
        lower: &[f64],
        style: &Style,
        label: Option<&str>,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
        X: Ranged<ValueType = f64> + ValueFormatter<f64>,
        Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        let mut points: Vec<(f64, f64)> =
            xs.iter().copied().zip(upper.iter().copied()).collect();
        points.extend(xs.iter().rev().copied().zip(lower.iter().rev().copied()));
        let fill = to_rgba(style.color, Some(style.alpha.unwrap_or(BAND_ALPHA))).filled();
        let anno = chart
            .draw_series(std::iter::once(Polygon::new(points, fill)))
            .map_err(render_err)?;
        if let Some(label) = label {
            anno.label(label)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], fill));
        }
        Ok(())
    }

    fn draw_cells<'a, DB, X, Y>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
        grid: &GridTrace,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
        X: Ranged<ValueType = f64> + ValueFormatter<f64>,
        Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        let xs = axis_or_index(&grid.x, grid.z.cols());
        let ys = axis_or_index(&grid.y, grid.z.rows());
        let x_edges = edges_from_centers(&xs);
        let y_edges = edges_from_centers(&ys);

        let mut cells = Vec::new();
        for r in 0..grid.z.rows() {
            for c in 0..grid.z.cols() {
                let value = grid.z.get(r, c);
                if !value.is_finite() {
                    continue;
                }
                let t = grid.norm.unit(value).clamp(0.0, 1.0);
                let color = ViridisRGB.get_color(t as f32);
                cells.push(Rectangle::new(
                    [
                        (x_edges[c], y_edges[r]),
                        (x_edges[c + 1], y_edges[r + 1]),
                    ],
                    color.filled(),
                ));
            }
        }
        chart.draw_series(cells).map_err(render_err)?;
        Ok(())
    }

    fn draw_contour_lines<'a, DB, X, Y>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
        grid: &GridTrace,
        levels: usize,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
        X: Ranged<ValueType = f64> + ValueFormatter<f64>,
        Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        let xs = axis_or_index(&grid.x, grid.z.cols());
        let ys = axis_or_index(&grid.y, grid.z.rows());
        for level in level_values(&grid.norm, levels) {
            let t = grid.norm.unit(level).clamp(0.0, 1.0);
            let color = ViridisRGB.get_color(t as f32);
            let segments = marching_squares(grid, &xs, &ys, level);
            chart
                .draw_series(
                    segments
                        .into_iter()
                        .map(|(a, b)| PathElement::new(vec![a, b], color.stroke_width(1))),
                )
                .map_err(render_err)?;
        }
        Ok(())
    }

    fn draw_colorbar<DB>(
        &self,
        area: &DrawingArea<DB, Shift>,
        norm: &ResolvedNorm,
        label: Option<&str>,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let mut builder = ChartBuilder::on(area);
        builder.margin(10).y_label_area_size(48);
        match norm.scale {
            NormScale::Linear => {
                let mut chart = builder
                    .build_cartesian_2d(0.0..1.0, norm.vmin..norm.vmax)
                    .map_err(render_err)?;
                self.colorbar_strips(&mut chart, norm, label)?;
            }
            NormScale::Log => {
                let mut chart = builder
                    .build_cartesian_2d(0.0..1.0, (norm.vmin..norm.vmax).log_scale())
                    .map_err(render_err)?;
                self.colorbar_strips(&mut chart, norm, label)?;
            }
        }
        Ok(())
    }

    fn colorbar_strips<'a, DB, Y>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, Y>>,
        norm: &ResolvedNorm,
        label: Option<&str>,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
        Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        chart
            .configure_mesh()
            .disable_x_axis()
            .disable_x_mesh()
            .disable_y_mesh()
            .y_labels(6)
            .y_desc(label.unwrap_or_default())
            .draw()
            .map_err(render_err)?;
        let strips = (0..COLORBAR_STRIPS).map(|i| {
            let t0 = i as f64 / COLORBAR_STRIPS as f64;
            let t1 = (i + 1) as f64 / COLORBAR_STRIPS as f64;
            let color = ViridisRGB.get_color(((t0 + t1) / 2.0) as f32);
            Rectangle::new(
                [(0.0, value_at(norm, t0)), (1.0, value_at(norm, t1))],
                color.filled(),
            )
        });
        chart.draw_series(strips).map_err(render_err)?;
        Ok(())
    }

    /// Joint extent of all buffered traces, padded by 5%.
    fn data_bounds(&self) -> ((f64, f64), (f64, f64)) {
        let mut x = Extent::default();
        let mut y = Extent::default();
        for trace in &self.traces {
            match trace {
                SceneTrace::Series(t) => {
                    x.update_all(&t.x);
                    y.update_all(&t.y);
                }
                SceneTrace::Hist(t) => {
                    x.update_all(&t.centers);
                    y.update_all(&t.counts);
                }
                SceneTrace::Fill(t) => {
                    x.update_all(&t.x);
                    y.update_all(&t.y1);
                    y.update_all(&t.y2);
                }
                SceneTrace::Band(t) => {
                    x.update_all(&t.x);
                    y.update_all(&t.y);
                    y.update_all(&t.ytop);
                    y.update_all(&t.ylow);
                }
                SceneTrace::Colormap(g) | SceneTrace::Contour { grid: g, .. } => {
                    x.update_all(&edges_from_centers(&axis_or_index(&g.x, g.z.cols())));
                    y.update_all(&edges_from_centers(&axis_or_index(&g.y, g.z.rows())));
                }
            }
        }
        (x.padded(), y.padded())
    }
}

impl Default for PlottersBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for PlottersBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Plotters
    }

    fn apply_layout(&mut self, layout: &Layout) -> Result<()> {
        // Retained scene: the layout is consumed at replay time.
        self.layout = layout.clone();
        Ok(())
    }

    fn draw_series(&mut self, trace: &SeriesTrace) -> Result<()> {
        self.traces.push(SceneTrace::Series(trace.clone()));
        Ok(())
    }

    fn draw_hist(&mut self, trace: &HistTrace) -> Result<()> {
        self.traces.push(SceneTrace::Hist(trace.clone()));
        Ok(())
    }

    fn draw_fill(&mut self, trace: &FillTrace) -> Result<()> {
        self.traces.push(SceneTrace::Fill(trace.clone()));
        Ok(())
    }

    fn draw_error_band(&mut self, trace: &BandTrace) -> Result<()> {
        self.traces.push(SceneTrace::Band(trace.clone()));
        Ok(())
    }

    fn draw_colormap(&mut self, trace: &GridTrace) -> Result<()> {
        self.traces.push(SceneTrace::Colormap(trace.clone()));
        Ok(())
    }

    fn draw_contour(&mut self, trace: &GridTrace, levels: Option<usize>) -> Result<()> {
        self.traces.push(SceneTrace::Contour {
            grid: trace.clone(),
            levels: levels.unwrap_or(DEFAULT_CONTOUR_LEVELS),
        });
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let path = std::env::temp_dir().join(format!(
            "anyplot-preview-{}-{}.png",
            std::process::id(),
            PREVIEW_SEQ.fetch_add(1, Ordering::Relaxed),
        ));
        self.render_to(&path, OutputFormat::Png)?;
        // Blocks on the launcher; with synchronous viewers this is the
        // modal, one-figure-at-a-time presentation.
        open::that(&path)?;
        self.preview = Some(path);
        Ok(())
    }

    fn save(&mut self, name: &Path) -> Result<PathBuf> {
        let (path, format) = resolve_output_path(name);
        self.render_to(&path, format)?;
        Ok(path)
    }

    fn close(&mut self) -> Result<()> {
        self.traces.clear();
        if let Some(preview) = self.preview.take() {
            if preview.exists() {
                fs::remove_file(preview)?;
            }
        }
        Ok(())
    }
}

/// Default extension is the raster one; `.svg` is honored, anything else
/// becomes `.png`.
fn resolve_output_path(name: &Path) -> (PathBuf, OutputFormat) {
    match name.extension().and_then(|e| e.to_str()) {
        Some("svg") => (name.to_path_buf(), OutputFormat::Svg),
        Some("png") => (name.to_path_buf(), OutputFormat::Png),
        _ => (name.with_extension("png"), OutputFormat::Png),
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> AnyplotError {
    AnyplotError::BackendError(format!("rendering failed: {e}"))
}

fn to_rgba(color: Rgb, alpha: Option<f64>) -> RGBAColor {
    let (r, g, b) = color.to_u8();
    RGBColor(r, g, b).mix(alpha.unwrap_or(1.0))
}

/// Horizontal-then-vertical step path through the points.
fn step_path(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(xs.len().saturating_mul(3));
    if xs.is_empty() {
        return points;
    }
    points.push((xs[0], ys[0]));
    for i in 1..xs.len() {
        let mid = (xs[i - 1] + xs[i]) / 2.0;
        points.push((mid, ys[i - 1]));
        points.push((mid, ys[i]));
        points.push((xs[i], ys[i]));
    }
    points
}

fn axis_or_index(axis: &Option<Vec<f64>>, n: usize) -> Vec<f64> {
    axis.clone()
        .unwrap_or_else(|| (0..n).map(|i| i as f64).collect())
}

/// Cell boundaries from cell centers: midpoints inside, extrapolated by
/// half a step at the ends.
fn edges_from_centers(centers: &[f64]) -> Vec<f64> {
    let n = centers.len();
    if n == 1 {
        return vec![centers[0] - 0.5, centers[0] + 0.5];
    }
    let mut edges = Vec::with_capacity(n + 1);
    edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
    for w in centers.windows(2) {
        edges.push((w[0] + w[1]) / 2.0);
    }
    edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
    edges
}

/// Interior contour levels, spaced along the norm's scale.
fn level_values(norm: &ResolvedNorm, levels: usize) -> Vec<f64> {
    (1..=levels)
        .map(|i| {
            let t = i as f64 / (levels + 1) as f64;
            value_at(norm, t)
        })
        .collect()
}

/// Invert the unit mapping: the value at position `t` in `[0, 1]`.
fn value_at(norm: &ResolvedNorm, t: f64) -> f64 {
    match norm.scale {
        NormScale::Linear => norm.vmin + t * (norm.vmax - norm.vmin),
        NormScale::Log => norm.vmin * (norm.vmax / norm.vmin).powf(t),
    }
}

/// Line segments of one iso-level, by marching squares with linear
/// interpolation along cell edges. Cells touching a masked (NaN) corner
/// are skipped.
fn marching_squares(
    grid: &GridTrace,
    xs: &[f64],
    ys: &[f64],
    level: f64,
) -> Vec<((f64, f64), (f64, f64))> {
    let z = &grid.z;
    let mut segments = Vec::new();
    for r in 0..z.rows().saturating_sub(1) {
        for c in 0..z.cols().saturating_sub(1) {
            // Corner ring: (r,c) -> (r,c+1) -> (r+1,c+1) -> (r+1,c).
            let values = [
                z.get(r, c),
                z.get(r, c + 1),
                z.get(r + 1, c + 1),
                z.get(r + 1, c),
            ];
            if values.iter().any(|v| !v.is_finite()) {
                continue;
            }
            let corners = [
                (xs[c], ys[r]),
                (xs[c + 1], ys[r]),
                (xs[c + 1], ys[r + 1]),
                (xs[c], ys[r + 1]),
            ];
            let mut crossings = Vec::new();
            for i in 0..4 {
                let j = (i + 1) % 4;
                let (a, b) = (values[i], values[j]);
                if (a >= level) != (b >= level) {
                    let t = (level - a) / (b - a);
                    crossings.push((
                        corners[i].0 + t * (corners[j].0 - corners[i].0),
                        corners[i].1 + t * (corners[j].1 - corners[i].1),
                    ));
                }
            }
            match crossings.len() {
                2 => segments.push((crossings[0], crossings[1])),
                4 => {
                    // Saddle cell: two independent segments.
                    segments.push((crossings[0], crossings[1]));
                    segments.push((crossings[2], crossings[3]));
                }
                _ => {}
            }
        }
    }
    segments
}

/// Running min/max over finite values.
struct Extent {
    lo: f64,
    hi: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Extent {
            lo: f64::INFINITY,
            hi: f64::NEG_INFINITY,
        }
    }
}

impl Extent {
    fn update_all(&mut self, values: &[f64]) {
        for &v in values {
            if v.is_finite() {
                self.lo = self.lo.min(v);
                self.hi = self.hi.max(v);
            }
        }
    }

    fn padded(&self) -> (f64, f64) {
        if self.lo > self.hi {
            return (0.0, 1.0);
        }
        if self.lo == self.hi {
            return (self.lo - 1.0, self.hi + 1.0);
        }
        let pad = (self.hi - self.lo) * 0.05;
        (self.lo - pad, self.hi + pad)
    }
}

/// Expand the narrower range so both axes get the same units-per-pixel.
/// Approximate: the label areas eat a slice of the pixel budget, but the
/// distortion is a few percent at canvas size.
fn equalize(
    ((xlo, xhi), (ylo, yhi)): ((f64, f64), (f64, f64)),
    width: f64,
    height: f64,
) -> ((f64, f64), (f64, f64)) {
    let per_pixel = ((xhi - xlo) / width).max((yhi - ylo) / height);
    let x_mid = (xlo + xhi) / 2.0;
    let y_mid = (ylo + yhi) / 2.0;
    let x_half = per_pixel * width / 2.0;
    let y_half = per_pixel * height / 2.0;
    ((x_mid - x_half, x_mid + x_half), (y_mid - y_half, y_mid + y_half))
}

/// Positive extent for a logarithmic axis.
fn log_extent(lo: f64, hi: f64) -> Result<(f64, f64)> {
    if hi <= 0.0 {
        return Err(AnyplotError::BackendError(
            "a logarithmic axis requires positive data".to_string(),
        ));
    }
    let lo = if lo > 0.0 { lo } else { hi / 1e3 };
    Ok((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::grid::{resolve_norm, Grid};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_step_path_is_hvh() {
        let points = step_path(&[0.0, 1.0, 2.0], &[1.0, 3.0, 2.0]);
        assert_eq!(
            points,
            vec![
                (0.0, 1.0),
                (0.5, 1.0),
                (0.5, 3.0),
                (1.0, 3.0),
                (1.5, 3.0),
                (1.5, 2.0),
                (2.0, 2.0),
            ]
        );
    }

    #[test]
    fn test_edges_from_centers() {
        assert_eq!(edges_from_centers(&[5.0]), vec![4.5, 5.5]);
        let edges = edges_from_centers(&[0.0, 1.0, 2.0]);
        assert_eq!(edges, vec![-0.5, 0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_resolve_output_path_normalizes_extensions() {
        let (p, f) = resolve_output_path(Path::new("fig"));
        assert_eq!(p, PathBuf::from("fig.png"));
        assert!(matches!(f, OutputFormat::Png));
        let (p, f) = resolve_output_path(Path::new("fig.svg"));
        assert_eq!(p, PathBuf::from("fig.svg"));
        assert!(matches!(f, OutputFormat::Svg));
        let (p, _) = resolve_output_path(Path::new("fig.jpeg"));
        assert_eq!(p, PathBuf::from("fig.png"));
    }

    #[test]
    fn test_level_values_follow_scale() {
        let lin = ResolvedNorm {
            scale: NormScale::Linear,
            vmin: 0.0,
            vmax: 10.0,
        };
        let values = level_values(&lin, 4);
        assert_eq!(values, vec![2.0, 4.0, 6.0, 8.0]);

        let log = ResolvedNorm {
            scale: NormScale::Log,
            vmin: 1.0,
            vmax: 100.0,
        };
        let values = level_values(&log, 1);
        assert_abs_diff_eq!(values[0], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_marching_squares_finds_a_crossing() {
        // A simple ramp: level 0.5 crosses between the two columns.
        let z = Grid::from_rows(vec![vec![0.0, 1.0], vec![0.0, 1.0]]).unwrap();
        let (masked, norm) = resolve_norm(&z, NormScale::Linear).unwrap();
        let trace = GridTrace {
            z: masked,
            x: None,
            y: None,
            norm,
            label: None,
        };
        let segments = marching_squares(&trace, &[0.0, 1.0], &[0.0, 1.0], 0.5);
        assert_eq!(segments.len(), 1);
        let ((x0, _), (x1, _)) = segments[0];
        assert_abs_diff_eq!(x0, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x1, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_marching_squares_skips_masked_cells() {
        let z = Grid::from_rows(vec![vec![f64::NAN, 1.0], vec![0.0, 1.0]]).unwrap();
        let (masked, norm) = resolve_norm(&z, NormScale::Linear).unwrap();
        let trace = GridTrace {
            z: masked,
            x: None,
            y: None,
            norm,
            label: None,
        };
        assert!(marching_squares(&trace, &[0.0, 1.0], &[0.0, 1.0], 0.5).is_empty());
    }

    #[test]
    fn test_extent_padding() {
        let mut e = Extent::default();
        assert_eq!(e.padded(), (0.0, 1.0));
        e.update_all(&[2.0, 2.0]);
        assert_eq!(e.padded(), (1.0, 3.0));
        e.update_all(&[0.0, 4.0, f64::NAN]);
        let (lo, hi) = e.padded();
        assert_abs_diff_eq!(lo, -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(hi, 4.2, epsilon = 1e-12);
    }

    #[test]
    fn test_equalize_matches_units_per_pixel() {
        let ((xlo, xhi), (ylo, yhi)) = equalize(((0.0, 10.0), (0.0, 1.0)), 100.0, 100.0);
        // x was the coarser axis; it is untouched and y grows to match.
        assert_eq!((xlo, xhi), (0.0, 10.0));
        assert_abs_diff_eq!(yhi - ylo, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!((ylo + yhi) / 2.0, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_log_extent_requires_positive_data() {
        assert!(log_extent(-1.0, -0.5).is_err());
        let (lo, hi) = log_extent(-1.0, 100.0).unwrap();
        assert!(lo > 0.0 && hi == 100.0);
        assert_eq!(log_extent(1.0, 10.0).unwrap(), (1.0, 10.0));
    }

    #[test]
    fn test_scene_buffers_traces_until_replay() {
        let mut backend = PlottersBackend::new();
        let z = Grid::from_fn(3, 3, |r, c| (r + c) as f64).unwrap();
        let (masked, norm) = resolve_norm(&z, NormScale::Linear).unwrap();
        backend
            .draw_colormap(&GridTrace {
                z: masked,
                x: None,
                y: None,
                norm,
                label: None,
            })
            .unwrap();
        assert_eq!(backend.traces.len(), 1);
        backend.close().unwrap();
        assert!(backend.traces.is_empty());
    }
}
