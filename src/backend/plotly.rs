//! Plotly adapter
//!
//! Translates validated trace records into interactive HTML charts.
//!
//! # Mapping strategy
//!
//! - draw mode from the presence of marker and line style (lines, markers
//!   or both)
//! - the fixed marker vocabulary maps onto plotly symbol names
//! - RGB triples are encoded as two-hex-digit-per-channel color strings
//! - histograms reuse the padded step outline with horizontal-then-vertical
//!   step interpolation, so they line up with the desktop rendering
//! - error bands are compositional: a center line plus a self-filled
//!   polygon, tied together by a legend group so only the center line gets
//!   a legend entry

use std::path::{Path, PathBuf};

use plotly::common::{
    ColorBar, DashType, Fill, Line, LineShape, Marker as SymbolMarker, MarkerSymbol, Mode, Title,
};
use plotly::layout::{Annotation, Axis, AxisType, Layout as NativeLayout};
use plotly::{Contour, HeatMap, Plot, Scatter};

use crate::backend::{Backend, BackendKind};
use crate::figure::grid::NormScale;
use crate::figure::layout::{Aspect, AxisScale, Layout};
use crate::figure::trace::{
    BandTrace, FillTrace, GridTrace, HistTrace, LineStyle, Marker, SeriesTrace, Style,
};
use crate::{AnyplotError, Result};

pub struct PlotlyBackend {
    plot: Plot,
    layout: Layout,
    next_group: u32,
}

impl PlotlyBackend {
    pub fn new() -> Self {
        PlotlyBackend {
            plot: Plot::new(),
            layout: Layout::default(),
            next_group: 0,
        }
    }

    /// Line/marker series with the shared style translation applied.
    fn styled_scatter(
        &self,
        x: &[f64],
        y: &[f64],
        style: &Style,
        step: bool,
    ) -> Box<Scatter<f64, f64>> {
        let mut line = Line::new().color(style.color.to_hex());
        if let Some(width) = style.linewidth {
            line = line.width(width);
        }
        if let Some(dash) = dash_for(style.linestyle) {
            line = line.dash(dash);
        }
        if step {
            line = line.shape(LineShape::Hvh);
        }
        let mut marker = SymbolMarker::new().color(style.color.to_hex());
        if let Some(m) = style.marker {
            marker = marker.symbol(symbol_for(m));
        }
        let mut scatter = Scatter::new(x.to_vec(), y.to_vec())
            .mode(mode_for(style.marker, style.linestyle))
            .line(line)
            .marker(marker)
            .show_legend(style.label.is_some());
        if let Some(label) = &style.label {
            scatter = scatter.name(label.as_str());
        }
        if let Some(alpha) = style.alpha {
            scatter = scatter.opacity(alpha);
        }
        scatter
    }

    /// Closed polygon tracing forward along `upper` and backward along
    /// `lower`, stroke suppressed, interior filled.
    fn band_polygon(
        &self,
        x: &[f64],
        upper: &[f64],
        lower: &[f64],
        style: &Style,
        show_legend: bool,
    ) -> Box<Scatter<f64, f64>> {
        let mut xs: Vec<f64> = x.to_vec();
        xs.extend(x.iter().rev());
        let mut ys: Vec<f64> = upper.to_vec();
        ys.extend(lower.iter().rev());

        let mut scatter = Scatter::new(xs, ys)
            .mode(Mode::Lines)
            .line(Line::new().color(style.color.to_hex()).width(0.0))
            .fill(Fill::ToSelf)
            .show_legend(show_legend);
        if let Some(label) = &style.label {
            scatter = scatter.name(label.as_str());
        }
        if let Some(alpha) = style.alpha {
            scatter = scatter.opacity(alpha);
        }
        scatter
    }

    /// Hover line naming the axes and the color scale, with fallbacks.
    fn grid_hover_template(&self, label: Option<&str>) -> String {
        format!(
            "{}: %{{x}}<br>{}: %{{y}}<br>{}: %{{z}}<extra></extra>",
            self.layout.xlabel.as_deref().unwrap_or("x"),
            self.layout.ylabel.as_deref().unwrap_or("y"),
            label.unwrap_or("color scale"),
        )
    }

    /// Color-legend title, prefixed `log ` under a logarithmic norm.
    fn colorbar_for(&self, trace: &GridTrace) -> Option<ColorBar> {
        trace.label.as_deref().map(|label| {
            let text = match trace.norm.scale {
                NormScale::Log => format!("log {label}"),
                NormScale::Linear => label.to_string(),
            };
            ColorBar::new().title(Title::from(text.as_str()))
        })
    }

    /// Grid cell values, log-transformed when the norm is logarithmic so
    /// the linear color axis spaces them correctly. Masked cells stay NaN
    /// and serialize as missing.
    fn grid_rows(trace: &GridTrace) -> Vec<Vec<f64>> {
        let mut rows = trace.z.to_nested();
        if trace.norm.scale == NormScale::Log {
            for row in &mut rows {
                for v in row.iter_mut() {
                    *v = v.ln();
                }
            }
        }
        rows
    }
}

impl Default for PlotlyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for PlotlyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Plotly
    }

    fn apply_layout(&mut self, layout: &Layout) -> Result<()> {
        self.layout = layout.clone();

        let mut native = NativeLayout::new();
        if layout.show_title {
            if let Some(title) = &layout.title {
                native = native.title(Title::from(title.as_str()));
            }
        }

        let mut x_axis = Axis::new();
        if let Some(label) = &layout.xlabel {
            x_axis = x_axis.title(Title::from(label.as_str()));
        }
        if layout.xscale == AxisScale::Log {
            x_axis = x_axis.type_(AxisType::Log);
        }

        let mut y_axis = Axis::new();
        if let Some(label) = &layout.ylabel {
            y_axis = y_axis.title(Title::from(label.as_str()));
        }
        if layout.yscale == AxisScale::Log {
            y_axis = y_axis.type_(AxisType::Log);
        }
        if layout.aspect == Some(Aspect::Equal) {
            y_axis = y_axis.scale_anchor("x");
        }

        native = native.x_axis(x_axis).y_axis(y_axis);

        if let Some(subtitle) = &layout.subtitle {
            native = native.annotations(vec![Annotation::new()
                .text(subtitle.replace('\n', "<br>").as_str())
                .x_ref("paper")
                .y_ref("paper")
                .x(0.5)
                .y(1.0)
                .show_arrow(false)]);
        }

        self.plot.set_layout(native);
        Ok(())
    }

    fn draw_series(&mut self, trace: &SeriesTrace) -> Result<()> {
        let scatter = self.styled_scatter(&trace.x, &trace.y, &trace.style, false);
        self.plot.add_trace(scatter);
        Ok(())
    }

    fn draw_hist(&mut self, trace: &HistTrace) -> Result<()> {
        let scatter = self.styled_scatter(&trace.centers, &trace.counts, &trace.style, true);
        self.plot.add_trace(scatter);
        Ok(())
    }

    fn draw_fill(&mut self, trace: &FillTrace) -> Result<()> {
        let polygon = self.band_polygon(
            &trace.x,
            &trace.y1,
            &trace.y2,
            &trace.style,
            trace.style.label.is_some(),
        );
        self.plot.add_trace(polygon);
        Ok(())
    }

    fn draw_error_band(&mut self, trace: &BandTrace) -> Result<()> {
        self.next_group += 1;
        let group = format!("band-{}", self.next_group);

        let center = self
            .styled_scatter(&trace.x, &trace.y, &trace.style, false)
            .legend_group(group.as_str());
        self.plot.add_trace(center);

        let band = self
            .band_polygon(&trace.x, &trace.ytop, &trace.ylow, &trace.style, false)
            .legend_group(group.as_str());
        self.plot.add_trace(band);
        Ok(())
    }

    fn draw_colormap(&mut self, trace: &GridTrace) -> Result<()> {
        let rows = Self::grid_rows(trace);
        let mut heatmap = match (&trace.x, &trace.y) {
            (Some(x), Some(y)) => HeatMap::new(x.clone(), y.clone(), rows),
            _ => HeatMap::new_z(rows),
        };
        let template = self.grid_hover_template(trace.label.as_deref());
        heatmap = heatmap.hover_template(template.as_str());
        if let Some(bar) = self.colorbar_for(trace) {
            heatmap = heatmap.color_bar(bar);
        }
        self.plot.add_trace(heatmap);
        Ok(())
    }

    fn draw_contour(&mut self, trace: &GridTrace, levels: Option<usize>) -> Result<()> {
        if levels.is_some() {
            return Err(AnyplotError::UnsupportedError(format!(
                "<levels> is not implemented for <contour> on the {} backend",
                self.kind()
            )));
        }
        let rows = Self::grid_rows(trace);
        let mut contour = match (&trace.x, &trace.y) {
            (Some(x), Some(y)) => Contour::new(x.clone(), y.clone(), rows),
            _ => Contour::new_z(rows),
        };
        let template = self.grid_hover_template(trace.label.as_deref());
        contour = contour.hover_template(template.as_str());
        if let Some(bar) = self.colorbar_for(trace) {
            contour = contour.color_bar(bar);
        }
        self.plot.add_trace(contour);
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        // Non-blocking: hands the document to the default browser.
        self.plot.show();
        Ok(())
    }

    fn save(&mut self, name: &Path) -> Result<PathBuf> {
        // Interactive figures are HTML documents; any other extension is
        // normalized.
        let target = name.with_extension("html");
        self.plot.write_html(&target);
        if !target.exists() {
            return Err(AnyplotError::BackendError(format!(
                "failed to write {}",
                target.display()
            )));
        }
        Ok(target)
    }

    fn close(&mut self) -> Result<()> {
        self.plot = Plot::new();
        self.next_group = 0;
        Ok(())
    }
}

/// Draw mode from the presence of marker and line style.
fn mode_for(marker: Option<Marker>, linestyle: LineStyle) -> Mode {
    match (marker, linestyle) {
        (Some(_), LineStyle::None) => Mode::Markers,
        (Some(_), _) => Mode::LinesMarkers,
        (None, _) => Mode::Lines,
    }
}

/// The fixed marker vocabulary, in plotly symbol names.
fn symbol_for(marker: Marker) -> MarkerSymbol {
    match marker {
        Marker::Point => MarkerSymbol::Circle,
        Marker::Plus => MarkerSymbol::Cross,
        Marker::Cross => MarkerSymbol::X,
        Marker::Circle => MarkerSymbol::CircleOpen,
    }
}

/// Line styles that translate to a dash pattern; solid and none need no
/// dash entry.
fn dash_for(linestyle: LineStyle) -> Option<DashType> {
    match linestyle {
        LineStyle::Solid | LineStyle::None => None,
        LineStyle::Dashed => Some(DashType::Dash),
        LineStyle::Dotted => Some(DashType::Dot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::grid::{resolve_norm, Grid};
    use crate::figure::palette::DEFAULT_PALETTE;
    use tempfile::tempdir;

    fn style() -> Style {
        Style {
            label: Some("series".to_string()),
            color: DEFAULT_PALETTE[0],
            alpha: None,
            linewidth: None,
            marker: None,
            linestyle: LineStyle::Solid,
        }
    }

    #[test]
    fn test_mode_table() {
        assert!(matches!(mode_for(None, LineStyle::Solid), Mode::Lines));
        assert!(matches!(mode_for(None, LineStyle::None), Mode::Lines));
        assert!(matches!(
            mode_for(Some(Marker::Cross), LineStyle::None),
            Mode::Markers
        ));
        assert!(matches!(
            mode_for(Some(Marker::Point), LineStyle::Dashed),
            Mode::LinesMarkers
        ));
    }

    #[test]
    fn test_symbol_map_covers_vocabulary() {
        assert!(matches!(symbol_for(Marker::Point), MarkerSymbol::Circle));
        assert!(matches!(symbol_for(Marker::Plus), MarkerSymbol::Cross));
        assert!(matches!(symbol_for(Marker::Cross), MarkerSymbol::X));
        assert!(matches!(
            symbol_for(Marker::Circle),
            MarkerSymbol::CircleOpen
        ));
    }

    #[test]
    fn test_dash_map() {
        assert!(dash_for(LineStyle::Solid).is_none());
        assert!(dash_for(LineStyle::None).is_none());
        assert!(matches!(dash_for(LineStyle::Dashed), Some(DashType::Dash)));
        assert!(matches!(dash_for(LineStyle::Dotted), Some(DashType::Dot)));
    }

    #[test]
    fn test_contour_levels_is_unsupported() {
        let z = Grid::from_fn(3, 3, |r, c| (r + c) as f64 + 1.0).unwrap();
        let (masked, norm) = resolve_norm(&z, NormScale::Linear).unwrap();
        let trace = GridTrace {
            z: masked,
            x: None,
            y: None,
            norm,
            label: None,
        };
        let mut backend = PlotlyBackend::new();
        let err = backend.draw_contour(&trace, Some(5)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("levels"));
        assert!(message.contains("plotly"));
        // Without levels the same trace draws fine.
        backend.draw_contour(&trace, None).unwrap();
    }

    #[test]
    fn test_save_normalizes_extension_to_html() {
        let dir = tempdir().unwrap();
        let mut backend = PlotlyBackend::new();
        backend.apply_layout(&Layout::default()).unwrap();
        let trace = SeriesTrace {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.0, 1.0, 4.0],
            style: style(),
        };
        backend.draw_series(&trace).unwrap();
        let saved = backend.save(&dir.path().join("figure.png")).unwrap();
        assert_eq!(saved.extension().and_then(|e| e.to_str()), Some("html"));
        assert!(saved.exists());
    }

    #[test]
    fn test_log_grid_rows_are_log_transformed() {
        let z = Grid::from_rows(vec![vec![1.0, std::f64::consts::E]]).unwrap();
        let (masked, norm) = resolve_norm(&z, NormScale::Log).unwrap();
        let trace = GridTrace {
            z: masked,
            x: None,
            y: None,
            norm,
            label: None,
        };
        let rows = PlotlyBackend::grid_rows(&trace);
        assert!(rows[0][0].abs() < 1e-12);
        assert!((rows[0][1] - 1.0).abs() < 1e-12);
    }
}
