/*!
anyplot command line interface

Renders a showcase set of figures on a chosen backend, either saving them
all at once or opening them in the backend's native viewer. Useful for
eyeballing how the same plotting calls come out of each engine.
*/

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

use anyplot::{
    AxisScale, BackendKind, Bins, ColormapOptions, ContourOptions, FigureManager, Grid,
    HistOptions, LayoutUpdate, LineStyle, Marker, NewFigureOptions, NormScale, PlotOptions,
    SaveAllOptions, SaveDir, VERSION,
};

#[derive(Parser)]
#[command(name = "anyplot")]
#[command(about = "One plotting vocabulary dispatched to plotters, plotly or SAOImage DS9")]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the showcase figures
    Demo {
        /// Backend to render with
        #[arg(long, default_value = "plotly")]
        backend: String,

        /// Directory for the saved figures (default: derived from the
        /// program name)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Prefix every file with one shared timestamp token
        #[arg(long)]
        timestamp: bool,

        /// Open the figures in the backend's viewer instead of saving
        #[arg(long)]
        show: bool,

        /// Extra figure properties, as key=value pairs
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// List the backends this build knows about
    Backends,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo {
            backend,
            out_dir,
            timestamp,
            show,
            set,
        } => {
            let backend: BackendKind = backend.parse()?;
            let mut extra = LayoutUpdate::default();
            for pair in &set {
                extra.assign_pair(pair)?;
            }
            run_demo(backend, out_dir, timestamp, show, extra)
        }
        Commands::Backends => {
            for name in anyplot::backend::BACKEND_NAMES {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn run_demo(
    backend: BackendKind,
    out_dir: Option<PathBuf>,
    timestamp: bool,
    show: bool,
    extra: LayoutUpdate,
) -> anyhow::Result<()> {
    let mut manager = FigureManager::new();
    manager.set_backend(backend);
    let mut rng = StdRng::seed_from_u64(42);

    // The image viewer only does colormaps; everything else is for the
    // chart engines.
    if backend != BackendKind::Ds9 {
        series_demo(&mut manager, &extra, &mut rng)?;
        hist_demo(&mut manager, &extra, &mut rng)?;
        fill_demo(&mut manager, &extra)?;
        band_demo(&mut manager, &extra)?;
        contour_demo(&mut manager, backend, &extra, &mut rng)?;
    }
    colormap_demo(&mut manager, &extra, &mut rng)?;

    if show {
        manager.show_all()?;
    } else {
        let dir = match out_dir {
            Some(path) => SaveDir::Named(path),
            None => SaveDir::FromProgramName,
        };
        let saved = manager.save_all(
            &SaveAllOptions::default()
                .with_timestamp(timestamp)
                .with_dir(dir),
        )?;
        for path in saved {
            println!("saved {}", path.display());
        }
    }
    manager.delete_all()?;
    Ok(())
}

fn series_demo(
    manager: &mut FigureManager,
    extra: &LayoutUpdate,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    let x = linspace(0.0, 1.0, 50);
    let fig = manager.new_figure(demo_layout("markers test", extra))?;
    let cubed: Vec<f64> = x.iter().map(|v| v.powi(3)).collect();
    fig.plot(&x, &cubed, PlotOptions::default().with_label("no markers"))?;
    for marker in [Marker::Point, Marker::Cross, Marker::Plus, Marker::Circle] {
        let exponent = rng.gen::<f64>();
        let y: Vec<f64> = x.iter().map(|v| v.powf(exponent)).collect();
        fig.plot(
            &x,
            &y,
            PlotOptions::default()
                .with_marker(marker)
                .with_linestyle(LineStyle::None)
                .with_label(format!("marker = {marker}")),
        )?;
    }
    Ok(())
}

fn hist_demo(
    manager: &mut FigureManager,
    extra: &LayoutUpdate,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    let fig = manager.new_figure(demo_layout("histograms", extra))?;
    for (index, linestyle) in [LineStyle::Solid, LineStyle::Dashed, LineStyle::Dotted]
        .into_iter()
        .enumerate()
    {
        let spread = 2.0 * (index as f64 + 1.0);
        let samples: Vec<f64> = (0..999).map(|_| normal_ish(rng) * spread).collect();
        fig.hist(
            &samples,
            HistOptions::default()
                .with_bins(Bins::Count(40))
                .with_style(
                    PlotOptions::default()
                        .with_linestyle(linestyle)
                        .with_label(format!("histogram {index}")),
                ),
        )?;
    }
    Ok(())
}

fn fill_demo(manager: &mut FigureManager, extra: &LayoutUpdate) -> anyhow::Result<()> {
    let x = linspace(-1.0, 1.0, 50);
    let y: Vec<f64> = x.iter().map(|v| v.powi(3)).collect();
    let fig = manager.new_figure(demo_layout("fill between", extra))?;
    fig.fill_between(&x, &y, None, PlotOptions::default().with_label("down to zero"))?;
    let upper: Vec<f64> = y.iter().map(|v| v * 1.1).collect();
    let lower: Vec<f64> = y.iter().map(|v| v * 0.9).collect();
    fig.fill_between(
        &x,
        &upper,
        Some(&lower),
        PlotOptions::default().with_label("between two curves"),
    )?;
    Ok(())
}

fn band_demo(manager: &mut FigureManager, extra: &LayoutUpdate) -> anyhow::Result<()> {
    let x = linspace(-1.0, 1.0, 50);
    let fig = manager.new_figure(demo_layout("error bands", extra))?;
    let functions: [(&str, fn(f64) -> f64); 3] =
        [("cos", f64::cos), ("cubic", |v| v.powi(3)), ("exp", f64::exp)];
    for (name, f) in functions {
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let error: Vec<f64> = y.iter().map(|v| v.abs() * 0.1 + 0.05).collect();
        let ytop: Vec<f64> = y.iter().zip(&error).map(|(v, e)| v + e).collect();
        let ylow: Vec<f64> = y.iter().zip(&error).map(|(v, e)| v - e).collect();
        fig.error_band(&x, &y, &ytop, &ylow, PlotOptions::default().with_label(name))?;
    }
    Ok(())
}

fn demo_grid(rng: &mut StdRng) -> anyhow::Result<(Grid, Grid, Grid)> {
    let axis = linspace(-1.0, 1.0, 50);
    let (xx, yy) = Grid::meshgrid(&axis, &axis)?;
    let z = Grid::from_fn(axis.len(), axis.len(), |r, c| {
        axis[c].powi(4) + axis[r].powi(2) + rng.gen::<f64>() * 0.1
    })?;
    Ok((z, xx, yy))
}

fn colormap_demo(
    manager: &mut FigureManager,
    extra: &LayoutUpdate,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    let (z, xx, yy) = demo_grid(rng)?;
    let fig = manager.new_figure(demo_layout("colormap", extra))?;
    fig.colormap(
        &z,
        Some((&xx, &yy)),
        ColormapOptions::default()
            .with_norm(NormScale::Log)
            .with_colorscale_label("colormap value"),
    )?;
    Ok(())
}

fn contour_demo(
    manager: &mut FigureManager,
    backend: BackendKind,
    extra: &LayoutUpdate,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    let (z, xx, yy) = demo_grid(rng)?;
    let fig = manager.new_figure(demo_layout("contour", extra))?;
    let mut opts = ContourOptions::default().with_colorscale_label("colormap value");
    // An explicit level count is a desktop-only keyword.
    if backend == BackendKind::Plotters {
        opts = opts.with_levels(8);
    }
    fig.contour(&z, Some((&xx, &yy)), opts)?;
    Ok(())
}

fn demo_layout(title: &str, extra: &LayoutUpdate) -> NewFigureOptions {
    let mut layout = LayoutUpdate::default()
        .with_title(title)
        .with_xlabel("x axis")
        .with_ylabel("y axis")
        .with_xscale(AxisScale::Linear)
        .with_yscale(AxisScale::Linear);
    merge(&mut layout, extra);
    NewFigureOptions::default().with_layout(layout)
}

fn merge(layout: &mut LayoutUpdate, extra: &LayoutUpdate) {
    if extra.title.is_some() {
        layout.title = extra.title.clone();
    }
    if extra.subtitle.is_some() {
        layout.subtitle = extra.subtitle.clone();
    }
    if extra.xlabel.is_some() {
        layout.xlabel = extra.xlabel.clone();
    }
    if extra.ylabel.is_some() {
        layout.ylabel = extra.ylabel.clone();
    }
    if extra.xscale.is_some() {
        layout.xscale = extra.xscale;
    }
    if extra.yscale.is_some() {
        layout.yscale = extra.yscale;
    }
    if extra.aspect.is_some() {
        layout.aspect = extra.aspect;
    }
    if extra.show_title.is_some() {
        layout.show_title = extra.show_title;
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| start + (stop - start) * i as f64 / (n - 1) as f64)
        .collect()
}

/// Approximately standard-normal samples from summed uniforms.
fn normal_ish(rng: &mut StdRng) -> f64 {
    (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0
}
