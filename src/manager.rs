//! Figure registry and bulk operations
//!
//! The manager owns every figure created through it, in insertion order
//! (the order drives the `figure N` fallback used by `save_all`), together
//! with the process default backend. Everything is single-threaded and
//! synchronous: operations run to completion or fail with an error the
//! caller sees immediately.

use std::fs;
use std::path::PathBuf;

use chrono::Local;

use crate::backend::BackendKind;
use crate::figure::layout::LayoutUpdate;
use crate::figure::{Figure, FigureId};
use crate::{AnyplotError, Result};

/// Options for creating one figure: an optional per-figure backend
/// override plus the initial display properties.
#[derive(Debug, Clone, Default)]
pub struct NewFigureOptions {
    pub backend: Option<BackendKind>,
    pub layout: LayoutUpdate,
}

impl NewFigureOptions {
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_layout(mut self, layout: LayoutUpdate) -> Self {
        self.layout = layout;
        self
    }
}

/// Where `save_all` puts its files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveDir {
    /// A directory named after the running program, suffixed
    /// `_saved_plots`; created if absent.
    #[default]
    FromProgramName,
    /// An explicitly named directory, created if absent.
    Named(PathBuf),
    /// No directory: files land in the working directory.
    CurrentDir,
}

/// Options for `save_all`.
#[derive(Debug, Clone, Default)]
pub struct SaveAllOptions {
    /// Prefix every file name with one shared timestamp token, computed
    /// once per call. Useful to keep the plots of separate runs apart.
    pub timestamp: bool,
    pub dir: SaveDir,
}

impl SaveAllOptions {
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_dir(mut self, dir: SaveDir) -> Self {
        self.dir = dir;
        self
    }
}

/// The ordered set of open figures plus the default backend.
pub struct FigureManager {
    figures: Vec<Figure>,
    default_backend: BackendKind,
}

impl FigureManager {
    pub fn new() -> Self {
        FigureManager {
            figures: Vec::new(),
            default_backend: BackendKind::Plotly,
        }
    }

    /// Change the default backend for figures created from now on.
    pub fn set_backend(&mut self, backend: BackendKind) {
        self.default_backend = backend;
    }

    pub fn default_backend(&self) -> BackendKind {
        self.default_backend
    }

    /// Create a figure, apply its initial properties, register it and hand
    /// it back for plotting.
    pub fn new_figure(&mut self, opts: NewFigureOptions) -> Result<&mut Figure> {
        let kind = opts.backend.unwrap_or(self.default_backend);
        let mut figure = Figure::new(kind)?;
        figure.set(opts.layout)?;
        let index = self.figures.len();
        self.figures.push(figure);
        Ok(&mut self.figures[index])
    }

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn get_mut(&mut self, id: FigureId) -> Option<&mut Figure> {
        self.figures.iter_mut().find(|f| f.id() == id)
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }

    /// Show every figure, in creation order.
    pub fn show_all(&mut self) -> Result<()> {
        for figure in &mut self.figures {
            figure.show()?;
        }
        Ok(())
    }

    /// Save every figure into the resolved directory, returning the paths
    /// actually written. The timestamp token, when requested, is computed
    /// once and shared by every file name; each figure contributes its
    /// title, or `figure N` when it has none.
    pub fn save_all(&mut self, opts: &SaveAllOptions) -> Result<Vec<PathBuf>> {
        let token = timestamp_token();
        let directory = resolve_directory(&opts.dir)?;
        fs::create_dir_all(&directory)?;

        let mut saved = Vec::with_capacity(self.figures.len());
        for (index, figure) in self.figures.iter_mut().enumerate() {
            let mut name = String::new();
            if opts.timestamp {
                name.push_str(&token);
                name.push(' ');
            }
            match figure.title() {
                Some(title) => name.push_str(title),
                None => name.push_str(&format!("figure {}", index + 1)),
            }
            let path = directory.join(name);
            saved.push(figure.save(Some(path.as_path()))?);
        }
        Ok(saved)
    }

    /// Close one figure and drop it from the registry.
    pub fn delete(&mut self, id: FigureId) -> Result<()> {
        let index = self
            .figures
            .iter()
            .position(|f| f.id() == id)
            .ok_or_else(|| AnyplotError::invalid(format!("no open figure with id {id}")))?;
        let mut figure = self.figures.remove(index);
        figure.close()
    }

    /// Close every figure and empty the registry.
    pub fn delete_all(&mut self) -> Result<()> {
        for figure in &mut self.figures {
            figure.close()?;
        }
        self.figures.clear();
        Ok(())
    }
}

impl Default for FigureManager {
    fn default() -> Self {
        Self::new()
    }
}

/// One timestamp token, `YYYYmmddHHMMSS` plus microseconds.
fn timestamp_token() -> String {
    Local::now().format("%Y%m%d%H%M%S%6f").to_string()
}

fn resolve_directory(dir: &SaveDir) -> Result<PathBuf> {
    match dir {
        SaveDir::Named(path) => Ok(path.clone()),
        SaveDir::CurrentDir => Ok(PathBuf::from(".")),
        SaveDir::FromProgramName => {
            let exe = std::env::current_exe()?;
            let stem = exe
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    AnyplotError::invalid("cannot derive a directory name from the program name")
                })?;
            Ok(PathBuf::from(format!("{stem}_saved_plots")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::trace::PlotOptions;
    use crate::LayoutUpdate;
    use tempfile::tempdir;

    #[test]
    fn test_default_backend_and_override() {
        let mut manager = FigureManager::new();
        assert_eq!(manager.default_backend(), BackendKind::Plotly);

        #[cfg(feature = "plotly")]
        {
            let fig = manager.new_figure(NewFigureOptions::default()).unwrap();
            assert_eq!(fig.backend_kind(), BackendKind::Plotly);
        }
        #[cfg(feature = "plotters")]
        {
            let fig = manager
                .new_figure(NewFigureOptions::default().with_backend(BackendKind::Plotters))
                .unwrap();
            assert_eq!(fig.backend_kind(), BackendKind::Plotters);
        }
        #[cfg(feature = "plotters")]
        {
            manager.set_backend(BackendKind::Plotters);
            let fig = manager.new_figure(NewFigureOptions::default()).unwrap();
            assert_eq!(fig.backend_kind(), BackendKind::Plotters);
        }
    }

    #[test]
    fn test_new_figure_applies_initial_layout() {
        let mut manager = FigureManager::new();
        let fig = manager
            .new_figure(
                NewFigureOptions::default()
                    .with_layout(LayoutUpdate::default().with_title("initial")),
            )
            .unwrap();
        assert_eq!(fig.title(), Some("initial"));
    }

    #[cfg(feature = "plotly")]
    #[test]
    fn test_save_all_shares_one_timestamp_token() {
        let dir = tempdir().unwrap();
        let mut manager = FigureManager::new();
        for title in ["alpha", "beta"] {
            let fig = manager
                .new_figure(
                    NewFigureOptions::default()
                        .with_layout(LayoutUpdate::default().with_title(title)),
                )
                .unwrap();
            fig.plot(&[0.0, 1.0], &[1.0, 0.0], PlotOptions::default())
                .unwrap();
        }
        let saved = manager
            .save_all(
                &SaveAllOptions::default()
                    .with_timestamp(true)
                    .with_dir(SaveDir::Named(dir.path().to_path_buf())),
            )
            .unwrap();
        assert_eq!(saved.len(), 2);
        let tokens: Vec<String> = saved
            .iter()
            .map(|p| {
                let stem = p.file_stem().unwrap().to_str().unwrap();
                stem.split(' ').next().unwrap().to_string()
            })
            .collect();
        assert_eq!(tokens[0], tokens[1]);
        assert!(tokens[0].chars().all(|c| c.is_ascii_digit()));
        for path in &saved {
            assert!(path.exists());
        }
    }

    #[cfg(feature = "plotly")]
    #[test]
    fn test_save_all_falls_back_to_positional_names() {
        let dir = tempdir().unwrap();
        let mut manager = FigureManager::new();
        let fig = manager.new_figure(NewFigureOptions::default()).unwrap();
        fig.plot(&[0.0, 1.0], &[0.0, 1.0], PlotOptions::default())
            .unwrap();
        let saved = manager
            .save_all(
                &SaveAllOptions::default()
                    .with_dir(SaveDir::Named(dir.path().to_path_buf())),
            )
            .unwrap();
        let stem = saved[0].file_stem().unwrap().to_str().unwrap();
        assert_eq!(stem, "figure 1");
    }

    #[cfg(feature = "plotly")]
    #[test]
    fn test_delete_removes_and_closes() {
        let mut manager = FigureManager::new();
        let first = manager
            .new_figure(NewFigureOptions::default())
            .unwrap()
            .id();
        manager.new_figure(NewFigureOptions::default()).unwrap();
        assert_eq!(manager.len(), 2);

        manager.delete(first).unwrap();
        assert_eq!(manager.len(), 1);
        assert!(manager.get_mut(first).is_none());
        assert!(manager.delete(first).is_err());

        manager.delete_all().unwrap();
        assert!(manager.is_empty());
    }
}
