//! SAOImage DS9 adapter
//!
//! A degenerate, image-only backend: `colormap` writes the grid to a FITS
//! file under a temporary directory and `show` points an external `ds9`
//! process at it, passing `-log` when a logarithmic norm was requested.
//! Series verbs are not overridden, so they fall through to the trait's
//! not-implemented defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use fitrs::{Fits, Hdu};

use crate::backend::{Backend, BackendKind};
use crate::figure::grid::NormScale;
use crate::figure::layout::Layout;
use crate::figure::trace::GridTrace;
use crate::{AnyplotError, Result};

/// Directory holding the image-data files of open ds9 figures.
const TEMP_DIR: &str = ".anyplot_ds9";

pub struct Ds9Backend {
    root: PathBuf,
    title: Option<String>,
    log_scale: bool,
    data_file: Option<PathBuf>,
}

impl Ds9Backend {
    pub fn new() -> Self {
        Self::with_root(TEMP_DIR)
    }

    /// Use a different temp-file directory (tests point this at a tempdir).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Ds9Backend {
            root: root.into(),
            title: None,
            log_scale: false,
            data_file: None,
        }
    }

    /// File-system-safe form of the title, spaces replaced by underscores.
    fn file_stem(&self) -> Result<String> {
        let title = self.title.as_deref().ok_or_else(|| {
            AnyplotError::invalid(
                "the ds9 backend derives its image file name from the figure title; \
                 set a title before calling <colormap>",
            )
        })?;
        Ok(title.replace(' ', "_"))
    }

    fn remove_data_file(&mut self) -> Result<()> {
        if let Some(path) = self.data_file.take() {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        // Drop the directory once the last figure's file is gone.
        if let Ok(mut entries) = fs::read_dir(&self.root) {
            if entries.next().is_none() {
                fs::remove_dir(&self.root)?;
            }
        }
        Ok(())
    }
}

impl Default for Ds9Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for Ds9Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ds9
    }

    fn apply_layout(&mut self, layout: &Layout) -> Result<()> {
        // The viewer draws no titles or axes; only the title matters, as
        // the source of the image file name.
        self.title = layout.title.clone();
        Ok(())
    }

    fn draw_colormap(&mut self, trace: &GridTrace) -> Result<()> {
        let stem = self.file_stem()?;
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(format!("{stem}.fits"));
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let hdu = Hdu::new(
            &[trace.z.cols(), trace.z.rows()],
            trace.z.values().to_vec(),
        );
        Fits::create(&path, hdu).map_err(|e| {
            AnyplotError::BackendError(format!(
                "failed to write FITS file {}: {e:?}",
                path.display()
            ))
        })?;
        self.log_scale = trace.norm.scale == NormScale::Log;
        self.data_file = Some(path);
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let path = self.data_file.as_deref().ok_or_else(|| {
            AnyplotError::invalid("nothing to show; call <colormap> first")
        })?;
        let mut command = Command::new("ds9");
        command.arg(path);
        if self.log_scale {
            command.arg("-log");
        }
        let status = command.status().map_err(|e| {
            AnyplotError::BackendError(format!("failed to launch ds9: {e}"))
        })?;
        if !status.success() {
            return Err(AnyplotError::BackendError(format!(
                "ds9 exited with {status}"
            )));
        }
        Ok(())
    }

    fn save(&mut self, name: &Path) -> Result<PathBuf> {
        let source = self.data_file.as_deref().ok_or_else(|| {
            AnyplotError::invalid("nothing to save; call <colormap> first")
        })?;
        let target = name.with_extension("fits");
        fs::copy(source, &target)?;
        Ok(target)
    }

    fn close(&mut self) -> Result<()> {
        self.remove_data_file()
    }
}

impl Drop for Ds9Backend {
    fn drop(&mut self) {
        // Close may already have run; cleanup is best-effort here.
        let _ = self.remove_data_file();
    }
}
