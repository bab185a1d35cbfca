//! Display properties of a figure
//!
//! The layout holds everything `set` can touch: titles, axis labels, axis
//! scales, aspect. Updates are partial records merged into the stored
//! layout; each successful `set` re-applies the whole layout to the active
//! backend, so adapters never track deltas.

use std::fmt;
use std::str::FromStr;

use crate::{AnyplotError, Result};

/// Axis scale, `"lin"` or `"log"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

impl FromStr for AxisScale {
    type Err = AnyplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lin" => Ok(AxisScale::Linear),
            "log" => Ok(AxisScale::Log),
            other => Err(AnyplotError::invalid(format!(
                "axis scale must be one of [\"lin\", \"log\"], got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for AxisScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisScale::Linear => write!(f, "lin"),
            AxisScale::Log => write!(f, "log"),
        }
    }
}

/// Aspect-ratio constraint. `"equal"` is the only accepted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aspect {
    Equal,
}

impl FromStr for Aspect {
    type Err = AnyplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "equal" => Ok(Aspect::Equal),
            other => Err(AnyplotError::invalid(format!(
                "<aspect> must be \"equal\" if present, got {other:?}"
            ))),
        }
    }
}

/// The full set of display properties a figure carries.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub xscale: AxisScale,
    pub yscale: AxisScale,
    pub aspect: Option<Aspect>,
    pub show_title: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            title: None,
            subtitle: None,
            xlabel: None,
            ylabel: None,
            xscale: AxisScale::Linear,
            yscale: AxisScale::Linear,
            aspect: None,
            show_title: true,
        }
    }
}

impl Layout {
    /// Merge a partial update into this layout.
    pub fn apply(&mut self, update: &LayoutUpdate) {
        if let Some(title) = &update.title {
            self.title = Some(title.clone());
        }
        if let Some(subtitle) = &update.subtitle {
            self.subtitle = Some(subtitle.clone());
        }
        if let Some(xlabel) = &update.xlabel {
            self.xlabel = Some(xlabel.clone());
        }
        if let Some(ylabel) = &update.ylabel {
            self.ylabel = Some(ylabel.clone());
        }
        if let Some(xscale) = update.xscale {
            self.xscale = xscale;
        }
        if let Some(yscale) = update.yscale {
            self.yscale = yscale;
        }
        if let Some(aspect) = update.aspect {
            self.aspect = Some(aspect);
        }
        if let Some(show_title) = update.show_title {
            self.show_title = show_title;
        }
    }
}

/// Property names accepted by [`LayoutUpdate::assign`].
pub const PROPERTY_NAMES: [&str; 8] = [
    "title",
    "subtitle",
    "xlabel",
    "ylabel",
    "xscale",
    "yscale",
    "aspect",
    "show_title",
];

/// A partial layout update, as produced by the builder methods or by
/// parsing `key=value` pairs from the CLI surface.
#[derive(Debug, Clone, Default)]
pub struct LayoutUpdate {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub xscale: Option<AxisScale>,
    pub yscale: Option<AxisScale>,
    pub aspect: Option<Aspect>,
    pub show_title: Option<bool>,
}

impl LayoutUpdate {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_xlabel(mut self, xlabel: impl Into<String>) -> Self {
        self.xlabel = Some(xlabel.into());
        self
    }

    pub fn with_ylabel(mut self, ylabel: impl Into<String>) -> Self {
        self.ylabel = Some(ylabel.into());
        self
    }

    pub fn with_xscale(mut self, scale: AxisScale) -> Self {
        self.xscale = Some(scale);
        self
    }

    pub fn with_yscale(mut self, scale: AxisScale) -> Self {
        self.yscale = Some(scale);
        self
    }

    pub fn with_aspect(mut self, aspect: Aspect) -> Self {
        self.aspect = Some(aspect);
        self
    }

    pub fn with_show_title(mut self, show: bool) -> Self {
        self.show_title = Some(show);
        self
    }

    /// Assign a property by name, validating both the name and the value.
    ///
    /// This is the string-keyed surface used by the CLI; unknown names fail
    /// with the accepted list, the way the original keyword check did.
    pub fn assign(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "title" => self.title = Some(value.to_string()),
            "subtitle" => self.subtitle = Some(value.to_string()),
            "xlabel" => self.xlabel = Some(value.to_string()),
            "ylabel" => self.ylabel = Some(value.to_string()),
            "xscale" => self.xscale = Some(value.parse()?),
            "yscale" => self.yscale = Some(value.parse()?),
            "aspect" => self.aspect = Some(value.parse()?),
            "show_title" => {
                self.show_title = Some(match value {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(AnyplotError::invalid(format!(
                            "<show_title> must be \"true\" or \"false\", got {other:?}"
                        )))
                    }
                })
            }
            other => {
                return Err(AnyplotError::invalid(format!(
                    "{other:?} is not a figure property; available options: {PROPERTY_NAMES:?}"
                )))
            }
        }
        Ok(())
    }

    /// Parse a `key=value` pair, the CLI's `--set` format.
    pub fn assign_pair(&mut self, pair: &str) -> Result<()> {
        match pair.split_once('=') {
            Some((key, value)) => self.assign(key.trim(), value.trim()),
            None => Err(AnyplotError::invalid(format!(
                "expected key=value, got {pair:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let layout = Layout::default();
        assert_eq!(layout.xscale, AxisScale::Linear);
        assert!(layout.show_title);
        assert!(layout.title.is_none());
        assert!(layout.aspect.is_none());
    }

    #[test]
    fn test_apply_merges_only_given_fields() {
        let mut layout = Layout::default();
        layout.apply(&LayoutUpdate::default().with_title("a").with_xscale(AxisScale::Log));
        layout.apply(&LayoutUpdate::default().with_ylabel("counts"));
        assert_eq!(layout.title.as_deref(), Some("a"));
        assert_eq!(layout.xscale, AxisScale::Log);
        assert_eq!(layout.ylabel.as_deref(), Some("counts"));
    }

    #[test]
    fn test_assign_rejects_unknown_property() {
        let mut update = LayoutUpdate::default();
        let err = update.assign("zlabel", "z").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("zlabel"));
        assert!(message.contains("available options"));
        assert!(message.contains("xscale"));
    }

    #[test]
    fn test_assign_validates_values() {
        let mut update = LayoutUpdate::default();
        assert!(update.assign("xscale", "linear").is_err());
        assert!(update.assign("xscale", "log").is_ok());
        assert!(update.assign("aspect", "square").is_err());
        assert!(update.assign("aspect", "equal").is_ok());
        assert!(update.assign("show_title", "yes").is_err());
        assert!(update.assign("show_title", "false").is_ok());
        assert_eq!(update.show_title, Some(false));
    }

    #[test]
    fn test_assign_pair() {
        let mut update = LayoutUpdate::default();
        update.assign_pair("title = My plot").unwrap();
        assert_eq!(update.title.as_deref(), Some("My plot"));
        assert!(update.assign_pair("no-equals-sign").is_err());
    }
}
