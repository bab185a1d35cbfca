//! Histogram binning and the step-outline representation
//!
//! Histograms are rendered as a stepped line that touches zero on both
//! sides, not as filled bars. The pipeline is: bin the samples, pad one
//! zero-count bin on each side, shift edges to bin centers. The padded
//! arrays are what every backend receives, so the desktop and interactive
//! renderings line up bin for bin.

use std::str::FromStr;

use crate::figure::trace::PlotOptions;
use crate::{AnyplotError, Result};

/// Automatic bin-count rules, matching the accepted keyword strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinRule {
    /// The larger of Sturges and Freedman-Diaconis.
    #[default]
    Auto,
    /// Freedman-Diaconis: width from the interquartile range.
    FreedmanDiaconis,
    /// Sturges: `ceil(log2 n) + 1` bins.
    Sturges,
}

impl FromStr for BinRule {
    type Err = AnyplotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(BinRule::Auto),
            "fd" => Ok(BinRule::FreedmanDiaconis),
            "sturges" => Ok(BinRule::Sturges),
            other => Err(AnyplotError::invalid(format!(
                "<bins> keyword must be one of [\"auto\", \"fd\", \"sturges\"], got {other:?}"
            ))),
        }
    }
}

/// Binning criteria: a bin count, explicit edges, or an automatic rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Bins {
    Count(usize),
    Edges(Vec<f64>),
    Auto(BinRule),
}

impl Default for Bins {
    fn default() -> Self {
        Bins::Count(10)
    }
}

/// Options accepted by `hist`.
#[derive(Debug, Clone, Default)]
pub struct HistOptions {
    pub bins: Bins,
    pub density: bool,
    pub style: PlotOptions,
}

impl HistOptions {
    pub fn with_bins(mut self, bins: Bins) -> Self {
        self.bins = bins;
        self
    }

    pub fn with_density(mut self, density: bool) -> Self {
        self.density = density;
        self
    }

    pub fn with_style(mut self, style: PlotOptions) -> Self {
        self.style = style;
        self
    }
}

/// Bin the samples, returning `(edges, counts)` with `counts.len() + 1 == edges.len()`.
pub(crate) fn histogram(samples: &[f64], bins: &Bins, density: bool) -> Result<(Vec<f64>, Vec<f64>)> {
    if samples.is_empty() {
        return Err(AnyplotError::invalid(
            "<samples> must contain at least one value",
        ));
    }
    if samples.iter().any(|v| !v.is_finite()) {
        return Err(AnyplotError::invalid(
            "<samples> must be finite numbers",
        ));
    }

    let edges = match bins {
        Bins::Count(n) => {
            if *n == 0 {
                return Err(AnyplotError::invalid(
                    "<bins> must be a positive number of bins",
                ));
            }
            uniform_edges(samples, *n)
        }
        Bins::Edges(edges) => {
            if edges.len() < 2 {
                return Err(AnyplotError::invalid(
                    "<bins> edges must contain at least two values",
                ));
            }
            if edges.windows(2).any(|w| w[1] <= w[0]) {
                return Err(AnyplotError::invalid(
                    "<bins> edges must be strictly increasing",
                ));
            }
            edges.clone()
        }
        Bins::Auto(rule) => uniform_edges(samples, auto_bin_count(samples, *rule)),
    };

    let mut counts = vec![0.0_f64; edges.len() - 1];
    let last = edges.len() - 1;
    for &sample in samples {
        if sample < edges[0] || sample > edges[last] {
            continue;
        }
        // Bins are half-open except the last, which is closed on the right.
        let idx = edges.partition_point(|&e| e <= sample);
        let bin = if idx == 0 {
            0
        } else if idx > counts.len() {
            counts.len() - 1
        } else {
            idx - 1
        };
        counts[bin] += 1.0;
    }

    if density {
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for (count, w) in counts.iter_mut().zip(edges.windows(2)) {
                *count /= total * (w[1] - w[0]);
            }
        }
    }

    Ok((edges, counts))
}

/// Pad with a zero-count bin on each side and shift edges to bin centers.
///
/// The returned centers have one entry per padded bin, so their length is
/// the edge count plus one, and the padded counts start and end at zero.
pub(crate) fn step_outline(edges: &[f64], counts: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = counts.len();
    let first_width = edges[1] - edges[0];
    let last_width = edges[n] - edges[n - 1];

    let mut centers = Vec::with_capacity(n + 2);
    centers.push(edges[0] - first_width / 2.0);
    for w in edges.windows(2) {
        centers.push((w[0] + w[1]) / 2.0);
    }
    centers.push(edges[n] + last_width / 2.0);

    let mut padded = Vec::with_capacity(n + 2);
    padded.push(0.0);
    padded.extend_from_slice(counts);
    padded.push(0.0);

    (centers, padded)
}

fn uniform_edges(samples: &[f64], bins: usize) -> Vec<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in samples {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo == hi {
        // Degenerate range, centered unit span.
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    (0..=bins).map(|i| lo + width * i as f64).collect()
}

fn auto_bin_count(samples: &[f64], rule: BinRule) -> usize {
    let sturges = sturges_bins(samples.len());
    match rule {
        BinRule::Sturges => sturges,
        BinRule::FreedmanDiaconis => fd_bins(samples).unwrap_or(sturges),
        BinRule::Auto => fd_bins(samples).unwrap_or(sturges).max(sturges),
    }
}

fn sturges_bins(n: usize) -> usize {
    ((n as f64).log2().ceil() as usize + 1).max(1)
}

/// Freedman-Diaconis bin count; `None` when the IQR degenerates.
fn fd_bins(samples: &[f64]) -> Option<usize> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);
    let width = 2.0 * iqr / (samples.len() as f64).cbrt();
    if width <= 0.0 {
        return None;
    }
    let span = sorted[sorted.len() - 1] - sorted[0];
    if span <= 0.0 {
        return None;
    }
    Some(((span / width).ceil() as usize).max(1))
}

/// Linear-interpolated percentile of pre-sorted data, `q` in `[0, 1]`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn samples() -> Vec<f64> {
        // Two clusters, deterministic.
        (0..50)
            .map(|i| (i as f64 / 7.0).sin() * 2.0 + if i % 2 == 0 { -1.0 } else { 1.5 })
            .collect()
    }

    #[test]
    fn test_count_bins_cover_all_samples() {
        let data = samples();
        let (edges, counts) = histogram(&data, &Bins::Count(5), false).unwrap();
        assert_eq!(edges.len(), 6);
        assert_eq!(counts.len(), 5);
        assert_abs_diff_eq!(counts.iter().sum::<f64>(), data.len() as f64);
    }

    #[test]
    fn test_explicit_edges_validation() {
        let data = samples();
        assert!(histogram(&data, &Bins::Edges(vec![1.0]), false).is_err());
        assert!(histogram(&data, &Bins::Edges(vec![0.0, 1.0, 0.5]), false).is_err());
        let (edges, counts) =
            histogram(&data, &Bins::Edges(vec![-4.0, 0.0, 2.0, 4.0]), false).unwrap();
        assert_eq!(edges.len(), 4);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(histogram(&samples(), &Bins::Count(0), false).is_err());
    }

    #[test]
    fn test_empty_and_non_finite_samples_rejected() {
        assert!(histogram(&[], &Bins::default(), false).is_err());
        assert!(histogram(&[1.0, f64::NAN], &Bins::default(), false).is_err());
    }

    #[test]
    fn test_auto_rules() {
        let data = samples();
        let (_, sturges) = histogram(&data, &Bins::Auto(BinRule::Sturges), false).unwrap();
        // Sturges for n=50: ceil(log2 50) + 1 = 7.
        assert_eq!(sturges.len(), 7);
        let (_, auto) = histogram(&data, &Bins::Auto(BinRule::Auto), false).unwrap();
        assert!(auto.len() >= sturges.len());
        assert!("fd".parse::<BinRule>().is_ok());
        assert!("scott".parse::<BinRule>().is_err());
    }

    #[test]
    fn test_density_integrates_to_one() {
        let data = samples();
        let (edges, counts) = histogram(&data, &Bins::Count(8), true).unwrap();
        let integral: f64 = counts
            .iter()
            .zip(edges.windows(2))
            .map(|(c, w)| c * (w[1] - w[0]))
            .sum();
        assert_abs_diff_eq!(integral, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_range() {
        let data = vec![3.0; 10];
        let (edges, counts) = histogram(&data, &Bins::Count(4), false).unwrap();
        assert!(edges[0] < 3.0 && edges[4] > 3.0);
        assert_abs_diff_eq!(counts.iter().sum::<f64>(), 10.0);
    }

    #[test]
    fn test_step_outline_padding_invariants() {
        let data = samples();
        let (edges, counts) = histogram(&data, &Bins::Count(6), false).unwrap();
        let (centers, padded) = step_outline(&edges, &counts);
        // Zero-count padding on both sides.
        assert_eq!(padded[0], 0.0);
        assert_eq!(padded[padded.len() - 1], 0.0);
        // One point per padded bin: edge count plus one.
        assert_eq!(centers.len(), edges.len() + 1);
        assert_eq!(centers.len(), padded.len());
        // Interior counts survive unchanged.
        assert_eq!(&padded[1..padded.len() - 1], counts.as_slice());
        // Centers are increasing.
        assert!(centers.windows(2).all(|w| w[1] > w[0]));
    }
}
