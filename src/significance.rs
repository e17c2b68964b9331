//! Signal significance and statistical uncertainty per combination bin.

use crate::combination::{Combination, CombinationSpace};
use crate::histogram::Histogram;
use crate::{Error, Result};

/// Stand-in background for bins with no background at all.
pub const ZERO_BACKGROUND_EPSILON: f64 = 1e-9;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Formula {
    /// `sqrt(2 ((s + b) ln(1 + s / b) - s))`
    Asimov,
    /// `s / sqrt(b)`
    SOverSqrtB,
}

impl Formula {
    pub fn label(&self) -> &'static str {
        match self {
            Formula::Asimov => "sqrt(2 * ((S + B)*log(1 + (S/B)) - S))",
            Formula::SOverSqrtB => "S/sqrt(B)",
        }
    }
}

/// Significance of `s` signal over `b` background; `b == 0` is replaced by
/// [`ZERO_BACKGROUND_EPSILON`].
pub fn significance(s: f64, b: f64, formula: Formula) -> f64 {
    let b = if b == 0.0 { ZERO_BACKGROUND_EPSILON } else { b };
    match formula {
        Formula::Asimov => f64::sqrt(2.0 * ((s + b) * f64::ln(1.0 + s / b) - s)),
        Formula::SOverSqrtB => s / f64::sqrt(b),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignificanceRecord {
    pub label: usize,
    pub bin_center: f64,
    pub combination: Combination,
    /// [`Formula::Asimov`]
    pub long: f64,
    /// [`Formula::SOverSqrtB`]
    pub short: f64,
    /// Computed with the epsilon background.
    pub zero_background: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UncertaintyRecord {
    pub label: usize,
    pub bin_center: f64,
    pub combination: Combination,
    pub uncertainty: f64,
}

fn check_binning(space: &CombinationSpace, hist: &Histogram) -> Result<()> {
    if hist.n_bins != space.len() {
        return Err(Error::BinningMismatch(format!(
            "histogram `{}` has {} bins, the combination space has {}",
            hist.name,
            hist.n_bins,
            space.len()
        )));
    }
    if hist.bin_content.len() != hist.n_bins || hist.sumw2.len() != hist.n_bins {
        return Err(Error::BinningMismatch(format!(
            "histogram `{}` declares {} bins but stores {} contents and {} sumw2 entries",
            hist.name,
            hist.n_bins,
            hist.bin_content.len(),
            hist.sumw2.len()
        )));
    }
    Ok(())
}

/// One record per bin, in label order.
pub fn significance_table(
    space: &CombinationSpace,
    signal: &Histogram,
    background: &Histogram,
) -> Result<Vec<SignificanceRecord>> {
    check_binning(space, signal)?;
    check_binning(space, background)?;
    Ok(space
        .iter()
        .map(|(label, combination)| {
            let idx = label - 1;
            let s = signal.bin_content[idx];
            let b = background.bin_content[idx];
            SignificanceRecord {
                label,
                bin_center: background.bin_center(idx),
                combination: *combination,
                long: significance(s, b, Formula::Asimov),
                short: significance(s, b, Formula::SOverSqrtB),
                zero_background: b == 0.0,
            }
        })
        .collect())
}

/// Relative statistical uncertainty (`error / content`) per bin.
pub fn uncertainty_table(space: &CombinationSpace, hist: &Histogram) -> Result<Vec<UncertaintyRecord>> {
    check_binning(space, hist)?;
    Ok(space
        .iter()
        .map(|(label, combination)| UncertaintyRecord {
            label,
            bin_center: hist.bin_center(label - 1),
            combination: *combination,
            uncertainty: hist.relative_error(label - 1),
        })
        .collect())
}

/// Keep only records of the analysis subset.
pub fn retain_selected<T>(records: &mut Vec<T>, combination: impl Fn(&T) -> Combination) {
    records.retain(|record| combination(record).is_selected());
}
