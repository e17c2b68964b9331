//! Fixed-width 1D histograms with sum-of-squared-weights errors, and the JSON
//! files that hold them.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::combination::CombinationSpace;
use crate::{Error, Result};

/// A 1D histogram with uniform binning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Lower edge of first bin.
    pub x_min: f64,
    /// Upper edge of last bin.
    pub x_max: f64,
    /// Bin contents (length = n_bins).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin.
    pub sumw2: Vec<f64>,
    /// Number of fill calls.
    pub entries: f64,
    pub underflow: f64,
    pub overflow: f64,
}

impl Histogram {
    pub fn new(name: &str, title: &str, n_bins: usize, x_min: f64, x_max: f64) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            n_bins,
            x_min,
            x_max,
            bin_content: vec![0.0; n_bins],
            sumw2: vec![0.0; n_bins],
            entries: 0.0,
            underflow: 0.0,
            overflow: 0.0,
        }
    }
    /// One bin per combination, bin `n` centered on label `n`.
    pub fn for_combinations(name: &str, title: &str, space: &CombinationSpace) -> Self {
        let n_bins = space.len();
        Self::new(name, title, n_bins, 0.5, n_bins as f64 + 0.5)
    }
    fn width(&self) -> f64 {
        (self.x_max - self.x_min) / self.n_bins as f64
    }
    /// 0-based bin index of `x`, `None` for under/overflow.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if self.n_bins == 0 || x.is_nan() || x < self.x_min || x >= self.x_max {
            return None;
        }
        let idx = ((x - self.x_min) / self.width()) as usize;
        Some(idx.min(self.n_bins - 1))
    }
    pub fn fill(&mut self, x: f64, weight: f64) {
        self.entries += 1.0;
        match self.find_bin(x) {
            Some(idx) => {
                self.bin_content[idx] += weight;
                self.sumw2[idx] += weight * weight;
            }
            None if x < self.x_min => self.underflow += weight,
            None => self.overflow += weight,
        }
    }
    pub fn bin_center(&self, idx: usize) -> f64 {
        self.x_min + (idx as f64 + 0.5) * self.width()
    }
    pub fn bin_error(&self, idx: usize) -> f64 {
        self.sumw2[idx].sqrt()
    }
    /// `error / content`, 0 for an empty bin.
    pub fn relative_error(&self, idx: usize) -> f64 {
        let content = self.bin_content[idx];
        if content == 0.0 {
            0.0
        } else {
            self.bin_error(idx) / content
        }
    }
    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}

/// Named histograms stored together, like directories of a ROOT file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistogramFile {
    pub histograms: BTreeMap<String, Histogram>,
}

impl HistogramFile {
    pub fn insert(&mut self, histogram: Histogram) {
        self.histograms.insert(histogram.name.clone(), histogram);
    }
    pub fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
    pub fn write(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
    /// Read `path` and take the histogram called `name` out of it.
    pub fn read_histogram(path: &Path, name: &str) -> Result<Histogram> {
        Self::read(path)?
            .histograms
            .remove(name)
            .ok_or_else(|| Error::MissingHistogram {
                name: name.to_string(),
                path: path.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn combination_binning_centers_on_labels() {
        let space = CombinationSpace::generate(6, &[0]);
        let hist = Histogram::for_combinations("h", "h", &space);
        assert_eq!(hist.n_bins, 70);
        for idx in 0..hist.n_bins {
            assert_relative_eq!(hist.bin_center(idx), (idx + 1) as f64, epsilon = 1e-12);
            assert_eq!(hist.find_bin((idx + 1) as f64), Some(idx));
        }
    }

    #[test]
    fn fill_tracks_sumw2_and_flows() {
        let mut hist = Histogram::new("h", "h", 3, 0.5, 3.5);
        hist.fill(1.0, 2.0);
        hist.fill(1.0, 3.0);
        hist.fill(3.0, 0.5);
        hist.fill(0.0, 7.0);
        hist.fill(9.0, 4.0);
        assert_eq!(hist.bin_content, vec![5.0, 0.0, 0.5]);
        assert_eq!(hist.sumw2, vec![13.0, 0.0, 0.25]);
        assert_relative_eq!(hist.bin_error(0), 13f64.sqrt());
        assert_relative_eq!(hist.relative_error(0), 13f64.sqrt() / 5.0);
        assert_eq!(hist.relative_error(1), 0.0);
        assert_eq!(hist.underflow, 7.0);
        assert_eq!(hist.overflow, 4.0);
        assert_eq!(hist.entries, 5.0);
        assert_relative_eq!(hist.integral(), 5.5);
    }

    #[test]
    fn empty_binning_sends_everything_to_flows() {
        let hist_space = CombinationSpace::generate(0, &[]);
        let mut hist = Histogram::for_combinations("h", "h", &hist_space);
        hist.fill(0.0, 1.0);
        hist.fill(1.0, 1.0);
        assert_eq!(hist.underflow, 1.0);
        assert_eq!(hist.overflow, 1.0);
    }

    #[test]
    fn missing_histogram_is_named() {
        let dir = std::env::temp_dir().join(format!("wpcomb_hist_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("file.json");
        let mut file = HistogramFile::default();
        file.insert(Histogram::new("present", "t", 2, 0.0, 2.0));
        file.write(&path).unwrap();

        let back = HistogramFile::read(&path).unwrap();
        assert_eq!(back, file);
        assert!(HistogramFile::read_histogram(&path, "present").is_ok());
        match HistogramFile::read_histogram(&path, "absent") {
            Err(Error::MissingHistogram { name, .. }) => assert_eq!(name, "absent"),
            other => panic!("unexpected result: {other:?}"),
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
