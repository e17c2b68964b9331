//! Collect per-process histograms into a single statistical-model input file.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::histogram::{Histogram, HistogramFile};
use crate::Result;

/// Name the observed-data histogram is stored under.
pub const DATA_OBS: &str = "data_obs";

#[derive(Clone, Debug)]
pub struct MergeSpec {
    pub input_dir: PathBuf,
    /// Read from `Histogram_<name>.json`.
    pub signals: Vec<String>,
    /// Read from `Output_<name>.json`.
    pub backgrounds: Vec<String>,
    /// Read from `Output_<name>.json`, stored as [`DATA_OBS`].
    pub data: String,
    pub histograms: Vec<String>,
}

/// One directory per histogram name, each mapping process name to histogram.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombineInput {
    pub directories: BTreeMap<String, BTreeMap<String, Histogram>>,
}

impl CombineInput {
    pub fn write(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
    pub fn read(path: &Path) -> Result<Self> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }
}

/// `None` (with an error logged) when the file or the histogram is missing.
fn fetch(path: &Path, name: &str) -> Option<Histogram> {
    tracing::debug!(path = %path.display(), histogram = name, "reading histogram");
    match HistogramFile::read_histogram(path, name) {
        Ok(histogram) => Some(histogram),
        Err(e) => {
            tracing::error!("{}", e);
            None
        }
    }
}

pub fn merge(spec: &MergeSpec) -> CombineInput {
    let mut sources: Vec<(String, PathBuf)> = Vec::new();
    for signal in &spec.signals {
        sources.push((
            signal.clone(),
            spec.input_dir.join(format!("Histogram_{}.json", signal)),
        ));
    }
    for background in &spec.backgrounds {
        sources.push((
            background.clone(),
            spec.input_dir.join(format!("Output_{}.json", background)),
        ));
    }
    sources.push((
        DATA_OBS.to_string(),
        spec.input_dir.join(format!("Output_{}.json", spec.data)),
    ));

    let mut input = CombineInput::default();
    for name in &spec.histograms {
        let directory = input.directories.entry(name.clone()).or_default();
        for (process, path) in &sources {
            if let Some(mut histogram) = fetch(path, name) {
                histogram.name = process.clone();
                directory.insert(process.clone(), histogram);
            }
        }
        tracing::info!(histogram = %name, processes = directory.len(), "directory filled");
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, file: &str, names: &[&str], value: f64) {
        let mut out = HistogramFile::default();
        for name in names {
            let mut h = Histogram::new(name, name, 2, 0.0, 2.0);
            h.fill(0.5, value);
            out.insert(h);
        }
        out.write(&dir.join(file)).unwrap();
    }

    #[test]
    fn merges_and_skips_missing() {
        let dir = std::env::temp_dir().join(format!("wpcomb_merge_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_file(&dir, "Histogram_sigA.json", &["h_MX", "h_MY"], 1.0);
        write_file(&dir, "Output_TT.json", &["h_MX"], 2.0);
        write_file(&dir, "Output_Data.json", &["h_MX", "h_MY"], 3.0);

        let spec = MergeSpec {
            input_dir: dir.clone(),
            signals: vec!["sigA".into(), "sigB".into()],
            backgrounds: vec!["TT".into()],
            data: "Data".into(),
            histograms: vec!["h_MX".into(), "h_MY".into()],
        };
        let input = merge(&spec);
        let h_mx = &input.directories["h_MX"];
        assert_eq!(
            h_mx.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["TT", "data_obs", "sigA"]
        );
        assert_eq!(h_mx["data_obs"].name, "data_obs");
        assert_eq!(h_mx["data_obs"].bin_content[0], 3.0);
        assert_eq!(input.directories["h_MY"].len(), 2);

        let path = dir.join("combine_input.json");
        input.write(&path).unwrap();
        assert_eq!(CombineInput::read(&path).unwrap(), input);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
