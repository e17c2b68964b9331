//! Text dumps and CSV tables written by the pipeline steps.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use polars::prelude::*;

use crate::aggregate::{LabeledEvents, OptimizedBin};
use crate::combination::CombinationSpace;
use crate::significance::{SignificanceRecord, UncertaintyRecord};
use crate::Result;

/// Label table, optimized tallies and the labeled event arrays.
pub fn write_histogram_dump(
    path: &Path,
    space: &CombinationSpace,
    optimized: &[OptimizedBin],
    labeled: &LabeledEvents,
) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "Label: {}", space.len())?;
    for (label, combination) in space.iter() {
        writeln!(file, "{}: {}", combination, label)?;
    }
    writeln!(file, "Redefining the combinations of WP: {}", optimized.len())?;
    for (combination, bin) in space.combinations().iter().zip(optimized) {
        writeln!(file, "{}: [{}, {}]", combination, bin.count, bin.mean_weight)?;
    }
    writeln!(file, "\nEvent WP Labeled: {}", labeled.labels.len())?;
    for label in &labeled.labels {
        writeln!(file, "{}", label)?;
    }
    writeln!(file, "\nEvent Weights Labeled: {}", labeled.weights.len())?;
    for weight in &labeled.weights {
        writeln!(file, "{}", weight)?;
    }
    file.flush()?;
    Ok(())
}

/// One line per record; bins computed with the epsilon background are marked `(B=0)`.
pub fn write_significance_text(
    path: &Path,
    signal: &Path,
    records: &[SignificanceRecord],
) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "Signal: {}", signal.display())?;
    for r in records {
        write!(
            file,
            "bin {} {}: {}, {}",
            r.bin_center, r.combination, r.long, r.short
        )?;
        if r.zero_background {
            write!(file, " (B=0)")?;
        }
        writeln!(file)?;
    }
    file.flush()?;
    Ok(())
}

pub fn significance_frame(records: &[SignificanceRecord]) -> PolarsResult<DataFrame> {
    df!(
        "Bin_Center" => records.iter().map(|r| r.bin_center).collect::<Vec<_>>(),
        "Combination" => records.iter().map(|r| r.combination.to_string()).collect::<Vec<_>>(),
        "Long_Significance" => records.iter().map(|r| r.long).collect::<Vec<_>>(),
        "Short_Significance" => records.iter().map(|r| r.short).collect::<Vec<_>>()
    )
}

pub fn uncertainty_frame(records: &[UncertaintyRecord]) -> PolarsResult<DataFrame> {
    df!(
        "Bin_Center" => records.iter().map(|r| r.bin_center).collect::<Vec<_>>(),
        "Uncertainty" => records.iter().map(|r| r.uncertainty).collect::<Vec<_>>()
    )
}

pub fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    let file = File::create(path)?;
    CsvWriter::new(file).include_header(true).finish(df)?;
    Ok(())
}
