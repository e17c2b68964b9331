//! Event tables: per-jet working points, pass flags and weights.

use std::path::Path;

use polars::prelude::*;

use crate::classify::Event;
use crate::config::ColumnLayout;
use crate::{Error, Result};

/// Read a CSV or Parquet table, chosen by file extension.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let is_parquet = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
    let df = if is_parquet {
        ParquetReader::new(std::fs::File::open(path)?).finish()?
    } else {
        CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?
    };
    Ok(df)
}

/// Fails on the first column of `layout` that `df` lacks.
pub fn validate_columns(df: &DataFrame, layout: &ColumnLayout, source: &Path) -> Result<()> {
    match layout
        .required()
        .find(|column| df.get_column_index(column).is_none())
    {
        Some(column) => Err(Error::MissingColumn {
            column: column.to_string(),
            path: source.to_path_buf(),
        }),
        None => Ok(()),
    }
}

fn f64_column(df: &DataFrame, name: &str, source: &Path) -> Result<Vec<f64>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| Error::NullValue {
            column: name.to_string(),
            path: source.to_path_buf(),
        })
}

pub fn events_from_frame(df: &DataFrame, layout: &ColumnLayout, source: &Path) -> Result<Vec<Event>> {
    validate_columns(df, layout, source)?;
    let working_points = layout
        .working_point
        .iter()
        .map(|name| f64_column(df, name, source))
        .collect::<Result<Vec<_>>>()?;
    let pass = layout
        .pass
        .iter()
        .map(|class| {
            class
                .iter()
                .map(|name| f64_column(df, name, source))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    let weights = f64_column(df, &layout.weight, source)?;

    Ok((0..df.height())
        .map(|row| Event {
            working_points: std::array::from_fn(|jet| working_points[jet][row]),
            pass: std::array::from_fn(|class: usize| {
                std::array::from_fn(|jet| pass[class][jet][row] == 1.0)
            }),
            weight: weights[row],
        })
        .collect())
}
