//! Best working-point combination per signal mass point.

use std::path::Path;

use polars::prelude::*;

use crate::events::read_table;
use crate::Result;

/// `MX-<a>_MY-<b>` taken from the `_`-separated tokens of a file stem, or the
/// whole stem when it does not name a mass point.
pub fn mass_label(stem: &str) -> String {
    let tokens: Vec<&str> = stem.split('_').collect();
    let mx = tokens.iter().find(|t| t.starts_with("MX-"));
    let my = tokens.iter().find(|t| t.starts_with("MY-"));
    match (mx, my) {
        (Some(mx), Some(my)) => format!("{}_{}", mx, my),
        (Some(mx), None) => mx.to_string(),
        _ => stem.to_string(),
    }
}

fn empty_output() -> PolarsResult<DataFrame> {
    df!(
        "Mass" => Vec::<String>::new(),
        "Bin_Center" => Vec::<i64>::new(),
        "Combination" => Vec::<String>::new(),
        "Long_Significance" => Vec::<f64>::new(),
        "Short_Significance" => Vec::<f64>::new(),
        "Uncertainty" => Vec::<f64>::new()
    )
}

/// Rows of `significance` holding its largest `Short_Significance`, joined
/// with `uncertainty` on the bin center.
///
/// `None` when the table is empty or its maximum is infinite.
pub fn highest_rows(
    significance: DataFrame,
    uncertainty: &DataFrame,
    mass: &str,
) -> Result<Option<DataFrame>> {
    let uncertainty = uncertainty.clone().lazy().select([
        col("Bin_Center").cast(DataType::Int64),
        col("Uncertainty").cast(DataType::Float64),
    ]);
    let joined = significance
        .lazy()
        .with_columns([
            col("Bin_Center").cast(DataType::Int64),
            col("Long_Significance").cast(DataType::Float64),
            col("Short_Significance").cast(DataType::Float64),
        ])
        .join(
            uncertainty,
            [col("Bin_Center")],
            [col("Bin_Center")],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    let max = joined.column("Short_Significance")?.f64()?.max();
    let max = match max {
        Some(max) if max.is_infinite() => {
            tracing::warn!(mass, "maximum significance is infinite, skipping mass point");
            return Ok(None);
        }
        Some(max) => max,
        None => {
            tracing::warn!(mass, "empty significance table, skipping mass point");
            return Ok(None);
        }
    };
    let rows = joined
        .lazy()
        .filter(col("Short_Significance").eq(lit(max)))
        .with_column(lit(mass).alias("Mass"))
        .select([
            col("Mass"),
            col("Bin_Center"),
            col("Combination"),
            col("Long_Significance"),
            col("Short_Significance"),
            col("Uncertainty"),
        ])
        .collect()?;
    Ok(Some(rows))
}

/// One block of rows per significance table whose maximum is finite.
pub fn collect_highest<P: AsRef<Path>>(significance: &[P], uncertainty: &Path) -> Result<DataFrame> {
    let uncertainty = read_table(uncertainty)?;
    let mut total = empty_output()?;
    for path in significance {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mass = mass_label(&stem);
        if let Some(rows) = highest_rows(read_table(path)?, &uncertainty, &mass)? {
            tracing::info!(mass = %mass, rows = rows.height(), "highest significance selected");
            total.vstack_mut(&rows)?;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn significance(short: &[f64]) -> DataFrame {
        let n = short.len();
        df!(
            "Bin_Center" => (1..=n).map(|i| i as f64).collect::<Vec<_>>(),
            "Combination" => (1..=n).map(|i| format!("c{i}")).collect::<Vec<_>>(),
            "Long_Significance" => short.iter().map(|s| s / 2.0).collect::<Vec<_>>(),
            "Short_Significance" => short.to_vec()
        )
        .unwrap()
    }

    fn uncertainty(n: usize) -> DataFrame {
        df!(
            "Bin_Center" => (1..=n).map(|i| i as f64).collect::<Vec<_>>(),
            "Uncertainty" => (1..=n).map(|i| i as f64 / 100.0).collect::<Vec<_>>()
        )
        .unwrap()
    }

    #[test]
    fn mass_from_stem() {
        assert_eq!(
            mass_label("significance_WP_PNetB_Histogram_NMSSM_XtoYHto4B_MX-300_MY-125_TuneCP5"),
            "MX-300_MY-125"
        );
        assert_eq!(mass_label("whatever"), "whatever");
    }

    #[test]
    fn picks_the_maximum_with_its_uncertainty() {
        let rows = highest_rows(significance(&[1.0, 4.0, 2.0]), &uncertainty(3), "MX-300_MY-60")
            .unwrap()
            .unwrap();
        assert_eq!(rows.height(), 1);
        assert_eq!(
            rows.get_column_names(),
            &[
                "Mass",
                "Bin_Center",
                "Combination",
                "Long_Significance",
                "Short_Significance",
                "Uncertainty"
            ]
        );
        assert_eq!(rows.column("Mass").unwrap().str().unwrap().get(0), Some("MX-300_MY-60"));
        assert_eq!(rows.column("Bin_Center").unwrap().i64().unwrap().get(0), Some(2));
        assert_eq!(rows.column("Combination").unwrap().str().unwrap().get(0), Some("c2"));
        assert_eq!(rows.column("Uncertainty").unwrap().f64().unwrap().get(0), Some(0.02));
    }

    #[test]
    fn ties_keep_every_row() {
        let rows = highest_rows(significance(&[3.0, 1.0, 3.0]), &uncertainty(3), "m")
            .unwrap()
            .unwrap();
        assert_eq!(rows.height(), 2);
    }

    #[test]
    fn infinite_maximum_is_skipped() {
        let rows = highest_rows(
            significance(&[1.0, f64::INFINITY, 2.0]),
            &uncertainty(3),
            "MX-900_MY-95",
        )
        .unwrap();
        assert!(rows.is_none());
    }

    #[test]
    fn infinite_mass_point_is_left_out_of_the_collection() {
        let dir = std::env::temp_dir().join(format!("wpcomb_select_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let finite = dir.join("significance_MX-300_MY-60.csv");
        let infinite = dir.join("significance_MX-900_MY-95.csv");
        let unc = dir.join("Stat_Unc_bkg.csv");
        crate::report::write_csv(&finite, &mut significance(&[1.0, 4.0, 2.0])).unwrap();
        crate::report::write_csv(&infinite, &mut significance(&[1.0, f64::INFINITY, 2.0])).unwrap();
        crate::report::write_csv(&unc, &mut uncertainty(3)).unwrap();

        let total = collect_highest(&[&finite, &infinite], &unc).unwrap();
        assert_eq!(total.height(), 1);
        assert_eq!(total.column("Mass").unwrap().str().unwrap().get(0), Some("MX-300_MY-60"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
