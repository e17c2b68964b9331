//! Expected upper limits per scenario and mass point.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use polars::prelude::*;

use crate::events::read_table;
use crate::{Error, Result};

/// Rows a limit table holds when all five expected quantiles and the observed value are present.
const FULL_QUANTILE_ROWS: usize = 6;
const MEDIAN_ROW: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LimitPoint {
    pub scenario: u32,
    pub mx: u32,
    pub my: u32,
    pub limit: f64,
}

/// A `(scenario, MX, MY)` point whose fit result is known to be missing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Unavailable {
    pub scenario: u32,
    pub mx: u32,
    pub my: u32,
}

impl FromStr for Unavailable {
    type Err = String;

    /// `scenario:MX:MY`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [scenario, mx, my] = parts.as_slice() else {
            return Err(format!("expected SCENARIO:MX:MY, got `{s}`"));
        };
        let parse = |v: &str| v.parse::<u32>().map_err(|e| format!("`{v}`: {e}"));
        Ok(Self {
            scenario: parse(*scenario)?,
            mx: parse(*mx)?,
            my: parse(*my)?,
        })
    }
}

/// `(scenario, MX, MY)` from `higgsCombine<scenario>_<MX>_<MY>.<rest>`.
pub fn parse_file_name(name: &str) -> Option<(u32, u32, u32)> {
    let stem = name.strip_prefix("higgsCombine")?.split('.').next()?;
    let parts: Vec<u32> = stem
        .split('_')
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        &[scenario, mx, my] => Some((scenario, mx, my)),
        _ => None,
    }
}

/// The median expected limit, or the observed one when the quantiles are incomplete.
pub fn expected_limit(limits: &[f64]) -> Option<f64> {
    if limits.len() == FULL_QUANTILE_ROWS {
        Some(limits[MEDIAN_ROW])
    } else {
        limits.last().copied()
    }
}

fn read_limits(path: &Path) -> Result<Vec<f64>> {
    let df = read_table(path)?;
    let limits = df.column("limit")?.cast(&DataType::Float64)?;
    limits
        .f64()?
        .into_iter()
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| Error::NullValue {
            column: "limit".to_string(),
            path: path.to_path_buf(),
        })
}

/// Every limit table in `dir` belonging to one of `templates`.
pub fn collect_limits(dir: &Path, templates: &[u32]) -> Result<Vec<LimitPoint>> {
    let mut points = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("higgsCombine") || !name.ends_with(".csv") {
            continue;
        }
        let Some((scenario, mx, my)) = parse_file_name(&name) else {
            tracing::warn!(file = %name, "cannot parse scenario and masses from file name");
            continue;
        };
        if !templates.contains(&scenario) {
            continue;
        }
        match expected_limit(&read_limits(&entry.path())?) {
            Some(limit) => points.push(LimitPoint {
                scenario,
                mx,
                my,
                limit,
            }),
            None => tracing::warn!(file = %name, "limit table is empty"),
        }
    }
    Ok(points)
}

/// Limit curves keyed by MY, then scenario; each curve sorted by MX.
///
/// Unavailable points absent from `points` are added with ten times the limit
/// of the preceding MX of the same curve, or 0 when there is none.
pub fn curves(
    points: &[LimitPoint],
    unavailable: &[Unavailable],
) -> BTreeMap<u32, BTreeMap<u32, Vec<(u32, f64)>>> {
    let mut curves: BTreeMap<u32, BTreeMap<u32, Vec<(u32, f64)>>> = BTreeMap::new();
    for p in points {
        curves
            .entry(p.my)
            .or_default()
            .entry(p.scenario)
            .or_default()
            .push((p.mx, p.limit));
    }
    for by_scenario in curves.values_mut() {
        for curve in by_scenario.values_mut() {
            curve.sort_by_key(|&(mx, _)| mx);
        }
    }
    for u in unavailable {
        let Some(curve) = curves
            .get_mut(&u.my)
            .and_then(|by_scenario| by_scenario.get_mut(&u.scenario))
        else {
            continue;
        };
        if curve.iter().any(|&(mx, _)| mx == u.mx) {
            continue;
        }
        let filled = curve
            .iter()
            .rev()
            .find(|&&(mx, _)| mx < u.mx)
            .map_or(0.0, |&(_, limit)| limit * 10.0);
        curve.push((u.mx, filled));
        curve.sort_by_key(|&(mx, _)| mx);
    }
    curves
}

pub fn limits_frame(points: &[LimitPoint]) -> PolarsResult<DataFrame> {
    df!(
        "Scenario" => points.iter().map(|p| p.scenario).collect::<Vec<_>>(),
        "MX" => points.iter().map(|p| p.mx).collect::<Vec<_>>(),
        "MY" => points.iter().map(|p| p.my).collect::<Vec<_>>(),
        "Limits" => points.iter().map(|p| p.limit).collect::<Vec<_>>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(
            parse_file_name("higgsCombine3_650_125.AsymptoticLimits.mH120.csv"),
            Some((3, 650, 125))
        );
        assert_eq!(parse_file_name("higgsCombine3_650.csv"), None);
        assert_eq!(parse_file_name("other3_650_125.csv"), None);
    }

    #[test]
    fn median_or_observed() {
        assert_eq!(expected_limit(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.35]), Some(0.3));
        assert_eq!(expected_limit(&[0.1, 0.2, 0.7]), Some(0.7));
        assert_eq!(expected_limit(&[]), None);
    }

    #[test]
    fn unavailable_points_are_extrapolated() {
        let points = vec![
            LimitPoint { scenario: 1, mx: 900, my: 60, limit: 0.5 },
            LimitPoint { scenario: 1, mx: 300, my: 60, limit: 2.0 },
            LimitPoint { scenario: 2, mx: 300, my: 60, limit: 1.0 },
        ];
        let unavailable: Vec<Unavailable> = ["1:4000:60", "2:200:60", "1:900:60", "5:4000:60"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let curves = curves(&points, &unavailable);
        assert_eq!(curves[&60][&1], vec![(300, 2.0), (900, 0.5), (4000, 5.0)]);
        assert_eq!(curves[&60][&2], vec![(200, 0.0), (300, 1.0)]);
        assert!(!curves[&60].contains_key(&5));
    }

    #[test]
    fn unavailable_syntax() {
        assert!("1:2".parse::<Unavailable>().is_err());
        assert!("a:2:3".parse::<Unavailable>().is_err());
    }

    #[test]
    fn collects_from_directory() {
        let dir = std::env::temp_dir().join(format!("wpcomb_limits_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("higgsCombine1_300_60.AsymptoticLimits.csv"),
            "limit\n0.1\n0.2\n0.3\n0.4\n0.5\n0.6\n",
        )
        .unwrap();
        std::fs::write(dir.join("higgsCombine2_300_60.AsymptoticLimits.csv"), "limit\n0.9\n").unwrap();
        std::fs::write(dir.join("higgsCombine7_300_60.AsymptoticLimits.csv"), "limit\n0.9\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let points = collect_limits(&dir, &[1, 2]).unwrap();
        assert_eq!(
            points,
            vec![
                LimitPoint { scenario: 1, mx: 300, my: 60, limit: 0.3 },
                LimitPoint { scenario: 2, mx: 300, my: 60, limit: 0.9 },
            ]
        );
        assert_eq!(limits_frame(&points).unwrap().height(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn null_limit_is_an_error() {
        let dir = std::env::temp_dir().join(format!("wpcomb_null_limits_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("higgsCombine2_300_60.AsymptoticLimits.csv"),
            "limit,quantileExpected\n0.1,0.025\n,0.16\n0.3,0.5\n",
        )
        .unwrap();

        assert!(matches!(
            collect_limits(&dir, &[2]),
            Err(Error::NullValue { column, .. }) if column == "limit"
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
