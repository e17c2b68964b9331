//! The pipeline steps behind each subcommand: read files, compute, write files.

use std::path::{Path, PathBuf};

use crate::aggregate::{AggregationScheme, Optimized, Standard};
use crate::combination::CombinationSpace;
use crate::config::{AnalysisConfig, Tagger};
use crate::events::{events_from_frame, read_table};
use crate::histogram::{Histogram, HistogramFile};
use crate::limits::{self, Unavailable};
use crate::plot::{self, Line, ScatterSeries};
use crate::report::{self, significance_frame, uncertainty_frame, write_csv};
use crate::select::collect_highest;
use crate::significance::{
    retain_selected, significance_table, uncertainty_table, Formula, SignificanceRecord,
};
use crate::Result;

/// Limits above this are clipped in the limit plots.
const LIMIT_PLOT_CEILING: f64 = 30.0;

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name of the histogram read by the significance and uncertainty steps.
pub fn histogram_name(new: bool) -> &'static str {
    if new {
        Optimized::HISTOGRAM
    } else {
        Standard::HISTOGRAM
    }
}

/// Both combination histograms of `input`, once per configured tagger.
///
/// Writes `<output_dir>/{signal,background}/WP_<tagger>_<stem>.{json,txt}` and
/// returns the JSON paths.
pub fn make_histograms(
    input: &Path,
    output_dir: &Path,
    is_signal: bool,
    config: &AnalysisConfig,
    space: &CombinationSpace,
) -> Result<Vec<PathBuf>> {
    let name = file_stem(input);
    let dir = output_dir.join(if is_signal { "signal" } else { "background" });
    std::fs::create_dir_all(&dir)?;
    let df = read_table(input)?;
    tracing::info!(path = %input.display(), rows = df.height(), "input file");

    let mut written = Vec::new();
    for tagger in &config.taggers {
        let events = events_from_frame(&df, &config.columns.layout(*tagger), input)?;
        let (labeled, standard) = Standard.aggregate(space, &events);
        if labeled.placeholder {
            tracing::warn!(
                path = %input.display(),
                %tagger,
                "no event matches a valid combination, check the input file"
            );
        }
        let (optimized, new) = Optimized.aggregate(space, &events);
        tracing::info!(%tagger, rejected = ?config.rejected, events = labeled.matched(), "combinations labeled");

        let base = format!("WP_{}_{}", tagger, name);
        report::write_histogram_dump(&dir.join(format!("{base}.txt")), space, &optimized, &labeled)?;
        let mut file = HistogramFile::default();
        file.insert(standard);
        file.insert(new);
        let json = dir.join(format!("{base}.json"));
        file.write(&json)?;
        tracing::info!(path = %json.display(), "output file");
        written.push(json);
    }
    Ok(written)
}

#[derive(Clone, Debug)]
pub struct SignificanceOptions {
    pub new: bool,
    pub output_dir: PathBuf,
    /// Lowest bin shown in the standard-scheme plot.
    pub min_bin: usize,
    pub plot: bool,
}

/// Significance of one signal file against the background histogram.
///
/// Writes `[New_]significance_<stem>.{txt,csv}` (and `.svg` when plotting) and
/// returns the CSV path.
pub fn significance_step(
    signal: &Path,
    background: &Histogram,
    options: &SignificanceOptions,
    space: &CombinationSpace,
) -> Result<PathBuf> {
    let hist = HistogramFile::read_histogram(signal, histogram_name(options.new))?;
    let mut records = significance_table(space, &hist, background)?;
    if options.new {
        retain_selected(&mut records, |r| r.combination);
    }
    let zero_background = records.iter().filter(|r| r.zero_background).count();
    tracing::debug!(path = %signal.display(), bins = records.len(), zero_background, "significance computed");

    let prefix = if options.new { "New_significance_" } else { "significance_" };
    let base = options.output_dir.join(format!("{}{}", prefix, file_stem(signal)));
    report::write_significance_text(&with_suffix(&base, "txt"), signal, &records)?;
    let csv = with_suffix(&base, "csv");
    write_csv(&csv, &mut significance_frame(&records)?)?;

    if options.plot {
        let shown: Vec<&SignificanceRecord> = records
            .iter()
            .filter(|r| options.new || r.label >= options.min_bin)
            .collect();
        plot_significance(&with_suffix(&base, "svg"), &shown)?;
    }
    tracing::info!(path = %csv.display(), "output file");
    Ok(csv)
}

fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Regular and B=0 bins as separate series for both formulas.
fn plot_significance(path: &Path, records: &[&SignificanceRecord]) -> Result<()> {
    let categories: Vec<String> = records.iter().map(|r| r.combination.to_string()).collect();
    let series = [
        (Formula::Asimov, false),
        (Formula::SOverSqrtB, false),
        (Formula::Asimov, true),
        (Formula::SOverSqrtB, true),
    ]
    .into_iter()
    .map(|(formula, zero_background)| ScatterSeries {
        label: if zero_background {
            format!("{}, B = 0", formula.label())
        } else {
            formula.label().to_string()
        },
        points: records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.zero_background == zero_background)
            .map(|(idx, r)| {
                let value = match formula {
                    Formula::Asimov => r.long,
                    Formula::SOverSqrtB => r.short,
                };
                (idx, value)
            })
            .collect(),
    })
    .collect::<Vec<_>>();
    plot::scatter(path, "Signal Significance", &categories, &series)
}

/// Relative statistical uncertainty per bin of one histogram file.
///
/// Writes `[New_]Stat_Unc_<stem>.csv` next to the input and returns its path.
pub fn stat_unc_step(input: &Path, new: bool, plot: bool, space: &CombinationSpace) -> Result<PathBuf> {
    let name = histogram_name(new);
    tracing::info!(histogram = name, path = %input.display(), "reading histogram");
    let hist = HistogramFile::read_histogram(input, name)?;
    let mut records = uncertainty_table(space, &hist)?;
    if new {
        retain_selected(&mut records, |r| r.combination);
    }
    let prefix = if new { "New_Stat_Unc_" } else { "Stat_Unc_" };
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let base = dir.join(format!("{}{}", prefix, file_stem(input)));
    let csv = with_suffix(&base, "csv");
    write_csv(&csv, &mut uncertainty_frame(&records)?)?;
    if plot {
        let categories: Vec<String> = records.iter().map(|r| r.combination.to_string()).collect();
        let series = [ScatterSeries {
            label: "Statistical Uncertainty".into(),
            points: records.iter().enumerate().map(|(i, r)| (i, r.uncertainty)).collect(),
        }];
        plot::scatter(&with_suffix(&base, "svg"), "Statistical Uncertainty", &categories, &series)?;
    }
    tracing::info!(path = %csv.display(), "output file");
    Ok(csv)
}

/// Best combination per mass point, written to `[New_]highest_significance_<tagger>.csv`.
pub fn highest_step(
    significance: &[PathBuf],
    uncertainty: &Path,
    new: bool,
    tagger: Tagger,
    output_dir: &Path,
    plot: bool,
) -> Result<PathBuf> {
    let mut df = collect_highest(significance, uncertainty)?;
    let prefix = if new { "New_highest_significance_" } else { "highest_significance_" };
    let base = output_dir.join(format!("{}{}", prefix, tagger));
    let csv = with_suffix(&base, "csv");
    write_csv(&csv, &mut df)?;
    if plot {
        let categories: Vec<String> = df
            .column("Combination")?
            .str()?
            .into_iter()
            .map(|c| c.unwrap_or_default().to_string())
            .collect();
        let series = [
            (Formula::Asimov, "Long_Significance"),
            (Formula::SOverSqrtB, "Short_Significance"),
        ]
        .into_iter()
        .map(|(formula, column)| -> Result<ScatterSeries> {
            Ok(ScatterSeries {
                label: formula.label().to_string(),
                points: df
                    .column(column)?
                    .f64()?
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.map(|v| (i, v)))
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
        plot::scatter(&with_suffix(&base, "svg"), "Highest Significance", &categories, &series)?;
    }
    tracing::info!(path = %csv.display(), mass_points = df.height(), "output file");
    Ok(csv)
}

/// The y ceiling for one MY's limit plot, set only when some limit exceeds it.
fn limit_plot_clamp(lines: &[Line]) -> Option<f64> {
    lines
        .iter()
        .flat_map(|l| l.points.iter())
        .any(|&(_, y)| y > LIMIT_PLOT_CEILING)
        .then_some(LIMIT_PLOT_CEILING)
}

#[derive(Clone, Debug)]
pub struct LimitOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub templates: Vec<u32>,
    /// Legend entry per template, in template order.
    pub labels: Vec<String>,
    pub unavailable: Vec<Unavailable>,
    pub plot: bool,
}

/// Expected-limit table `Exp_limits.csv`, plus linear and log plots per MY.
pub fn limits_step(options: &LimitOptions) -> Result<PathBuf> {
    std::fs::create_dir_all(&options.output_dir)?;
    let points = limits::collect_limits(&options.input_dir, &options.templates)?;
    tracing::info!(points = points.len(), "limits collected");
    let csv = options.output_dir.join("Exp_limits.csv");
    write_csv(&csv, &mut limits::limits_frame(&points)?)?;

    if options.plot {
        let label = |scenario: u32| {
            options
                .templates
                .iter()
                .position(|&t| t == scenario)
                .and_then(|idx| options.labels.get(idx).cloned())
                .unwrap_or_else(|| format!("scenario {}", scenario))
        };
        for (my, by_scenario) in limits::curves(&points, &options.unavailable) {
            let lines: Vec<Line> = by_scenario
                .into_iter()
                .map(|(scenario, curve)| Line {
                    label: label(scenario),
                    points: curve.into_iter().map(|(mx, l)| (f64::from(mx), l)).collect(),
                })
                .collect();
            let clamp = limit_plot_clamp(&lines);
            let caption = format!("M_Y = {} GeV", my);
            for log in [false, true] {
                let suffix = if log { "_log" } else { "" };
                let path = options
                    .output_dir
                    .join(format!("Exp_limits_MX_MY{}{}.svg", my, suffix));
                plot::lines(
                    &path,
                    &caption,
                    "M_X [GeV]",
                    "Expected limits at 95% CL [pb]",
                    &lines,
                    clamp,
                    log,
                )?;
            }
        }
    }
    tracing::info!(path = %csv.display(), "output file");
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_keeps_dots_in_stem() {
        assert_eq!(
            with_suffix(Path::new("out/significance_a.v2"), "csv"),
            PathBuf::from("out/significance_a.v2.csv")
        );
        assert_eq!(file_stem(Path::new("dir/WP_PNetB_x.json")), "WP_PNetB_x");
    }

    #[test]
    fn limit_plots_clamp_above_thirty() {
        let line = |points: &[(f64, f64)]| Line {
            label: "l".into(),
            points: points.to_vec(),
        };
        assert_eq!(limit_plot_clamp(&[line(&[(300.0, 0.5), (400.0, 30.0)])]), None);
        assert_eq!(
            limit_plot_clamp(&[line(&[(300.0, 0.5)]), line(&[(300.0, 45.0)])]),
            Some(30.0)
        );
    }

    #[test]
    fn histogram_names() {
        assert_eq!(histogram_name(false), "hist_wp_combinations");
        assert_eq!(histogram_name(true), "hist_wp_combinations_new");
    }
}
