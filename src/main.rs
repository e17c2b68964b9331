use std::path::PathBuf;

use anyhow::Context;
use clap::{builder::BoolishValueParser, ArgAction, CommandFactory, Parser, Subcommand};
use indicatif::ProgressIterator;
use wpcomb::{
    config::{AnalysisConfig, Tagger},
    histogram::HistogramFile,
    limits::Unavailable,
    merge::{self, MergeSpec},
    pipeline::{self, LimitOptions, SignificanceOptions},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log verbosity
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,
    /// JSON analysis configuration (working points, taggers, column names)
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the working-point combination histograms of event tables
    Hist {
        #[arg(short, long, value_name = "INPUT", num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, alias = "isSignal", value_name = "BOOL", required = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        is_signal: bool,
        #[arg(long, value_name = "DIR", default_value = ".")]
        output_dir: PathBuf,
    },
    /// Per-bin significance of signal histograms against a background histogram
    Significance {
        #[arg(short, long, value_name = "SIGNAL", num_args = 1.., required = true)]
        signals: Vec<PathBuf>,
        #[arg(short, long, value_name = "BACKGROUND")]
        background: PathBuf,
        #[arg(long, alias = "New", value_name = "BOOL", action = ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "false")]
        new: bool,
        #[arg(long, value_name = "DIR", default_value = ".")]
        output_dir: PathBuf,
        #[arg(long, value_name = "BIN", default_value_t = 1)]
        min_bin: usize,
        #[arg(long)]
        plot: bool,
    },
    /// Relative statistical uncertainty per bin
    StatUnc {
        #[arg(short, long, value_name = "INPUT", num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, alias = "New", value_name = "BOOL", action = ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "false")]
        new: bool,
        #[arg(long)]
        plot: bool,
    },
    /// Most significant combination per mass point
    Highest {
        #[arg(short, long, value_name = "CSV", num_args = 1.., required = true)]
        significance: Vec<PathBuf>,
        #[arg(short, long, value_name = "CSV")]
        uncertainty: PathBuf,
        #[arg(long, alias = "New", value_name = "BOOL", action = ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "false")]
        new: bool,
        #[arg(long, value_enum, default_value_t = Tagger::RobustParTAK4B)]
        tagger: Tagger,
        #[arg(long, value_name = "DIR", default_value = ".")]
        output_dir: PathBuf,
        #[arg(long)]
        plot: bool,
    },
    /// Collect process histograms into one statistical-model input file
    Merge {
        #[arg(long, value_name = "DIR")]
        input_dir: PathBuf,
        #[arg(long = "signal", value_name = "NAME", num_args = 1..)]
        signals: Vec<String>,
        #[arg(long = "background", value_name = "NAME", num_args = 1..)]
        backgrounds: Vec<String>,
        #[arg(long, value_name = "NAME")]
        data: String,
        #[arg(long = "histogram", value_name = "NAME", num_args = 1.., required = true)]
        histograms: Vec<String>,
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },
    /// Expected-limit table and plots
    Limits {
        #[arg(long, value_name = "DIR")]
        input_dir: PathBuf,
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,
        #[arg(long, value_name = "SCENARIO", num_args = 1.., default_values_t = [1, 2, 3, 4, 5, 6])]
        templates: Vec<u32>,
        #[arg(long, value_name = "LABEL", num_args = 1.., default_values = [
            "XXT,XXT,>=XT,>=XT",
            "XXT,XXT,XT,XT",
            "XXT,XXT,XXT,XT",
            "XXT,XXT,XXT,XXT",
            "combined",
            ">=T,>=T,>=T,>=M",
        ])]
        labels: Vec<String>,
        #[arg(long, value_name = "SCENARIO:MX:MY", num_args = 1..)]
        unavailable: Vec<Unavailable>,
        #[arg(long)]
        plot: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let space = config.space();
    tracing::debug!(nwp = config.nwp, combinations = space.len(), "working-point space");

    match cli.command {
        Some(Commands::Hist {
            inputs,
            is_signal,
            output_dir,
        }) => {
            for input in inputs.iter().progress() {
                pipeline::make_histograms(input, &output_dir, is_signal, &config, &space)
                    .with_context(|| format!("processing {}", input.display()))?;
            }
        }
        Some(Commands::Significance {
            signals,
            background,
            new,
            output_dir,
            min_bin,
            plot,
        }) => {
            std::fs::create_dir_all(&output_dir)?;
            let background =
                HistogramFile::read_histogram(&background, pipeline::histogram_name(new))?;
            let options = SignificanceOptions {
                new,
                output_dir,
                min_bin,
                plot,
            };
            for signal in signals.iter().progress() {
                pipeline::significance_step(signal, &background, &options, &space)
                    .with_context(|| format!("processing {}", signal.display()))?;
            }
        }
        Some(Commands::StatUnc { inputs, new, plot }) => {
            for input in inputs.iter().progress() {
                pipeline::stat_unc_step(input, new, plot, &space)
                    .with_context(|| format!("processing {}", input.display()))?;
            }
        }
        Some(Commands::Highest {
            significance,
            uncertainty,
            new,
            tagger,
            output_dir,
            plot,
        }) => {
            std::fs::create_dir_all(&output_dir)?;
            pipeline::highest_step(&significance, &uncertainty, new, tagger, &output_dir, plot)?;
        }
        Some(Commands::Merge {
            input_dir,
            signals,
            backgrounds,
            data,
            histograms,
            output,
        }) => {
            let spec = MergeSpec {
                input_dir,
                signals,
                backgrounds,
                data,
                histograms,
            };
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            merge::merge(&spec).write(&output)?;
            tracing::info!(path = %output.display(), "output file");
        }
        Some(Commands::Limits {
            input_dir,
            output_dir,
            templates,
            labels,
            unavailable,
            plot,
        }) => {
            pipeline::limits_step(&LimitOptions {
                input_dir,
                output_dir,
                templates,
                labels,
                unavailable,
                plot,
            })?;
        }
        None => Cli::command().print_help()?,
    }
    Ok(())
}
