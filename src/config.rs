//! Analysis configuration: working-point space, taggers and input column names.

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::classify::ThresholdClass;
use crate::combination::{CombinationSpace, N_JETS};
use crate::{Error, Result};

/// b-tagging algorithm whose working points are read.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Tagger {
    #[serde(rename = "PNetB")]
    #[value(name = "PNetB")]
    PNetB,
    #[serde(rename = "RobustParTAK4B")]
    #[value(name = "RobustParTAK4B")]
    RobustParTAK4B,
}

impl Tagger {
    pub fn name(&self) -> &'static str {
        match self {
            Tagger::PNetB => "PNetB",
            Tagger::RobustParTAK4B => "RobustParTAK4B",
        }
    }
}

impl fmt::Display for Tagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column-name templates for the event table.
///
/// Placeholders: `{tagger}`, `{jet}` (1-based jet index) and `{wp}` (threshold
/// class suffix, `L` .. `XXT`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnTemplates {
    pub working_point: String,
    pub pass: String,
    pub weight: String,
}

impl Default for ColumnTemplates {
    fn default() -> Self {
        Self {
            working_point: "jetAK4_btag_{tagger}_WP_{jet}".into(),
            pass: "b_tag_{tagger}_pass_{jet}_{wp}".into(),
            weight: "Weight".into(),
        }
    }
}

/// Concrete column names for one tagger.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnLayout {
    pub working_point: [String; N_JETS],
    /// Indexed `[class][jet]`.
    pub pass: [[String; N_JETS]; ThresholdClass::COUNT],
    pub weight: String,
}

impl ColumnLayout {
    /// Every column the layout needs, in validation order.
    pub fn required(&self) -> impl Iterator<Item = &str> + '_ {
        self.working_point
            .iter()
            .chain(self.pass.iter().flatten())
            .chain(std::iter::once(&self.weight))
            .map(String::as_str)
    }
}

impl ColumnTemplates {
    pub fn layout(&self, tagger: Tagger) -> ColumnLayout {
        let expand = |template: &str, jet: usize, class: Option<ThresholdClass>| {
            template
                .replace("{tagger}", tagger.name())
                .replace("{jet}", &(jet + 1).to_string())
                .replace("{wp}", class.map_or("", |c| c.suffix()))
        };
        ColumnLayout {
            working_point: std::array::from_fn(|jet| expand(&self.working_point, jet, None)),
            pass: std::array::from_fn(|class| {
                std::array::from_fn(|jet| {
                    expand(&self.pass, jet, Some(ThresholdClass::ALL[class]))
                })
            }),
            weight: self.weight.replace("{tagger}", tagger.name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of working-point levels, including level 0 (fails loose).
    pub nwp: u8,
    /// Levels no combination may contain.
    pub rejected: Vec<u8>,
    pub taggers: Vec<Tagger>,
    pub columns: ColumnTemplates,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            nwp: 6,
            rejected: vec![0],
            taggers: vec![Tagger::PNetB, Tagger::RobustParTAK4B],
            columns: ColumnTemplates::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<()> {
        let max_nwp = ThresholdClass::COUNT + 1;
        if usize::from(self.nwp) > max_nwp {
            return Err(Error::Config(format!(
                "nwp = {} exceeds the {} available threshold classes (max nwp = {})",
                self.nwp,
                ThresholdClass::COUNT,
                max_nwp
            )));
        }
        if self.taggers.is_empty() {
            return Err(Error::Config("no taggers configured".into()));
        }
        Ok(())
    }
    pub fn space(&self) -> CombinationSpace {
        CombinationSpace::generate(self.nwp, &self.rejected)
    }
}
