//! Per-event classification into working-point combinations.

use crate::combination::{Combination, CombinationSpace, N_JETS};

/// b-tag threshold classes, loosest first. Working-point level `n >= 1` is class `n - 1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThresholdClass {
    L,
    M,
    T,
    XT,
    XXT,
}

impl ThresholdClass {
    pub const COUNT: usize = 5;
    pub const ALL: [ThresholdClass; ThresholdClass::COUNT] = [
        ThresholdClass::L,
        ThresholdClass::M,
        ThresholdClass::T,
        ThresholdClass::XT,
        ThresholdClass::XXT,
    ];
    pub fn suffix(&self) -> &'static str {
        match self {
            ThresholdClass::L => "L",
            ThresholdClass::M => "M",
            ThresholdClass::T => "T",
            ThresholdClass::XT => "XT",
            ThresholdClass::XXT => "XXT",
        }
    }
    pub fn from_level(level: u8) -> Option<Self> {
        usize::from(level)
            .checked_sub(1)
            .and_then(|idx| Self::ALL.get(idx).copied())
    }
    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Event {
    /// Raw working-point value per jet, as stored in the input.
    pub working_points: [f64; N_JETS],
    /// Pass/fail decision, indexed `[class][jet]`.
    pub pass: [[bool; N_JETS]; ThresholdClass::COUNT],
    pub weight: f64,
}

impl Event {
    /// Combination spelled by the raw working points (standard labeling).
    ///
    /// `None` when a value is not a working-point level at all; whether the
    /// tuple is a *valid* combination is decided by the space.
    pub fn raw_combination(&self) -> Option<Combination> {
        let mut levels = [0u8; N_JETS];
        for (level, &wp) in levels.iter_mut().zip(&self.working_points) {
            if wp.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&wp) {
                return None;
            }
            *level = wp as u8;
        }
        Some(Combination(levels))
    }
    /// Standard labeling: label of the raw combination, if it is in the space.
    pub fn standard_label(&self, space: &CombinationSpace) -> Option<usize> {
        self.raw_combination()
            .and_then(|combination| space.label(&combination))
    }
    /// Optimized labeling: every jet passes the class its position requires.
    pub fn satisfies(&self, combination: &Combination) -> bool {
        combination
            .levels()
            .iter()
            .enumerate()
            .all(|(jet, &level)| match level {
                0 => true,
                _ => ThresholdClass::from_level(level)
                    .is_some_and(|class| self.pass[class.index()][jet]),
            })
    }
}
