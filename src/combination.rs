//! Working-point combinations of the four leading jets and their bin labels.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

/// Number of jets a combination constrains.
pub const N_JETS: usize = 4;

/// Required working-point level per jet, non-increasing from the leading jet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Combination(pub [u8; N_JETS]);

impl Combination {
    pub fn levels(&self) -> [u8; N_JETS] {
        self.0
    }
    /// Member of the analysis subset: no jet more than one level below the leading one.
    pub fn is_selected(&self) -> bool {
        let [wp1, wp2, wp3, wp4] = self.0.map(i16::from);
        wp1 - wp2 <= 1 && wp1 - wp3 <= 1 && wp1 - wp4 <= 1
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "[{}, {}, {}, {}]", a, b, c, d)
    }
}

/// The ordered set of valid combinations. Label `n` is the `n`-th combination (1-based).
///
/// Every step of the pipeline regenerates this from the same `(nwp, rejected)`
/// pair; bin numbers in different output files only line up because the
/// generation order never changes.
#[derive(Clone, Debug)]
pub struct CombinationSpace {
    combinations: Vec<Combination>,
    labels: HashMap<Combination, usize>,
}

impl CombinationSpace {
    pub fn generate(nwp: u8, rejected: &[u8]) -> Self {
        let allowed: Vec<u8> = (0..nwp).filter(|wp| !rejected.contains(wp)).collect();
        let mut combinations = Vec::new();
        for &i in &allowed {
            for &j in allowed.iter().filter(|&&j| j <= i) {
                for &k in allowed.iter().filter(|&&k| k <= j) {
                    for &m in allowed.iter().filter(|&&m| m <= k) {
                        combinations.push(Combination([i, j, k, m]));
                    }
                }
            }
        }
        let labels = combinations
            .iter()
            .enumerate()
            .map(|(idx, combination)| (*combination, idx + 1))
            .collect();
        Self {
            combinations,
            labels,
        }
    }
    pub fn len(&self) -> usize {
        self.combinations.len()
    }
    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }
    pub fn label(&self, combination: &Combination) -> Option<usize> {
        self.labels.get(combination).copied()
    }
    pub fn get(&self, label: usize) -> Option<&Combination> {
        label
            .checked_sub(1)
            .and_then(|idx| self.combinations.get(idx))
    }
    /// `(label, combination)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Combination)> + '_ {
        self.combinations
            .iter()
            .enumerate()
            .map(|(idx, combination)| (idx + 1, combination))
    }
    pub fn selected_labels(&self) -> Vec<usize> {
        self.iter()
            .filter(|(_, combination)| combination.is_selected())
            .map(|(label, _)| label)
            .collect()
    }
}
