//! Per-combination tallies under the two labeling schemes, and the histograms
//! filled from them.
//!
//! The schemes differ in their error model. [`Standard`] fills one entry per
//! event, so a bin's error is `sqrt(sum w^2)`. [`Optimized`] only keeps the
//! count and mean weight of the matching events and replays `count` fills of
//! the mean, so a bin's error is `sqrt(count) * mean_weight`.

use rayon::prelude::*;

use crate::classify::Event;
use crate::combination::CombinationSpace;
use crate::histogram::Histogram;

pub trait AggregationScheme {
    type Tally;
    /// Name of the histogram this scheme fills.
    const HISTOGRAM: &'static str;
    const TITLE: &'static str;

    fn tally(&self, space: &CombinationSpace, events: &[Event]) -> Self::Tally;
    fn fill(&self, space: &CombinationSpace, tally: &Self::Tally) -> Histogram;

    fn aggregate(&self, space: &CombinationSpace, events: &[Event]) -> (Self::Tally, Histogram) {
        let tally = self.tally(space, events);
        let histogram = self.fill(space, &tally);
        (tally, histogram)
    }
}

/// One label per event, taken from the event's raw working points.
pub struct Standard;

/// Inclusive per-combination efficiency from the pass/fail flags.
pub struct Optimized;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabeledEvents {
    pub labels: Vec<usize>,
    pub weights: Vec<f64>,
    /// No event matched and the lists hold the single `(0, 0.0)` placeholder.
    pub placeholder: bool,
}

impl LabeledEvents {
    /// Number of matched events; 0 when only the placeholder is held.
    pub fn matched(&self) -> usize {
        if self.placeholder {
            0
        } else {
            self.labels.len()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OptimizedBin {
    pub count: u64,
    pub mean_weight: f64,
}

impl AggregationScheme for Standard {
    type Tally = LabeledEvents;
    const HISTOGRAM: &'static str = "hist_wp_combinations";
    const TITLE: &'static str = "Combination WP of 4 Jets";

    fn tally(&self, space: &CombinationSpace, events: &[Event]) -> LabeledEvents {
        let (labels, weights): (Vec<usize>, Vec<f64>) = events
            .iter()
            .filter_map(|event| event.standard_label(space).map(|label| (label, event.weight)))
            .unzip();
        if labels.is_empty() {
            LabeledEvents {
                labels: vec![0],
                weights: vec![0.0],
                placeholder: true,
            }
        } else {
            LabeledEvents {
                labels,
                weights,
                placeholder: false,
            }
        }
    }
    fn fill(&self, space: &CombinationSpace, tally: &LabeledEvents) -> Histogram {
        let mut hist = Histogram::for_combinations(Self::HISTOGRAM, Self::TITLE, space);
        for (&label, &weight) in tally.labels.iter().zip(&tally.weights) {
            hist.fill(label as f64, weight);
        }
        hist
    }
}

impl AggregationScheme for Optimized {
    /// One bin per combination, in label order.
    type Tally = Vec<OptimizedBin>;
    const HISTOGRAM: &'static str = "hist_wp_combinations_new";
    const TITLE: &'static str = "New Combination WP of 4 Jets";

    fn tally(&self, space: &CombinationSpace, events: &[Event]) -> Vec<OptimizedBin> {
        space
            .combinations()
            .par_iter()
            .map(|combination| {
                let (count, sum_weight) = events
                    .iter()
                    .filter(|event| event.satisfies(combination))
                    .fold((0u64, 0.0), |(n, sum), event| (n + 1, sum + event.weight));
                let mean_weight = if count == 0 {
                    0.0
                } else {
                    sum_weight / count as f64
                };
                OptimizedBin { count, mean_weight }
            })
            .collect()
    }
    fn fill(&self, space: &CombinationSpace, tally: &Vec<OptimizedBin>) -> Histogram {
        let mut hist = Histogram::for_combinations(Self::HISTOGRAM, Self::TITLE, space);
        for ((label, _), bin) in space.iter().zip(tally) {
            for _ in 0..bin.count {
                hist.fill(label as f64, bin.mean_weight);
            }
        }
        hist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::tests::tagged_event;
    use crate::combination::Combination;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_events(n: usize, seed: u64) -> Vec<Event> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let mut levels: [u8; 4] = std::array::from_fn(|_| rng.gen_range(0..6));
                if rng.gen_bool(0.8) {
                    levels.sort_unstable_by(|a, b| b.cmp(a));
                }
                tagged_event(levels, rng.gen_range(0.1..2.0))
            })
            .collect()
    }

    #[test]
    fn standard_conserves_matched_weight() {
        let space = CombinationSpace::generate(6, &[0]);
        let events = random_events(500, 7);
        let (tally, hist) = Standard.aggregate(&space, &events);
        let matched: f64 = events
            .iter()
            .filter(|e| e.standard_label(&space).is_some())
            .map(|e| e.weight)
            .sum();
        assert!(!tally.placeholder);
        assert_eq!(tally.labels.len(), tally.weights.len());
        assert_relative_eq!(hist.integral(), matched, epsilon = 1e-9);
        assert_relative_eq!(tally.weights.iter().sum::<f64>(), matched, epsilon = 1e-9);
        assert_eq!(hist.underflow, 0.0);
        assert_eq!(hist.overflow, 0.0);
    }

    #[test]
    fn standard_error_is_sqrt_sumw2() {
        let space = CombinationSpace::generate(6, &[0]);
        let events = vec![
            tagged_event([3, 3, 2, 1], 1.0),
            tagged_event([3, 3, 2, 1], 3.0),
            tagged_event([3, 3, 2, 0], 5.0),
        ];
        let (tally, hist) = Standard.aggregate(&space, &events);
        assert_eq!(tally.labels, vec![11, 11]);
        assert_eq!(tally.matched(), 2);
        assert_relative_eq!(hist.bin_content[10], 4.0);
        assert_relative_eq!(hist.bin_error(10), 10f64.sqrt());
    }

    #[test]
    fn standard_placeholder_when_nothing_matches() {
        let space = CombinationSpace::generate(6, &[0]);
        let events = vec![tagged_event([0, 0, 0, 0], 1.0)];
        let (tally, hist) = Standard.aggregate(&space, &events);
        assert!(tally.placeholder);
        assert_eq!(tally.labels, vec![0]);
        assert_eq!(tally.weights, vec![0.0]);
        assert_eq!(tally.matched(), 0);
        assert_eq!(hist.integral(), 0.0);
        assert_eq!(hist.entries, 1.0);
    }

    #[test]
    fn optimized_mean_weight_and_error() {
        let space = CombinationSpace::generate(6, &[0]);
        let events = vec![
            tagged_event([3, 3, 2, 1], 1.0),
            tagged_event([3, 3, 3, 3], 2.0),
            tagged_event([1, 1, 1, 1], 6.0),
        ];
        let (tally, hist) = Optimized.aggregate(&space, &events);
        assert_eq!(tally.len(), space.len());

        // every event passes (1,1,1,1)
        assert_eq!(tally[0].count, 3);
        assert_relative_eq!(tally[0].mean_weight, 3.0);
        assert_relative_eq!(hist.bin_content[0], 9.0, epsilon = 1e-12);
        assert_relative_eq!(hist.bin_error(0), 3f64.sqrt() * 3.0, epsilon = 1e-12);

        let label = space.label(&Combination([3, 3, 2, 1])).unwrap();
        assert_eq!(tally[label - 1].count, 2);
        assert_relative_eq!(tally[label - 1].mean_weight, 1.5);

        let label = space.label(&Combination([5, 5, 5, 5])).unwrap();
        assert_eq!(tally[label - 1], OptimizedBin::default());
        assert_eq!(hist.bin_content[label - 1], 0.0);
    }

    #[test]
    fn optimized_matches_independent_scan() {
        let space = CombinationSpace::generate(6, &[0]);
        let events = random_events(300, 11);
        let tally = Optimized.tally(&space, &events);
        for (combination, bin) in space.combinations().iter().zip(&tally) {
            let matching: Vec<f64> = events
                .iter()
                .filter(|e| e.satisfies(combination))
                .map(|e| e.weight)
                .collect();
            assert_eq!(bin.count as usize, matching.len());
            if matching.is_empty() {
                assert_eq!(bin.mean_weight, 0.0);
            } else {
                let mean = matching.iter().sum::<f64>() / matching.len() as f64;
                assert_relative_eq!(bin.mean_weight, mean, epsilon = 1e-12);
            }
        }
    }
}
