use std::cmp::Ordering;
use std::fmt;

use tracing::{debug, info};

use crate::chi::ChiSquareTest;
use crate::dataset::Dataset;
use crate::errors::ChiMergeError;
use crate::utils::nan_safe_compare;

/// Tuning parameters for one ChiMerge run.
///
/// Construct via [`ChiMergeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter                 | Default |
/// |---------------------------|---------|
/// | `max_interval`            | 6       |
/// | `chi_threshold`           | 4.61    |
/// | `expected_freq_threshold` | 0.5     |
/// | `batch_merge`             | false   |
#[derive(Debug, Clone)]
pub struct ChiMergeConfig {
    pub(crate) max_interval: usize,
    pub(crate) chi_threshold: f64,
    pub(crate) expected_freq_threshold: f64,
    pub(crate) batch_merge: bool,
}

impl Default for ChiMergeConfig {
    fn default() -> Self {
        ChiMergeConfig {
            max_interval: 6,
            chi_threshold: 4.61,
            expected_freq_threshold: 0.5,
            batch_merge: false,
        }
    }
}

impl ChiMergeConfig {
    pub fn new() -> Self {
        ChiMergeConfig::default()
    }

    /// Interval count below which merging stops.
    pub fn with_max_interval(mut self, max_interval: usize) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Chi-square score above which adjacent intervals are considered
    /// distinguishable enough not to merge.
    pub fn with_chi_threshold(mut self, chi_threshold: f64) -> Self {
        self.chi_threshold = chi_threshold;
        self
    }

    /// Floor applied to expected-frequency cells in the chi-square test.
    pub fn with_expected_freq_threshold(mut self, expected_freq_threshold: f64) -> Self {
        self.expected_freq_threshold = expected_freq_threshold;
        self
    }

    /// Merge every pair tied at the minimal score within one round instead
    /// of only the first found.
    pub fn with_batch_merge(mut self, batch_merge: bool) -> Self {
        self.batch_merge = batch_merge;
        self
    }
}

/// A contiguous bucket of attribute values with per-class observation
/// counts. `min` is the representative boundary used for ordering and
/// reporting; `class_frequencies[i]` counts examples of class `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
    pub class_frequencies: Vec<u64>,
}

impl Interval {
    fn seed(value: f64, class_index: usize, n_classes: usize) -> Self {
        let mut class_frequencies = vec![0; n_classes];
        class_frequencies[class_index] = 1;
        Interval {
            min: value,
            max: value,
            class_frequencies,
        }
    }

    // Fold `other` into this interval: widen the bounds, sum the counts.
    fn absorb(&mut self, other: &Interval) {
        if nan_safe_compare(&other.min, &self.min) == Ordering::Less {
            self.min = other.min;
        }
        if nan_safe_compare(&other.max, &self.max) == Ordering::Greater {
            self.max = other.max;
        }
        for (freq, extra) in self.class_frequencies.iter_mut().zip(&other.class_frequencies) {
            *freq += extra;
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let freqs: Vec<String> = self
            .class_frequencies
            .iter()
            .map(|c| c.to_string())
            .collect();
        write!(f, "[{}..{}] ({})", self.min, self.max, freqs.join(", "))
    }
}

/// Cached chi-square score for one adjacent interval pair.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ChiEntry {
    /// A neighbor changed since the score was computed; recompute before use.
    Stale,
    Computed(f64),
}

impl ChiEntry {
    fn computed(self) -> Option<f64> {
        match self {
            ChiEntry::Computed(score) => Some(score),
            ChiEntry::Stale => None,
        }
    }
}

enum RoundOutcome {
    Merged(usize),
    Halted,
}

/// Ordered interval sequence plus the chi cache driving the merge loop.
///
/// `chi[i]` scores the adjacent pair `(intervals[i], intervals[i + 1])`;
/// after every mutation `chi.len() == intervals.len() - 1` holds.
#[derive(Debug)]
pub struct IntervalTable {
    intervals: Vec<Interval>,
    chi: Vec<ChiEntry>,
    config: ChiMergeConfig,
    tester: ChiSquareTest,
    rounds: usize,
}

impl IntervalTable {
    /// Build the finest-grained partition of `column`: one interval per
    /// distinct attribute value, sorted ascending.
    pub fn new(
        dataset: &Dataset,
        column: usize,
        config: ChiMergeConfig,
    ) -> Result<Self, ChiMergeError> {
        let n_attributes = dataset.n_attributes();
        if column >= n_attributes {
            return Err(ChiMergeError::ColumnOutOfRange {
                column,
                n_attributes,
            });
        }
        // Datasets built via `push` may be ragged; reject any tuple too
        // short for the selected column before bucketing indexes into it.
        for (values, _) in dataset.tuples() {
            if column >= values.len() {
                return Err(ChiMergeError::ColumnOutOfRange {
                    column,
                    n_attributes: values.len(),
                });
            }
        }
        let tester = ChiSquareTest::new(config.expected_freq_threshold);
        let intervals = sort_data(dataset, column);
        let chi = vec![ChiEntry::Stale; intervals.len().saturating_sub(1)];
        Ok(IntervalTable {
            intervals,
            chi,
            config,
            tester,
            rounds: 0,
        })
    }

    /// Run merge rounds until a stopping criterion halts the loop: either
    /// the interval count has fallen below `max_interval`, or the lowest
    /// pairwise score exceeds `chi_threshold`.
    pub fn chimerge(&mut self) -> Result<(), ChiMergeError> {
        loop {
            self.rounds += 1;
            match self.round()? {
                RoundOutcome::Merged(merges) => {
                    debug!(
                        round = self.rounds,
                        merges,
                        intervals = self.intervals.len(),
                        "merge round complete"
                    );
                }
                RoundOutcome::Halted => break,
            }
        }
        info!(
            rounds = self.rounds,
            intervals = self.intervals.len(),
            "chimerge halted"
        );
        Ok(())
    }

    // One merge round: refresh the cache, check the stopping criteria, then
    // merge the minimal pair (every minimal pair under batch_merge).
    fn round(&mut self) -> Result<RoundOutcome, ChiMergeError> {
        self.populate_chi()?;
        // Interval-count check first, then the threshold on the minimal
        // score. Both boundaries are strict: a table sitting exactly at
        // max_interval still merges once more.
        if self.intervals.len() < self.config.max_interval {
            return Ok(RoundOutcome::Halted);
        }
        let lowest = match self.lowest_chi() {
            Some(score) => score,
            None => return Ok(RoundOutcome::Halted),
        };
        if lowest > self.config.chi_threshold {
            return Ok(RoundOutcome::Halted);
        }
        let merges = self.merge_by_chi(lowest)?;
        Ok(RoundOutcome::Merged(merges))
    }

    // Compute scores for every slot invalidated since the last round. Only
    // the merge point's neighbors go stale, so each round costs the number
    // of unknown pairs rather than the full interval count.
    fn populate_chi(&mut self) -> Result<(), ChiMergeError> {
        for index in 0..self.chi.len() {
            if let ChiEntry::Stale = self.chi[index] {
                let score = self.tester.test(&[
                    &self.intervals[index].class_frequencies,
                    &self.intervals[index + 1].class_frequencies,
                ])?;
                self.chi[index] = ChiEntry::Computed(score);
            }
        }
        Ok(())
    }

    fn lowest_chi(&self) -> Option<f64> {
        self.chi
            .iter()
            .filter_map(|entry| entry.computed())
            .min_by(|a, b| a.total_cmp(b))
    }

    // Merge every cached pair scoring exactly `score` when batch merging,
    // otherwise only the first found. Returns the number of merges.
    fn merge_by_chi(&mut self, score: f64) -> Result<usize, ChiMergeError> {
        let mut merges = 0;
        while let Some(index) = self
            .chi
            .iter()
            .position(|entry| *entry == ChiEntry::Computed(score))
        {
            debug!(
                interval = %self.intervals[index],
                next = %self.intervals[index + 1],
                chi = score,
                "merging adjacent pair"
            );
            self.merge(index)?;
            merges += 1;
            if !self.config.batch_merge {
                break;
            }
        }
        Ok(merges)
    }

    // Fuse `index` and `index + 1`, then patch the chi cache around the
    // merge point: the neighboring slots go stale, the merged pair's own
    // slot is removed.
    fn merge(&mut self, index: usize) -> Result<(), ChiMergeError> {
        let next = self.intervals.remove(index + 1);
        self.intervals[index].absorb(&next);
        if index > 0 {
            self.chi[index - 1] = ChiEntry::Stale;
        }
        if index + 1 < self.chi.len() {
            self.chi[index + 1] = ChiEntry::Stale;
        }
        self.chi.remove(index);
        if self.chi.len() != self.intervals.len() - 1 {
            return Err(ChiMergeError::CacheDesync {
                chi_len: self.chi.len(),
                interval_len: self.intervals.len(),
            });
        }
        Ok(())
    }

    /// Final ordered intervals.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Cached adjacent-pair scores; `None` marks a slot invalidated by a
    /// neighboring merge and not yet recomputed.
    pub fn chi_values(&self) -> Vec<Option<f64>> {
        self.chi.iter().map(|entry| entry.computed()).collect()
    }

    /// Lower boundaries of the intervals, ascending.
    pub fn boundaries(&self) -> Vec<f64> {
        self.intervals.iter().map(|interval| interval.min).collect()
    }

    /// Rounds elapsed, counting the final round that only checked the
    /// stopping criteria.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    #[cfg(test)]
    fn class_totals(&self) -> Vec<u64> {
        let n_classes = self
            .intervals
            .first()
            .map(|i| i.class_frequencies.len())
            .unwrap_or(0);
        let mut totals = vec![0; n_classes];
        for interval in &self.intervals {
            for (total, freq) in totals.iter_mut().zip(&interval.class_frequencies) {
                *total += freq;
            }
        }
        totals
    }
}

// Bucket tuples by exact attribute value, incrementing the class count at
// the dataset's first-seen class index.
fn sort_data(dataset: &Dataset, column: usize) -> Vec<Interval> {
    let n_classes = dataset.n_classes();
    let mut intervals: Vec<Interval> = Vec::new();
    for (values, class_index) in dataset.tuples() {
        let value = values[column];
        let existing = intervals
            .iter_mut()
            .find(|interval| nan_safe_compare(&interval.min, &value) == Ordering::Equal);
        match existing {
            Some(interval) => interval.class_frequencies[*class_index] += 1,
            None => intervals.push(Interval::seed(value, *class_index, n_classes)),
        }
    }
    intervals.sort_by(|a, b| nan_safe_compare(&a.min, &b.min));
    intervals
}

#[cfg(test)]
mod test {
    use super::*;

    // One tuple per (value, label) pair, single attribute column.
    fn dataset_of(pairs: &[(f64, &str)]) -> Dataset {
        let mut dataset = Dataset::new();
        for (value, label) in pairs {
            dataset.push(vec![*value], label);
        }
        dataset
    }

    // `counts[k]` examples of class k at `value`, classes named "c0"...
    fn push_counts(dataset: &mut Dataset, value: f64, counts: &[u64]) {
        for (class, count) in counts.iter().enumerate() {
            for _ in 0..*count {
                dataset.push(vec![value], &format!("c{}", class));
            }
        }
    }

    #[test]
    fn test_sort_data_groups_and_sorts() {
        let dataset = dataset_of(&[(2.0, "a"), (1.0, "b"), (2.0, "a"), (3.0, "b"), (2.0, "b")]);
        let table = IntervalTable::new(&dataset, 0, ChiMergeConfig::default()).unwrap();
        assert_eq!(table.boundaries(), vec![1.0, 2.0, 3.0]);
        assert_eq!(table.intervals()[0].class_frequencies, vec![0, 1]);
        assert_eq!(table.intervals()[1].class_frequencies, vec![2, 1]);
        assert_eq!(table.intervals()[2].class_frequencies, vec![0, 1]);
        // Construction leaves the whole cache stale.
        assert_eq!(table.chi_values(), vec![None, None]);
    }

    #[test]
    fn test_column_out_of_range() {
        let dataset = dataset_of(&[(1.0, "a")]);
        let result = IntervalTable::new(&dataset, 3, ChiMergeConfig::default());
        assert!(matches!(
            result,
            Err(ChiMergeError::ColumnOutOfRange {
                column: 3,
                n_attributes: 1
            })
        ));
    }

    #[test]
    fn test_ragged_dataset_rejected_before_bucketing() {
        // A pushed short row must surface as an error, not an index panic
        // when bucketing reads the selected column.
        let mut dataset = Dataset::new();
        dataset.push(vec![1.0, 2.0], "a");
        dataset.push(vec![3.0], "b");
        let result = dataset.discretize_by_chi(1, ChiMergeConfig::default());
        assert!(matches!(
            result,
            Err(ChiMergeError::ColumnOutOfRange {
                column: 1,
                n_attributes: 1
            })
        ));
    }

    #[test]
    fn test_halts_on_interval_count() {
        // Six intervals with identical class distributions: every pair
        // scores 0. At exactly max_interval the count check does not fire,
        // so one more merge happens before the next round halts.
        let mut dataset = Dataset::new();
        for value in 1..=6 {
            push_counts(&mut dataset, value as f64, &[5, 5]);
        }
        let mut table = IntervalTable::new(
            &dataset,
            0,
            ChiMergeConfig::new().with_max_interval(6),
        )
        .unwrap();
        assert_eq!(table.intervals().len(), 6);
        table.chimerge().unwrap();
        assert_eq!(table.intervals().len(), 5);
        assert_eq!(table.rounds(), 2);
    }

    #[test]
    fn test_halts_on_chi_threshold() {
        // Alternating pure intervals score 20.0 per pair, above the default
        // threshold, so no merge happens even with room to shrink.
        let mut dataset = Dataset::new();
        push_counts(&mut dataset, 1.0, &[10, 0]);
        push_counts(&mut dataset, 2.0, &[0, 10]);
        push_counts(&mut dataset, 3.0, &[10, 0]);
        let mut table = IntervalTable::new(
            &dataset,
            0,
            ChiMergeConfig::new().with_max_interval(2),
        )
        .unwrap();
        table.chimerge().unwrap();
        assert_eq!(table.intervals().len(), 3);
        assert_eq!(table.rounds(), 1);
        assert_eq!(table.chi_values(), vec![Some(20.0), Some(20.0)]);
    }

    #[test]
    fn test_batch_merge_collapses_all_ties_in_one_round() {
        let mut dataset = Dataset::new();
        for value in 1..=4 {
            push_counts(&mut dataset, value as f64, &[5, 5]);
        }
        let mut table = IntervalTable::new(
            &dataset,
            0,
            ChiMergeConfig::new()
                .with_max_interval(2)
                .with_batch_merge(true),
        )
        .unwrap();
        let outcome = table.round().unwrap();
        assert!(matches!(outcome, RoundOutcome::Merged(2)));
        assert_eq!(table.intervals().len(), 2);
    }

    #[test]
    fn test_single_merge_per_round_without_batch() {
        let mut dataset = Dataset::new();
        for value in 1..=4 {
            push_counts(&mut dataset, value as f64, &[5, 5]);
        }
        let mut table = IntervalTable::new(
            &dataset,
            0,
            ChiMergeConfig::new().with_max_interval(2),
        )
        .unwrap();
        let outcome = table.round().unwrap();
        assert!(matches!(outcome, RoundOutcome::Merged(1)));
        assert_eq!(table.intervals().len(), 3);
    }

    #[test]
    fn test_merge_patches_cache_and_bounds() {
        let mut dataset = Dataset::new();
        push_counts(&mut dataset, 1.0, &[1, 0]);
        push_counts(&mut dataset, 2.0, &[2, 1]);
        push_counts(&mut dataset, 3.0, &[0, 3]);
        push_counts(&mut dataset, 4.0, &[1, 1]);
        let mut table = IntervalTable::new(&dataset, 0, ChiMergeConfig::default()).unwrap();
        table.populate_chi().unwrap();
        table.merge(1).unwrap();

        assert_eq!(table.intervals().len(), 3);
        assert_eq!(table.chi.len(), 2);
        // Both slots touching the merged interval went stale.
        assert_eq!(table.chi_values(), vec![None, None]);
        let merged = &table.intervals()[1];
        assert_eq!(merged.min, 2.0);
        assert_eq!(merged.max, 3.0);
        assert_eq!(merged.class_frequencies, vec![2, 4]);
    }

    #[test]
    fn test_merge_detects_cache_desync() {
        let mut dataset = Dataset::new();
        push_counts(&mut dataset, 1.0, &[1, 1]);
        push_counts(&mut dataset, 2.0, &[1, 1]);
        push_counts(&mut dataset, 3.0, &[1, 1]);
        let mut table = IntervalTable::new(&dataset, 0, ChiMergeConfig::default()).unwrap();
        // Corrupt the cache so the post-merge length check must fire.
        table.chi.pop();
        let result = table.merge(0);
        assert!(matches!(result, Err(ChiMergeError::CacheDesync { .. })));
    }

    #[test]
    fn test_frequency_conservation_and_termination() {
        // A larger table with mixed distributions; the loop must halt and
        // merging must neither create nor lose observations.
        let mut dataset = Dataset::new();
        for i in 0..40 {
            let counts = match i % 4 {
                0 => [3, 1, 0],
                1 => [2, 2, 1],
                2 => [0, 4, 2],
                _ => [1, 0, 5],
            };
            push_counts(&mut dataset, i as f64 / 2.0, &counts);
        }
        let mut table = IntervalTable::new(&dataset, 0, ChiMergeConfig::default()).unwrap();
        let initial = table.intervals().len();
        let totals_before = table.class_totals();

        table.chimerge().unwrap();

        assert!(table.intervals().len() <= initial);
        assert_eq!(table.class_totals(), totals_before);
        assert_eq!(table.chi.len(), table.intervals().len() - 1);
        // Ascending boundary order survives merging.
        let bounds = table.boundaries();
        assert!(bounds.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_discretize_by_chi_entry_point() {
        let mut dataset = Dataset::new();
        for value in 1..=10 {
            let counts = if value <= 5 { [4, 1] } else { [1, 4] };
            push_counts(&mut dataset, value as f64, &counts);
        }
        let table = dataset
            .discretize_by_chi(0, ChiMergeConfig::default())
            .unwrap();
        // Identical distributions on each side of 5.5 collapse; the loop
        // stops once fewer than max_interval intervals remain.
        assert!(table.intervals().len() < 6);
        assert_eq!(table.class_totals(), vec![25, 25]);
    }

    #[test]
    fn test_interval_display() {
        let interval = Interval {
            min: 1.5,
            max: 3.0,
            class_frequencies: vec![4, 0, 2],
        };
        assert_eq!(interval.to_string(), "[1.5..3] (4, 0, 2)");
    }
}
