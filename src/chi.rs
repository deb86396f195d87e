use crate::errors::ChiMergeError;

/// Chi-square test of independence over class-frequency vectors.
///
/// Stateless apart from the configured expected-frequency floor: an
/// expected cell that falls below the floor is clamped up to it, so a
/// single near-zero expected count cannot dominate the score.
#[derive(Debug, Clone)]
pub struct ChiSquareTest {
    expected_freq_floor: f64,
}

impl ChiSquareTest {
    pub fn new(expected_freq_floor: f64) -> Self {
        ChiSquareTest {
            expected_freq_floor,
        }
    }

    /// Score how much the class distributions of `events` deviate from the
    /// counts expected if event and class were independent.
    ///
    /// Each slice in `events` is one event (here, one interval); entry `c`
    /// is the observed count for class `c`. Fewer than two events, or
    /// events of unequal length, are rejected. Higher scores mean the
    /// distributions are more distinguishable; zero means they match the
    /// independence expectation exactly.
    pub fn test(&self, events: &[&[u64]]) -> Result<f64, ChiMergeError> {
        if events.len() < 2 {
            return Err(ChiMergeError::TooFewEvents(events.len()));
        }
        let n_classes = events[0].len();
        if events.iter().any(|e| e.len() != n_classes) {
            return Err(ChiMergeError::UnevenEventLengths);
        }

        let event_totals: Vec<u64> = events.iter().map(|e| e.iter().sum()).collect();
        let mut class_totals = vec![0_u64; n_classes];
        for event in events {
            for (total, freq) in class_totals.iter_mut().zip(*event) {
                *total += freq;
            }
        }
        let grand_total: u64 = event_totals.iter().sum();
        if grand_total == 0 {
            return Err(ChiMergeError::DegenerateFrequencies);
        }

        let mut score = 0.0;
        for (event, event_total) in events.iter().zip(&event_totals) {
            for (observed, class_total) in event.iter().zip(&class_totals) {
                let mut expected = *event_total as f64 * *class_total as f64 / grand_total as f64;
                if expected == 0.0 {
                    // No event/class overlap possible, the cell cannot deviate.
                    continue;
                }
                if expected < self.expected_freq_floor {
                    expected = self.expected_freq_floor;
                }
                score += (*observed as f64 - expected).powi(2) / expected;
            }
        }
        Ok(score)
    }
}
