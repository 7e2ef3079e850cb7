// SPDX-License-Identifier: MIT
/// Hybrid change thresholds.
///
/// `abs` catches large swings at low brightness, where a relative test is too
/// permissive; `rel` catches proportional swings at high brightness. `epsilon`
/// floors the baseline in the relative test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub abs: f64,
    pub rel: f64,
    pub epsilon: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            abs: 8.0,
            rel: 0.1,
            epsilon: 1e-6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    NoChange,
    Changed,
}

/// Compares a window average with the previous one.
///
/// Missing data on either side is never a change.
#[must_use]
pub fn classify(curr: Option<f64>, prev: Option<f64>, thresholds: &Thresholds) -> Classification {
    let (Some(curr), Some(prev)) = (curr, prev) else {
        return Classification::NoChange;
    };
    let abs_diff = (curr - prev).abs();
    let rel_diff = abs_diff / prev.max(thresholds.epsilon);
    if abs_diff >= thresholds.abs || rel_diff >= thresholds.rel {
        Classification::Changed
    } else {
        Classification::NoChange
    }
}

/// Per-camera detector holding the baseline between windows.
#[derive(Clone, Debug)]
pub struct ChangeDetector {
    thresholds: Thresholds,
    baseline: Option<f64>,
}

impl ChangeDetector {
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            baseline: None,
        }
    }

    /// Classifies the window that just closed and moves the baseline.
    ///
    /// An empty window keeps the previous baseline, so a single dropout does
    /// not erase detection history.
    pub fn observe(&mut self, average: Option<f64>) -> Classification {
        let result = classify(average, self.baseline, &self.thresholds);
        if average.is_some() {
            self.baseline = average;
        }
        result
    }

    #[must_use]
    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn reset(&mut self) {
        self.baseline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use Classification::{Changed, NoChange};

    fn run(averages: &[Option<f64>]) -> Vec<Classification> {
        let mut detector = ChangeDetector::new(Thresholds::default());
        averages.iter().map(|&a| detector.observe(a)).collect()
    }

    #[test]
    fn reference_sequence() {
        let result = run(&[Some(50.0), Some(55.0), Some(40.0), Some(41.5)]);
        assert_eq!(result, vec![NoChange, NoChange, Changed, NoChange]);
    }

    #[test]
    fn first_window_never_changes() {
        assert_eq!(run(&[Some(0.0)]), vec![NoChange]);
        assert_eq!(run(&[Some(255.0)]), vec![NoChange]);
    }

    #[test]
    fn absolute_threshold_is_inclusive() {
        let t = Thresholds {
            abs: 8.0,
            rel: 10.0,
            epsilon: 1e-6,
        };
        assert_eq!(classify(Some(108.0), Some(100.0), &t), Changed);
        assert_eq!(classify(Some(107.9), Some(100.0), &t), NoChange);
        assert_eq!(classify(Some(92.0), Some(100.0), &t), Changed);
    }

    #[test]
    fn relative_threshold_catches_small_baselines() {
        let t = Thresholds::default();
        // 2 units absolute, but 20% of a baseline of 10
        assert_eq!(classify(Some(12.0), Some(10.0), &t), Changed);
        // 5 units on 200 is 2.5%
        assert_eq!(classify(Some(205.0), Some(200.0), &t), NoChange);
    }

    #[test]
    fn zero_baseline_uses_epsilon_floor() {
        let t = Thresholds::default();
        assert_eq!(classify(Some(0.5), Some(0.0), &t), Changed);
        assert_eq!(classify(Some(0.0), Some(0.0), &t), NoChange);
    }

    #[test]
    fn missing_data_is_no_change() {
        let t = Thresholds::default();
        assert_eq!(classify(None, Some(50.0), &t), NoChange);
        assert_eq!(classify(Some(50.0), None, &t), NoChange);
        assert_eq!(classify(None, None, &t), NoChange);
    }

    #[test]
    fn empty_window_keeps_baseline() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        assert_eq!(detector.observe(Some(100.0)), NoChange);
        assert_eq!(detector.observe(None), NoChange);
        assert_eq!(detector.baseline(), Some(100.0));
        // compared against 100, not lost
        assert_eq!(detector.observe(Some(150.0)), Changed);
        assert_eq!(detector.baseline(), Some(150.0));
    }

    #[test]
    fn hybrid_rule_matches_pairwise_definition() {
        let t = Thresholds::default();
        let averages = [
            12.0, 12.5, 14.0, 60.0, 61.0, 67.5, 75.0, 74.0, 200.0, 215.0, 236.0, 1.0,
        ];
        let mut detector = ChangeDetector::new(t);
        for (i, &a) in averages.iter().enumerate() {
            let got = detector.observe(Some(a));
            let expected = if i == 0 {
                NoChange
            } else {
                let prev = averages[i - 1];
                let d = (a - prev).abs();
                if d >= t.abs || d / prev.max(t.epsilon) >= t.rel {
                    Changed
                } else {
                    NoChange
                }
            };
            assert_eq!(got, expected, "window {i}");
        }
    }

    #[test]
    fn reset_forgets_baseline() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        detector.observe(Some(10.0));
        detector.reset();
        assert_eq!(detector.baseline(), None);
        assert_eq!(detector.observe(Some(200.0)), NoChange);
    }
}
