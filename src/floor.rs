//! Floor estimation from barometric pressure deltas
//!
//! The estimator starts uncalibrated. A reset request captures a baseline
//! pressure/floor pair; every later request is compared against the most
//! recent baseline. There is no way back to the uncalibrated state.

use tracing::info;

/// Reference point captured by the most recent reset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    /// Pressure at the reference floor (hPa)
    pub pressure: f64,
    /// Reference floor number
    pub floor: i64,
}

/// Calibration state of the estimator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Calibration {
    /// No reset seen yet
    #[default]
    Idle,
    /// Baseline captured
    Calibrated(Baseline),
}

/// Floor estimate for a single pressure reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorEstimate {
    /// Signed number of floors above the baseline
    pub floor_difference: i64,
    /// Baseline floor plus difference, when calibrated
    pub predicted_floor: Option<i64>,
}

/// Per-session baseline bookkeeping
#[derive(Debug, Clone)]
pub struct FloorEstimator {
    state: Calibration,
    hpa_per_floor: f64,
}

impl FloorEstimator {
    /// Create an uncalibrated estimator
    pub fn new(hpa_per_floor: f64) -> Self {
        Self {
            state: Calibration::Idle,
            hpa_per_floor,
        }
    }

    /// Current calibration state
    pub fn state(&self) -> Calibration {
        self.state
    }

    /// Current baseline, if any
    pub fn baseline(&self) -> Option<Baseline> {
        match self.state {
            Calibration::Idle => None,
            Calibration::Calibrated(baseline) => Some(baseline),
        }
    }

    /// Replace the baseline wholesale
    pub fn reset(&mut self, pressure: f64, floor: i64) {
        let baseline = Baseline { pressure, floor };
        self.state = Calibration::Calibrated(baseline);
        info!(
            baseline_pressure = format!("{:.2}", pressure),
            baseline_floor = floor,
            "Baseline set"
        );
    }

    /// Estimate the floor for a pressure reading against the current baseline
    ///
    /// Pressure falls as altitude rises, so a reading below the baseline
    /// yields a positive difference. Halves round to even.
    pub fn estimate(&self, pressure: f64) -> FloorEstimate {
        match self.state {
            Calibration::Idle => FloorEstimate {
                floor_difference: 0,
                predicted_floor: None,
            },
            Calibration::Calibrated(baseline) => {
                let floor_difference =
                    ((baseline.pressure - pressure) / self.hpa_per_floor).round_ties_even() as i64;
                FloorEstimate {
                    floor_difference,
                    predicted_floor: Some(baseline.floor.saturating_add(floor_difference)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_estimate() {
        let estimator = FloorEstimator::new(0.4);
        assert_eq!(estimator.state(), Calibration::Idle);

        for pressure in [950.0, 1010.0, 1013.25] {
            let estimate = estimator.estimate(pressure);
            assert_eq!(estimate.floor_difference, 0);
            assert_eq!(estimate.predicted_floor, None);
        }
    }

    #[test]
    fn test_same_pressure_after_reset() {
        let mut estimator = FloorEstimator::new(0.4);
        estimator.reset(1003.7, 5);

        let estimate = estimator.estimate(1003.7);
        assert_eq!(estimate.floor_difference, 0);
        assert_eq!(estimate.predicted_floor, Some(5));
    }

    #[test]
    fn test_climbing_and_descending() {
        let mut estimator = FloorEstimator::new(0.4);
        estimator.reset(1005.0, 3);

        let up = estimator.estimate(998.6);
        assert_eq!(up.floor_difference, 16);
        assert_eq!(up.predicted_floor, Some(19));

        estimator.reset(1000.0, 1);
        let down = estimator.estimate(1002.0);
        assert_eq!(down.floor_difference, -5);
        assert_eq!(down.predicted_floor, Some(-4));
    }

    #[test]
    fn test_halves_round_to_even() {
        let mut estimator = FloorEstimator::new(0.5);
        estimator.reset(1000.0, 0);

        // 1.25 / 0.5 = 2.5 -> 2, 1.75 / 0.5 = 3.5 -> 4
        assert_eq!(estimator.estimate(998.75).floor_difference, 2);
        assert_eq!(estimator.estimate(998.25).floor_difference, 4);
        // -0.25 / 0.5 = -0.5 -> 0
        assert_eq!(estimator.estimate(1000.25).floor_difference, 0);
    }

    #[test]
    fn test_reset_overwrites_wholesale() {
        let mut estimator = FloorEstimator::new(0.4);
        estimator.reset(1000.0, 2);
        estimator.reset(1010.0, 7);

        assert_eq!(
            estimator.baseline(),
            Some(Baseline {
                pressure: 1010.0,
                floor: 7
            })
        );
        assert_eq!(estimator.estimate(1010.0).predicted_floor, Some(7));
    }
}
