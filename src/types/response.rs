//! Classification response written to standard output

use crate::floor::{Baseline, FloorEstimate};
use serde::{Deserialize, Serialize};

/// Result of a successfully handled request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyResponse {
    /// Identifier of the model that classified the image
    pub model: u32,

    /// Arg-max class index
    pub pred_class_idx: usize,

    /// Number of classes of the selected model
    pub num_classes: usize,

    /// Baseline pressure in hPa, `null` before the first reset
    pub baseline_pressure: Option<f64>,

    /// Baseline floor, `null` before the first reset
    pub baseline_floor: Option<i64>,

    /// Estimated current floor, `null` before the first reset
    pub predicted_floor: Option<i64>,

    /// Signed floors between the baseline and the current pressure
    pub floor_difference: i64,
}

impl ClassifyResponse {
    pub fn new(model: u32, pred_class_idx: usize, num_classes: usize) -> Self {
        Self {
            model,
            pred_class_idx,
            num_classes,
            baseline_pressure: None,
            baseline_floor: None,
            predicted_floor: None,
            floor_difference: 0,
        }
    }

    /// Attach the floor estimate and the baseline it was computed from
    pub fn with_floor(mut self, baseline: Option<Baseline>, estimate: FloorEstimate) -> Self {
        self.baseline_pressure = baseline.map(|b| b.pressure);
        self.baseline_floor = baseline.map(|b| b.floor);
        self.predicted_floor = estimate.predicted_floor;
        self.floor_difference = estimate.floor_difference;
        self
    }
}
