//! Pressure-banded model registry
//!
//! Two classifiers are loaded at startup, one trained on images taken at or
//! below the pressure threshold and one above it. Each request is routed to
//! exactly one of them.

use crate::config::{AppConfig, ModelSpec};
use crate::error::RequestError;
use crate::models::inference::{ImageClassifier, OnnxClassifier};
use crate::models::loader::ModelLoader;
use crate::models::preprocess::ImagePreprocessor;
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Which side of the pressure threshold a reading falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureBand {
    /// At or below the threshold
    Low,
    /// Strictly above the threshold
    High,
}

impl PressureBand {
    /// Inclusive threshold, no hysteresis
    pub fn from_pressure(pressure: f64, threshold: f64) -> Self {
        if pressure <= threshold {
            PressureBand::Low
        } else {
            PressureBand::High
        }
    }
}

/// A classifier together with the id reported in responses
pub struct RegisteredModel<C> {
    pub id: u32,
    pub classifier: C,
}

/// Outcome of classifying one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub model: u32,
    pub pred_class_idx: usize,
    pub num_classes: usize,
}

/// Holds the low- and high-pressure classifiers
pub struct ModelRegistry<C = OnnxClassifier> {
    low: RegisteredModel<C>,
    high: RegisteredModel<C>,
    pressure_threshold: f64,
}

impl ModelRegistry<OnnxClassifier> {
    /// Load both classifiers named in the configuration; either failing is fatal
    pub fn load(config: &AppConfig) -> Result<Self> {
        let models = &config.models;
        let loader = ModelLoader::with_threads(models.onnx_threads)?;
        let preprocessor = ImagePreprocessor::new(models.image_size);

        let load = |spec: &ModelSpec| -> Result<RegisteredModel<OnnxClassifier>> {
            let loaded = loader.load_model(models.model_path(spec), spec.id)?;
            let classifier = OnnxClassifier::new(loaded, preprocessor);
            Ok(RegisteredModel {
                id: classifier.id(),
                classifier,
            })
        };

        let low = load(&models.low_pressure)?;
        let high = load(&models.high_pressure)?;

        Ok(Self::new(low, high, config.selection.pressure_threshold_hpa))
    }
}

impl<C: ImageClassifier> ModelRegistry<C> {
    pub fn new(low: RegisteredModel<C>, high: RegisteredModel<C>, pressure_threshold: f64) -> Self {
        info!(
            low_model = low.id,
            low_classes = low.classifier.num_classes(),
            high_model = high.id,
            high_classes = high.classifier.num_classes(),
            pressure_threshold = pressure_threshold,
            "Model registry ready"
        );

        Self {
            low,
            high,
            pressure_threshold,
        }
    }

    /// Band a pressure reading falls in
    pub fn band(&self, pressure: f64) -> PressureBand {
        PressureBand::from_pressure(pressure, self.pressure_threshold)
    }

    /// Pick the classifier for a pressure reading
    pub fn select(&self, pressure: f64) -> &RegisteredModel<C> {
        match self.band(pressure) {
            PressureBand::Low => &self.low,
            PressureBand::High => &self.high,
        }
    }

    fn select_mut(&mut self, pressure: f64) -> &mut RegisteredModel<C> {
        match self.band(pressure) {
            PressureBand::Low => &mut self.low,
            PressureBand::High => &mut self.high,
        }
    }

    /// Ids of the registered models, low band first
    pub fn model_ids(&self) -> [u32; 2] {
        [self.low.id, self.high.id]
    }

    /// Classify an image with the model chosen for `pressure`
    pub fn classify(&mut self, pressure: f64, image_path: &Path) -> Result<Classification, RequestError> {
        let model = self.select_mut(pressure);

        let pred_class_idx = model
            .classifier
            .classify(image_path)
            .map_err(|e| RequestError::Inference {
                model: model.id,
                message: format!("{:#}", e),
            })?;

        Ok(Classification {
            model: model.id,
            pred_class_idx,
            num_classes: model.classifier.num_classes(),
        })
    }
}
