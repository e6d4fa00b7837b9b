//! Image classification on top of ONNX Runtime

use crate::models::loader::LoadedModel;
use crate::models::preprocess::ImagePreprocessor;
use anyhow::{bail, Context, Result};
use ort::value::Tensor;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Scores an image file and returns the winning class index
///
/// Implemented by the ONNX-backed classifier and by test doubles.
pub trait ImageClassifier {
    /// Number of classes the classifier distinguishes
    fn num_classes(&self) -> usize;

    /// Classify the image at `image_path`
    fn classify(&mut self, image_path: &Path) -> Result<usize>;
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    model: LoadedModel,
    preprocessor: ImagePreprocessor,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel, preprocessor: ImagePreprocessor) -> Self {
        Self {
            model,
            preprocessor,
        }
    }

    /// Identifier of the wrapped model
    pub fn id(&self) -> u32 {
        self.model.id
    }

    /// Run the forward pass on a preprocessed NCHW buffer
    fn run_logits(&mut self, input: Vec<f32>) -> Result<usize> {
        let shape = self.preprocessor.input_shape().to_vec();
        let input_tensor =
            Tensor::from_array((shape, input)).context("Failed to create input tensor")?;

        let outputs = self
            .model
            .session
            .run(ort::inputs![&self.model.input_name => input_tensor])?;

        let output = outputs
            .get(self.model.output_name.as_str())
            .with_context(|| format!("Missing output {}", self.model.output_name))?;
        let (_, logits) = output
            .try_extract_tensor::<f32>()
            .context("Failed to extract logits")?;

        if logits.len() != self.model.num_classes {
            bail!(
                "model {} produced {} logits, expected {}",
                self.model.id,
                logits.len(),
                self.model.num_classes
            );
        }

        argmax(logits).context("Model produced no logits")
    }
}

impl ImageClassifier for OnnxClassifier {
    fn num_classes(&self) -> usize {
        self.model.num_classes
    }

    fn classify(&mut self, image_path: &Path) -> Result<usize> {
        let start = Instant::now();
        let input = self.preprocessor.load_and_preprocess(image_path)?;
        let class_idx = self.run_logits(input)?;

        debug!(
            model = self.model.id,
            class_idx = class_idx,
            inference_us = start.elapsed().as_micros() as u64,
            "Classification complete"
        );

        Ok(class_idx)
    }
}

/// Index of the largest value; the first one wins on ties and a NaN counts
/// as larger than any number, matching torch's `argmax`
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if current.is_nan() => break,
            Some((_, current)) if !value.is_nan() && value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 2.5, -1.0]), Some(1));
        assert_eq!(argmax(&[-3.0, -2.0, -7.5]), Some(1));
        assert_eq!(argmax(&[4.0]), Some(0));
    }

    #[test]
    fn test_argmax_first_max_wins() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 0.0]), Some(1));
    }

    #[test]
    fn test_argmax_nan_is_maximum() {
        assert_eq!(argmax(&[f32::NAN, 0.5, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, f32::NAN, 9.0, f32::NAN]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), Some(0));
        assert_eq!(argmax(&[]), None);
    }
}
