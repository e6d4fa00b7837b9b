//! ONNX classifier loader

use anyhow::{bail, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::ValueType;
use std::path::Path;
use tracing::{debug, info};

/// Metadata key carrying the class count of an exported checkpoint
pub const NUM_CLASSES_METADATA_KEY: &str = "num_classes";

/// Loaded ONNX classifier with metadata
pub struct LoadedModel {
    /// Model identifier reported in responses
    pub id: u32,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the image tensor
    pub input_name: String,
    /// Output name for the logits
    pub output_name: String,
    /// Number of output classes
    pub num_classes: usize,
}

/// Loader for ONNX classifiers
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single classifier; any problem with the file is an error
    pub fn load_model<P: AsRef<Path>>(&self, path: P, id: u32) -> Result<LoadedModel> {
        let path = path.as_ref();

        if !path.exists() {
            bail!("Model {} not found at {}", id, path.display());
        }

        info!(model = id, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .with_context(|| format!("Model {} declares no inputs", id))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .with_context(|| format!("Model {} declares no outputs", id))?;

        let num_classes = Self::read_num_classes(&session)
            .with_context(|| format!("Cannot determine class count of model {}", id))?;

        info!(
            model = id,
            input = %input_name,
            output = %output_name,
            num_classes = num_classes,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            id,
            session,
            input_name,
            output_name,
            num_classes,
        })
    }

    /// Class count from custom metadata, else from the static output shape
    fn read_num_classes(session: &Session) -> Result<usize> {
        let from_metadata = session
            .metadata()?
            .custom(NUM_CLASSES_METADATA_KEY)?
            .map(|value| parse_class_count(&value))
            .transpose()?;

        if let Some(num_classes) = from_metadata {
            debug!(num_classes, "Class count read from model metadata");
            return Ok(num_classes);
        }

        let dims: Vec<i64> = match session.outputs.first().map(|o| &o.output_type) {
            Some(ValueType::Tensor { shape, .. }) => shape.iter().copied().collect(),
            _ => bail!("first output is not a tensor"),
        };

        class_count_from_dims(&dims)
    }
}

/// Parse the `num_classes` metadata value
fn parse_class_count(value: &str) -> Result<usize> {
    let num_classes: usize = value
        .trim()
        .parse()
        .with_context(|| format!("invalid {} metadata: {:?}", NUM_CLASSES_METADATA_KEY, value))?;
    if num_classes == 0 {
        bail!("{} metadata is zero", NUM_CLASSES_METADATA_KEY);
    }
    Ok(num_classes)
}

/// Class count from a logits shape such as `[batch, classes]`
fn class_count_from_dims(dims: &[i64]) -> Result<usize> {
    match dims.last() {
        Some(&n) if n > 0 => Ok(n as usize),
        _ => bail!(
            "output shape {:?} has no static class dimension and no {} metadata",
            dims,
            NUM_CLASSES_METADATA_KEY
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_count() {
        assert_eq!(parse_class_count("12").unwrap(), 12);
        assert_eq!(parse_class_count(" 7\n").unwrap(), 7);
        assert!(parse_class_count("0").is_err());
        assert!(parse_class_count("twelve").is_err());
    }

    #[test]
    fn test_class_count_from_dims() {
        assert_eq!(class_count_from_dims(&[1, 9]).unwrap(), 9);
        assert_eq!(class_count_from_dims(&[-1, 31]).unwrap(), 31);
        assert!(class_count_from_dims(&[1, -1]).is_err());
        assert!(class_count_from_dims(&[]).is_err());
    }

    #[test]
    fn test_missing_model_file_is_fatal() {
        let loader = ModelLoader { onnx_threads: 1 };
        let err = match loader.load_model("/nonexistent/model_1.onnx", 1) {
            Ok(_) => panic!("expected missing model to fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("not found"));
    }
}
