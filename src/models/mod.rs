//! Image classifier components

pub mod inference;
pub mod loader;
pub mod preprocess;
pub mod registry;

pub use inference::{ImageClassifier, OnnxClassifier};
pub use loader::ModelLoader;
pub use preprocess::ImagePreprocessor;
pub use registry::{Classification, ModelRegistry, PressureBand, RegisteredModel};
