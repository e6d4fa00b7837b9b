//! Floor Vision Worker Library
//!
//! A line-oriented stdin/stdout worker that classifies indoor images with one
//! of two pressure-banded models and estimates the current floor from
//! barometric pressure relative to a caller-supplied baseline.

pub mod config;
pub mod consumer;
pub mod error;
pub mod floor;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod types;
pub mod worker;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::RequestError;
pub use floor::{Baseline, FloorEstimate, FloorEstimator};
pub use models::registry::ModelRegistry;
pub use producer::ResultProducer;
pub use types::{ClassifyRequest, ClassifyResponse};
pub use worker::Worker;
