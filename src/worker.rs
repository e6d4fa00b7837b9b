//! Request loop
//!
//! Each input line is parsed, optionally recalibrates the floor baseline,
//! is routed to a classifier by pressure and answered with one result line.
//! A request that fails at any step is logged and dropped without a response;
//! the loop then carries on with the next line.

use crate::config::AppConfig;
use crate::consumer::RequestConsumer;
use crate::error::RequestError;
use crate::floor::FloorEstimator;
use crate::metrics::WorkerMetrics;
use crate::models::inference::{ImageClassifier, OnnxClassifier};
use crate::models::registry::ModelRegistry;
use crate::producer::ResultProducer;
use crate::types::{ClassifyRequest, ClassifyResponse};
use anyhow::Result;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

/// Session state and collaborators for the request loop
pub struct Worker<C = OnnxClassifier> {
    registry: ModelRegistry<C>,
    estimator: FloorEstimator,
    default_floor: i64,
    metrics: Arc<WorkerMetrics>,
}

impl<C: ImageClassifier> Worker<C> {
    pub fn new(registry: ModelRegistry<C>, config: &AppConfig, metrics: Arc<WorkerMetrics>) -> Self {
        Self {
            registry,
            estimator: FloorEstimator::new(config.floor.hpa_per_floor),
            default_floor: config.floor.default_floor,
            metrics,
        }
    }

    /// Floor baseline bookkeeping for this session
    pub fn estimator(&self) -> &FloorEstimator {
        &self.estimator
    }

    /// Handle one parsed request
    ///
    /// A reset is applied before classification and stays in effect even if
    /// classification then fails.
    pub fn handle(&mut self, request: &ClassifyRequest) -> Result<ClassifyResponse, RequestError> {
        if request.reset {
            let floor = request.current_floor.unwrap_or(self.default_floor);
            self.estimator.reset(request.pressure, floor);
            self.metrics.record_reset();
        }

        let estimate = self.estimator.estimate(request.pressure);
        let classification = self.registry.classify(request.pressure, &request.image)?;

        Ok(ClassifyResponse::new(
            classification.model,
            classification.pred_class_idx,
            classification.num_classes,
        )
        .with_floor(self.estimator.baseline(), estimate))
    }

    /// Process lines until the input closes
    ///
    /// Only output failures end the loop early; the caller is gone at that
    /// point.
    pub async fn run<R, W>(
        &mut self,
        consumer: &mut RequestConsumer<R>,
        producer: &mut ResultProducer<W>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(line) = consumer.next_request().await? {
            let start_time = Instant::now();

            let request = match ClassifyRequest::from_line(&line) {
                Ok(request) => request,
                Err(e) => {
                    self.report_failure(&e);
                    continue;
                }
            };

            match self.handle(&request) {
                Ok(response) => {
                    producer.publish(&response).await?;
                    let processing_time = start_time.elapsed();
                    self.metrics.record_success(response.model, processing_time);
                    debug!(
                        image = %request.image.display(),
                        pressure = request.pressure,
                        model = response.model,
                        pred_class_idx = response.pred_class_idx,
                        floor_difference = response.floor_difference,
                        processing_time_us = processing_time.as_micros() as u64,
                        "Request processed"
                    );
                }
                Err(e) => self.report_failure(&e),
            }

            discard_image(&request.image);
        }

        info!(lines = consumer.lines_read(), "Input closed");
        Ok(())
    }

    fn report_failure(&self, e: &RequestError) {
        self.metrics.record_failure(e.kind());
        error!(kind = e.kind(), error = %e, "Request dropped");
    }
}

/// Best-effort removal of a processed image
pub fn discard_image(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(image = %path.display(), "Image removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(image = %path.display(), error = %e, "Failed to remove image"),
    }
}
