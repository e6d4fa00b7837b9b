//! Stdout writer for responses and status lines

use crate::types::response::ClassifyResponse;
use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Status line printed before the models are loaded
pub const STATUS_LOADING: &str = "[worker started - loading models...]";
/// Status line printed once both models are ready
pub const STATUS_READY: &str = "[models loaded and ready]";

/// Writes protocol lines, flushing after each one
pub struct ResultProducer<W> {
    writer: W,
    marker: String,
}

impl<W: AsyncWrite + Unpin> ResultProducer<W> {
    pub fn new(writer: W, marker: &str) -> Self {
        Self {
            writer,
            marker: marker.to_string(),
        }
    }

    /// Write `<marker><json>` as a single line
    pub async fn publish(&mut self, response: &ClassifyResponse) -> Result<()> {
        let mut line = self.marker.clone().into_bytes();
        serde_json::to_writer(&mut line, response).context("Failed to serialize response")?;
        line.push(b'\n');

        self.write_line(&line).await?;

        debug!(
            model = response.model,
            pred_class_idx = response.pred_class_idx,
            "Published response"
        );

        Ok(())
    }

    /// Write a plain status line
    pub async fn status(&mut self, message: &str) -> Result<()> {
        let line = format!("{}\n", message);
        self.write_line(line.as_bytes()).await
    }

    async fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.writer
            .write_all(line)
            .await
            .context("Failed to write to output")?;
        self.writer.flush().await.context("Failed to flush output")
    }

    /// Consume the producer and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_prefixes_marker() {
        let mut producer = ResultProducer::new(Vec::new(), "__RESULT__");
        producer
            .publish(&ClassifyResponse::new(6, 3, 9))
            .await
            .unwrap();

        let output = String::from_utf8(producer.into_inner()).unwrap();
        assert!(output.starts_with("__RESULT__{\"model\":6,"));
        assert!(output.ends_with("}\n"));
        assert_eq!(output.lines().count(), 1);

        let json = output.trim_end().strip_prefix("__RESULT__").unwrap();
        let parsed: ClassifyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, ClassifyResponse::new(6, 3, 9));
    }

    #[tokio::test]
    async fn test_status_lines() {
        let mut producer = ResultProducer::new(Vec::new(), "__RESULT__");
        producer.status(STATUS_LOADING).await.unwrap();
        producer.status(STATUS_READY).await.unwrap();

        let output = String::from_utf8(producer.into_inner()).unwrap();
        assert_eq!(output, format!("{}\n{}\n", STATUS_LOADING, STATUS_READY));
    }
}
